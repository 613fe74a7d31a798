//! Basic Access Control (ICAO 9303 p11, section 4.3)
use rand::Rng;
use simplelog::{debug, info, trace};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::icao9303::{self, AccessKey};
use crate::iso7816::{self, StatusCode};
use crate::secure_messaging::{CipherSuite, SecureSession, MAC_LEN};
use crate::smartcard_abstractions::Smartcard;
use crate::types::{Operation, SecureChannelError};

fn get_challenge(
    smartcard: &mut (impl Smartcard + ?Sized),
) -> Result<[u8; 8], SecureChannelError> {
    let (rnd_ic, status_code) = iso7816::apdu_get_challenge().exchange(smartcard, &mut None)?;
    if status_code != StatusCode::Ok as u16 {
        return Err(SecureChannelError::Status {
            operation: Operation::GetChallenge,
            status: status_code,
        });
    }
    return rnd_ic
        .as_slice()
        .try_into()
        .map_err(|_| SecureChannelError::LengthMismatch {
            operation: Operation::GetChallenge,
            obtained: rnd_ic.len(),
            expected: 8,
        });
}

/// Runs BAC with fresh random RND.IFD and K.IFD.
pub fn establish(
    smartcard: &mut (impl Smartcard + ?Sized),
    access_key: &AccessKey,
) -> Result<SecureSession, SecureChannelError> {
    // Generate RND.IFD
    let mut rnd_ifd = Zeroizing::new([0u8; 8]);
    rand::rng().fill(&mut rnd_ifd[..]);

    // Generate keying material K.IFD
    let mut k_ifd = Zeroizing::new([0u8; 16]);
    rand::rng().fill(&mut k_ifd[..]);

    return establish_with_values(smartcard, access_key, &rnd_ifd, &k_ifd);
}

/// Runs BAC with caller-provided RND.IFD and K.IFD.
pub fn establish_with_values(
    smartcard: &mut (impl Smartcard + ?Sized),
    access_key: &AccessKey,
    rnd_ifd: &[u8; 8],
    k_ifd: &[u8; 16],
) -> Result<SecureSession, SecureChannelError> {
    info!("<d>Authenticating with BAC</>");
    let suite = CipherSuite::Tdes;
    let k_seed = access_key
        .bac_key_seed()
        .ok_or(SecureChannelError::MrzKeyRequired)?;

    // Derive keys K.enc and K.mac
    let k_enc = suite.derive_key(&k_seed, 1);
    let k_mac = suite.derive_key(&k_seed, 2);
    trace!("BAC K.enc: {:02x?} K.mac: {:02x?}", k_enc, k_mac);

    let rnd_ic = get_challenge(smartcard)?;
    debug!("RND.IC: {:02x?}", rnd_ic);

    // Concatenate RND.IFD, RND.IC and K.IFD into S
    let mut e_ifd = Zeroizing::new([rnd_ifd.as_slice(), &rnd_ic, k_ifd].concat());

    // Calculate E.IFD = E(KEnc, S). S is 32 bytes, so it needs no padding.
    suite.encrypt(&k_enc, &[0u8; 8], &mut e_ifd)?;

    // Calculate M.IFD = MAC(K.MAC, E.IFD)
    let m_ifd = suite.mac(&k_mac, &icao9303::padding_method_2_pad(&e_ifd, 8))?;
    let cmd_data = [e_ifd.as_slice(), &m_ifd].concat();
    trace!("EXTERNAL AUTHENTICATE data: {:02x?}", cmd_data);

    let (resp_data, status_code) =
        iso7816::apdu_external_authentication(cmd_data).exchange(smartcard, &mut None)?;
    if status_code != StatusCode::Ok as u16 {
        return Err(SecureChannelError::Status {
            operation: Operation::ExternalAuthenticate,
            status: status_code,
        });
    }
    if resp_data.len() != 32 + MAC_LEN {
        return Err(SecureChannelError::LengthMismatch {
            operation: Operation::ExternalAuthenticate,
            obtained: resp_data.len(),
            expected: 32 + MAC_LEN,
        });
    }

    // Verify MAC of what we obtained
    let (e_ic, m_ic) = resp_data.split_at(32);
    let expected_m_ic = suite.mac(&k_mac, &icao9303::padding_method_2_pad(e_ic, 8))?;
    if !bool::from(expected_m_ic.ct_eq(m_ic)) {
        return Err(SecureChannelError::ResponseMac);
    }

    // Decrypt R = RND.IC || RND.IFD || K.IC
    let mut r = Zeroizing::new(e_ic.to_vec());
    suite.decrypt(&k_enc, &[0u8; 8], &mut r)?;
    if r[0..8] != rnd_ic || r[8..16] != rnd_ifd[..] {
        return Err(SecureChannelError::ChallengeMismatch);
    }
    let k_ic = &r[16..32];

    // K.seed = K.IFD xor K.IC
    let k_session_seed: Zeroizing<Vec<u8>> = Zeroizing::new(
        k_ifd
            .iter()
            .zip(k_ic.iter())
            .map(|(kifd, kic)| kifd ^ kic)
            .collect(),
    );
    let ks_enc = suite.derive_key(&k_session_seed, 1);
    let ks_mac = suite.derive_key(&k_session_seed, 2);

    // SSC = RND.IC[4..8] || RND.IFD[4..8]
    let ssc = [&rnd_ic[4..8], &rnd_ifd[4..8]].concat();
    debug!("BAC established, SSC: {:02x?}", ssc);
    return SecureSession::new(suite, &ks_enc, &ks_mac, &ssc);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransportError;
    use hex_literal::hex;

    struct AppendixDCard {
        step: usize,
    }

    impl Smartcard for AppendixDCard {
        fn exchange_apdu(&mut self, data: &[u8]) -> Result<Vec<u8>, TransportError> {
            self.step += 1;
            match self.step {
                1 => {
                    assert_eq!(data, hex!("0084000008"));
                    return Ok(hex!("4608F919887022129000").to_vec());
                }
                2 => {
                    if data != hex!("008200002872C29C2371CC9BDB65B779B8E8D37B29ECC154AA56A8799FAE2F498F76ED92F25F1448EEA8AD90A728") {
                        return Ok(hex!("6300").to_vec());
                    }
                    return Ok(hex!("46B9342A41396CD7386BF5803104D7CEDC122B9132139BAF2EEDC94EE178534F2F2D235D074D74499000").to_vec());
                }
                _ => panic!("unexpected APDU {:02x?}", data),
            }
        }

        fn is_connected(&mut self) -> bool {
            return true;
        }
    }

    fn appendix_d_key() -> AccessKey {
        return AccessKey::from_mrz("L898902C", "690806", "940623").unwrap();
    }

    #[test]
    fn appendix_d_handshake() {
        let mut card = AppendixDCard { step: 0 };
        let mut session = establish_with_values(
            &mut card,
            &appendix_d_key(),
            &hex!("781723860C06C226"),
            &hex!("0B795240CB7049B01C19B33E32804F0B"),
        )
        .unwrap();
        assert_eq!(session.suite(), CipherSuite::Tdes);
        assert_eq!(session.ssc(), hex!("887022120C06C226"));

        // the session keys are only right if the protected SELECT matches
        let protected = session
            .protect(&iso7816::apdu_select_file_by_ef(0x011E))
            .unwrap();
        assert_eq!(
            protected,
            hex!("0CA4020C158709016375432908C044F68E08BF8B92D635FF24F800").to_vec()
        );
    }

    #[test]
    fn wrong_key_is_refused() {
        let mut card = AppendixDCard { step: 0 };
        let wrong_key = AccessKey::from_mrz("L898902C", "690806", "940624").unwrap();
        let result = establish_with_values(
            &mut card,
            &wrong_key,
            &hex!("781723860C06C226"),
            &hex!("0B795240CB7049B01C19B33E32804F0B"),
        );
        assert!(matches!(
            result,
            Err(SecureChannelError::Status {
                operation: Operation::ExternalAuthenticate,
                status: 0x6300
            })
        ));
    }

    #[test]
    fn can_cannot_do_bac() {
        let mut card = AppendixDCard { step: 0 };
        let result = establish(&mut card, &AccessKey::from_can("123456").unwrap());
        assert!(matches!(result, Err(SecureChannelError::MrzKeyRequired)));
    }
}
