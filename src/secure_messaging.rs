//! Secure messaging (ICAO 9303 p11, section 9.8)
use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockCipherEncrypt, BlockModeDecrypt, BlockModeEncrypt, KeyIvInit};
use cmac::Cmac;
use des::{Des, TdesEde2};
use iso7816_tlv::ber;
use retail_mac::digest::KeyInit;
use retail_mac::{Mac, RetailMac};
use simplelog::{debug, trace};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::helpers;
use crate::icao9303;
use crate::iso7816::ApduCommand;
use crate::types::SecureChannelError;

/// Block cipher and MAC pair a session runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherSuite {
    /// 2-key 3DES with ISO 9797-1 MAC algorithm 3 (BAC, PACE 3DES)
    Tdes,
    Aes128,
    Aes192,
    Aes256,
}

/// All our MACs are truncated (or naturally sized) to 8 bytes.
pub const MAC_LEN: usize = 8;

fn cbc_encrypt<C>(key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<(), SecureChannelError>
where
    C: BlockCipherEncrypt,
    cbc::Encryptor<C>: KeyIvInit + BlockModeEncrypt,
{
    let data_len = data.len();
    let encryptor = cbc::Encryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| SecureChannelError::KeyLength)?;
    encryptor
        .encrypt_padded::<NoPadding>(data, data_len)
        .map_err(|_| SecureChannelError::InvalidPadding)?;
    return Ok(());
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<(), SecureChannelError>
where
    C: BlockCipherEncrypt + cbc::cipher::BlockCipherDecrypt,
    cbc::Decryptor<C>: KeyIvInit + BlockModeDecrypt,
{
    let decryptor = cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| SecureChannelError::KeyLength)?;
    decryptor
        .decrypt_padded::<NoPadding>(data)
        .map_err(|_| SecureChannelError::InvalidPadding)?;
    return Ok(());
}

fn keyed_mac<M: Mac + KeyInit>(key: &[u8], data: &[u8]) -> Result<Vec<u8>, SecureChannelError> {
    let mut mac =
        <M as KeyInit>::new_from_slice(key).map_err(|_| SecureChannelError::KeyLength)?;
    Mac::update(&mut mac, data);
    let full_mac = Mac::finalize(mac).into_bytes();
    return Ok(full_mac[..MAC_LEN].to_vec());
}

impl CipherSuite {
    pub fn block_size(&self) -> usize {
        return match self {
            Self::Tdes => 8,
            Self::Aes128 | Self::Aes192 | Self::Aes256 => 16,
        };
    }

    pub fn key_len(&self) -> usize {
        return match self {
            Self::Tdes | Self::Aes128 => 16,
            Self::Aes192 => 24,
            Self::Aes256 => 32,
        };
    }

    /// KDF(K, c) from ICAO 9303 p11, 9.7.1
    pub fn derive_key(&self, shared_secret: &[u8], counter: u32) -> Zeroizing<Vec<u8>> {
        return match self {
            Self::Tdes | Self::Aes128 => icao9303::kdf_sha1(shared_secret, counter),
            Self::Aes192 | Self::Aes256 => {
                icao9303::kdf_sha256(shared_secret, counter, self.key_len())
            }
        };
    }

    /// CBC-encrypts already padded data in place.
    pub fn encrypt(
        &self,
        key: &[u8],
        iv: &[u8],
        data: &mut [u8],
    ) -> Result<(), SecureChannelError> {
        return match self {
            Self::Tdes => cbc_encrypt::<TdesEde2>(key, iv, data),
            Self::Aes128 => cbc_encrypt::<Aes128>(key, iv, data),
            Self::Aes192 => cbc_encrypt::<Aes192>(key, iv, data),
            Self::Aes256 => cbc_encrypt::<Aes256>(key, iv, data),
        };
    }

    /// CBC-decrypts in place. Padding is left for the caller.
    pub fn decrypt(
        &self,
        key: &[u8],
        iv: &[u8],
        data: &mut [u8],
    ) -> Result<(), SecureChannelError> {
        return match self {
            Self::Tdes => cbc_decrypt::<TdesEde2>(key, iv, data),
            Self::Aes128 => cbc_decrypt::<Aes128>(key, iv, data),
            Self::Aes192 => cbc_decrypt::<Aes192>(key, iv, data),
            Self::Aes256 => cbc_decrypt::<Aes256>(key, iv, data),
        };
    }

    /// 8 byte MAC over data. For 3DES, data must already be padded.
    pub fn mac(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, SecureChannelError> {
        return match self {
            Self::Tdes => keyed_mac::<RetailMac<Des>>(key, data),
            Self::Aes128 => keyed_mac::<Cmac<Aes128>>(key, data),
            Self::Aes192 => keyed_mac::<Cmac<Aes192>>(key, data),
            Self::Aes256 => keyed_mac::<Cmac<Aes256>>(key, data),
        };
    }
}

/// Session keys and send sequence counter of an established secure channel.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecureSession {
    #[zeroize(skip)]
    suite: CipherSuite,
    k_enc: Vec<u8>,
    k_mac: Vec<u8>,
    ssc: Vec<u8>,
}

impl std::fmt::Debug for SecureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "SecureSession({:?})", self.suite)
    }
}

impl SecureSession {
    /// The SSC is left-padded (or trimmed from the left) to the block size.
    pub fn new(
        suite: CipherSuite,
        k_enc: &[u8],
        k_mac: &[u8],
        ssc: &[u8],
    ) -> Result<SecureSession, SecureChannelError> {
        if k_enc.len() != suite.key_len() || k_mac.len() != suite.key_len() {
            return Err(SecureChannelError::KeyLength);
        }
        let block_size = suite.block_size();
        let mut session_ssc = vec![0u8; block_size];
        let copy_len = ssc.len().min(block_size);
        session_ssc[block_size - copy_len..].copy_from_slice(&ssc[ssc.len() - copy_len..]);
        return Ok(SecureSession {
            suite,
            k_enc: k_enc.to_vec(),
            k_mac: k_mac.to_vec(),
            ssc: session_ssc,
        });
    }

    pub fn suite(&self) -> CipherSuite {
        return self.suite;
    }

    pub fn ssc(&self) -> &[u8] {
        return &self.ssc;
    }

    fn increment_ssc(&mut self) {
        for byte in self.ssc.iter_mut().rev() {
            let (incremented, overflow) = byte.overflowing_add(1);
            *byte = incremented;
            if !overflow {
                break;
            }
        }
        trace!("SSC: {:02x?}", self.ssc);
    }

    /// IV for the current SSC: zero for 3DES, E(K.enc, SSC) for AES.
    fn current_iv(&self) -> Result<Vec<u8>, SecureChannelError> {
        let block_size = self.suite.block_size();
        if self.suite == CipherSuite::Tdes {
            return Ok(vec![0u8; block_size]);
        }
        let mut iv = self.ssc.clone();
        self.suite.encrypt(&self.k_enc, &vec![0u8; block_size], &mut iv)?;
        return Ok(iv);
    }

    /// Wraps a plain command into a protected one (DO'87', DO'97', DO'8E').
    pub fn protect(&mut self, apdu: &ApduCommand) -> Result<Vec<u8>, SecureChannelError> {
        let block_size = self.suite.block_size();
        self.increment_ssc();

        // Mask class byte and pad command header
        let cla = apdu.cla | 0x0C;
        let padded_header =
            icao9303::padding_method_2_pad(&[cla, apdu.ins, apdu.p1, apdu.p2], block_size);
        trace!("padded_header: {:02x?}", padded_header);

        // Pad data, encrypt it with KSenc and build DO'87' (DO'85' for odd INS)
        let mut do_87: Vec<u8> = vec![];
        if !apdu.data.is_empty() {
            let mut padded_data = icao9303::padding_method_2_pad(&apdu.data, block_size);
            let iv = self.current_iv()?;
            self.suite.encrypt(&self.k_enc, &iv, &mut padded_data)?;

            if apdu.ins & 1 == 1 {
                do_87 = helpers::build_tlv(0x85, padded_data);
            } else {
                // Padding-content indicator byte, ICAO 9303 only uses 01.
                let mut value = vec![0x01];
                value.extend_from_slice(&padded_data);
                do_87 = helpers::build_tlv(0x87, value);
            }
            trace!("do_87: {:02x?}", do_87);
        }

        // Build DO'97'
        let mut do_97: Vec<u8> = vec![];
        if apdu.max_resp_len.is_some() {
            let extended = apdu.max_resp_len.is_some_and(|le| le > 0x100);
            do_97 = helpers::build_tlv(0x97, ApduCommand::le_field(apdu.max_resp_len, extended));
            trace!("do_97: {:02x?}", do_97);
        }

        // Concatenate SSC, header and DOs, pad and MAC
        let mac_input = [self.ssc.as_slice(), &padded_header, &do_87, &do_97].concat();
        let padded_mac_input = icao9303::padding_method_2_pad(&mac_input, block_size);
        trace!("MAC input: {:02x?}", padded_mac_input);
        let cc = self.suite.mac(&self.k_mac, &padded_mac_input)?;
        let do_8e = helpers::build_tlv(0x8E, cc);
        trace!("do_8e: {:02x?}", do_8e);

        let protected_apdu = ApduCommand {
            cla,
            ins: apdu.ins,
            p1: apdu.p1,
            p2: apdu.p2,
            data: [do_87, do_97, do_8e].concat(),
            max_resp_len: Some(0x100),
        };
        return Ok(protected_apdu.serialize());
    }

    /// Verifies and decrypts a protected response body.
    ///
    /// Returns (decrypted data, status word from DO'99').
    /// Chips drop out of secure messaging to report errors, so an empty body is accepted
    /// with a plain error status. An empty body claiming success is `MissingResponseMac`.
    pub fn unprotect(
        &mut self,
        body: &[u8],
        status_code: u16,
    ) -> Result<(Vec<u8>, u16), SecureChannelError> {
        const SIGNATURE_CHECK_CONCAT_ORDER: [u16; 3] = [0x85, 0x87, 0x99];
        let block_size = self.suite.block_size();
        // Increment SSC when we receive a secure RAPDU
        self.increment_ssc();

        if body.is_empty() {
            if matches!(status_code >> 8, 0x90 | 0x61) {
                return Err(SecureChannelError::MissingResponseMac);
            }
            debug!("Unprotected response with status {:04X}", status_code);
            return Ok((vec![], status_code));
        }

        let parsed_rapdu = ber::Tlv::parse_all(body);
        let rapdu_tlvs = helpers::sort_tlvs_by_tag(&parsed_rapdu);
        trace!("rapdu_tlvs: {:02x?}", rapdu_tlvs);

        // Concat SSC + [DO'85'|DO'87'] + DO'99' + padding, to compare against DO'8E'
        let mut signature_check_data: Vec<u8> = self.ssc.clone();
        for tlv_tag_id in SIGNATURE_CHECK_CONCAT_ORDER {
            if let Some(tlv) = rapdu_tlvs.get(&tlv_tag_id) {
                signature_check_data.extend_from_slice(&tlv.to_vec());
            }
        }
        let signature_check_data =
            icao9303::padding_method_2_pad(&signature_check_data, block_size);
        trace!("signature_check_data: {:02x?}", signature_check_data);
        let signature_check_mac = self.suite.mac(&self.k_mac, &signature_check_data)?;

        let do_8e_tlv = rapdu_tlvs
            .get(&0x8E)
            .ok_or(SecureChannelError::MissingResponseMac)?;
        let do_8e_value = helpers::get_tlv_value_bytes(do_8e_tlv);
        if !bool::from(signature_check_mac.ct_eq(&do_8e_value)) {
            return Err(SecureChannelError::ResponseMac);
        }

        let secure_status_code = match rapdu_tlvs.get(&0x99) {
            Some(do_99_tlv) => {
                let do_99_value = helpers::get_tlv_value_bytes(do_99_tlv);
                let status_bytes: [u8; 2] = do_99_value
                    .try_into()
                    .map_err(|_| SecureChannelError::ResponseTlv)?;
                u16::from_be_bytes(status_bytes)
            }
            None => status_code,
        };

        // Odd INS answers carry the cryptogram in DO'85', without the indicator byte
        let cryptogram_do;
        let encrypted_data = match (rapdu_tlvs.get(&0x85), rapdu_tlvs.get(&0x87)) {
            (Some(_), Some(_)) => return Err(SecureChannelError::ResponseTlv),
            (Some(do_85_tlv), None) => {
                cryptogram_do = helpers::get_tlv_value_bytes(do_85_tlv);
                cryptogram_do.as_slice()
            }
            (None, Some(do_87_tlv)) => {
                cryptogram_do = helpers::get_tlv_value_bytes(do_87_tlv);
                // We skip first byte due to it being the "Padding-content indicator byte".
                let (padding_indicator, encrypted_data) = cryptogram_do
                    .split_first()
                    .ok_or(SecureChannelError::ResponseTlv)?;
                if *padding_indicator != 0x01 {
                    return Err(SecureChannelError::UnknownPadding(*padding_indicator));
                }
                encrypted_data
            }
            (None, None) => return Ok((vec![], secure_status_code)),
        };
        if encrypted_data.is_empty() || encrypted_data.len() % block_size != 0 {
            return Err(SecureChannelError::InvalidPadding);
        }
        let mut decrypted_data = Zeroizing::new(encrypted_data.to_vec());
        let iv = self.current_iv()?;
        self.suite.decrypt(&self.k_enc, &iv, &mut decrypted_data)?;
        let unpadded_data = icao9303::padding_method_2_unpad(&decrypted_data)
            .ok_or(SecureChannelError::InvalidPadding)?;
        trace!("decrypted_unpadded_data: {:02x?}", unpadded_data);
        return Ok((unpadded_data, secure_status_code));
    }
}
