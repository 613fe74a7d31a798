//! Key agreement for PACE.
//!
//! Public keys travel as the chip expects them: DH values padded to the length of p,
//! EC points uncompressed (04 || x || y) with each coordinate padded to the field length.
pub mod dh;
pub mod elliptic;
pub mod parameters;

use crypto_bigint::BoxedUint;
use rand::Rng;
use zeroize::Zeroizing;

use crate::pace::Error;
use dh::DhGroup;
use elliptic::PrimeCurve;

/// Limb-aligned precision able to hold `len` bytes.
pub(crate) fn precision_for_len(len: usize) -> u32 {
    return (len.div_ceil(8) * 64) as u32;
}

/// Big-endian bytes into an integer of the given (limb-aligned) precision.
pub(crate) fn uint_from_be_bytes(data: &[u8], bits_precision: u32) -> Result<BoxedUint, Error> {
    let significant: Vec<u8> = data.iter().copied().skip_while(|byte| *byte == 0).collect();
    let total_len = bits_precision as usize / 8;
    if significant.len() > total_len {
        return Err(Error::InvalidPublicKey);
    }
    let mut padded = Zeroizing::new(vec![0u8; total_len - significant.len()]);
    padded.extend_from_slice(&significant);
    return BoxedUint::from_be_slice(&padded, bits_precision).map_err(|_| Error::InvalidPublicKey);
}

/// An integer as exactly `len` big-endian bytes. The value must fit.
pub(crate) fn uint_to_be_bytes(value: &BoxedUint, len: usize) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    if bytes.len() >= len {
        return bytes[bytes.len() - len..].to_vec();
    }
    let mut padded = vec![0u8; len - bytes.len()];
    padded.extend_from_slice(&bytes);
    return padded;
}

fn scalar(private_key: &[u8]) -> Result<Zeroizing<BoxedUint>, Error> {
    return Ok(Zeroizing::new(uint_from_be_bytes(
        private_key,
        precision_for_len(private_key.len()),
    )?));
}

/// Domain parameters a PACE run agrees keys over.
#[derive(Debug, Clone)]
pub enum KeyAgreement {
    Dh(DhGroup),
    Ecdh(PrimeCurve),
}

impl KeyAgreement {
    /// Domain parameters for a standardized parameter id (ICAO 9303 p11, 9.5.1).
    pub fn from_parameter_id(parameter_id: u64) -> Result<KeyAgreement, Error> {
        if let Some((_, p, a, b, gx, gy)) = parameters::named_curve(parameter_id) {
            return Ok(Self::Ecdh(PrimeCurve::from_be_slices(p, a, b, gx, gy)?));
        }
        if let Some((_, p, g, q)) = parameters::named_group(parameter_id) {
            return Ok(Self::Dh(DhGroup::from_be_slices(p, g, q)?));
        }
        return Err(Error::UnsupportedParameters(parameter_id));
    }

    pub fn is_elliptic(&self) -> bool {
        return matches!(self, Self::Ecdh(_));
    }

    pub fn private_key_len(&self) -> usize {
        return match self {
            Self::Dh(group) => group.order_len(),
            Self::Ecdh(curve) => curve.field_len(),
        };
    }

    /// Random private key of the right length, never zero.
    pub fn generate_private_key(&self) -> Zeroizing<Vec<u8>> {
        let mut private_key = Zeroizing::new(vec![0u8; self.private_key_len()]);
        while private_key.iter().all(|byte| *byte == 0) {
            rand::rng().fill(&mut private_key[..]);
        }
        return private_key;
    }

    /// The public key for a private key, under the current generator.
    pub fn public_key(&self, private_key: &[u8]) -> Result<Vec<u8>, Error> {
        let private_key = scalar(private_key)?;
        return match self {
            Self::Dh(group) => {
                let public_key = group.pow(group.generator(), &private_key);
                Ok(group.encode(&public_key).to_vec())
            }
            Self::Ecdh(curve) => {
                let public_key = curve.multiply(&private_key, curve.generator())?;
                Ok(curve.encode_point(&public_key))
            }
        };
    }

    /// Shared secret: the DH value padded to p, or the x coordinate of the EC point.
    pub fn shared_secret(
        &self,
        private_key: &[u8],
        other_public_key: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, Error> {
        let private_key = scalar(private_key)?;
        return match self {
            Self::Dh(group) => {
                let other = group.decode_public_key(other_public_key)?;
                Ok(group.encode(&group.pow(&other, &private_key)))
            }
            Self::Ecdh(curve) => {
                let other = curve.decode_point(other_public_key)?;
                Ok(curve.encode_x(&curve.multiply(&private_key, &other)?))
            }
        };
    }

    /// Generic mapping (ICAO 9303 p11, 4.4.3.3.1): the same parameters with the generator
    /// moved to s * G + H (EC) or g^s * h (DH), H being the agreed point or value.
    pub fn map_generic(
        &self,
        nonce: &[u8],
        private_key: &[u8],
        other_public_key: &[u8],
    ) -> Result<KeyAgreement, Error> {
        let nonce = scalar(nonce)?;
        let private_key = scalar(private_key)?;
        return match self {
            Self::Dh(group) => {
                let other = group.decode_public_key(other_public_key)?;
                let h = group.pow(&other, &private_key);
                let g_s = group.pow(group.generator(), &nonce);
                Ok(Self::Dh(group.with_generator(group.multiply(&g_s, &h))))
            }
            Self::Ecdh(curve) => {
                let other = curve.decode_point(other_public_key)?;
                let h = curve.multiply(&private_key, &other)?;
                let s_g = curve.multiply(&nonce, curve.generator())?;
                Ok(Self::Ecdh(curve.with_generator(curve.add_points(&s_g, &h)?)))
            }
        };
    }

    /// Public key data object tag in authentication tokens.
    pub fn public_key_tag(&self) -> u16 {
        return match self {
            Self::Dh(_) => 0x84,
            Self::Ecdh(_) => 0x86,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_encoding_pads_and_strips() {
        let value = uint_from_be_bytes(&[0x00, 0x00, 0x01, 0x02], 64).unwrap();
        assert_eq!(uint_to_be_bytes(&value, 3), vec![0x00, 0x01, 0x02]);
        assert_eq!(uint_to_be_bytes(&value, 10).len(), 10);
        assert!(uint_from_be_bytes(&[0xFF; 9], 64).is_err());
        assert_eq!(precision_for_len(20), 192);
        assert_eq!(precision_for_len(66), 576);
    }

    #[test]
    fn unknown_parameter_ids_are_refused() {
        assert_eq!(
            KeyAgreement::from_parameter_id(2).unwrap_err(),
            Error::UnsupportedParameters(2)
        );
        assert!(KeyAgreement::from_parameter_id(0).is_ok());
        assert!(KeyAgreement::from_parameter_id(18).unwrap().is_elliptic());
    }

    #[test]
    fn both_sides_agree() {
        let agreement = KeyAgreement::from_parameter_id(12).unwrap();
        let ours = agreement.generate_private_key();
        let theirs = agreement.generate_private_key();
        let our_public = agreement.public_key(&ours).unwrap();
        let their_public = agreement.public_key(&theirs).unwrap();
        assert_eq!(
            agreement.shared_secret(&ours, &their_public).unwrap(),
            agreement.shared_secret(&theirs, &our_public).unwrap()
        );
    }
}
