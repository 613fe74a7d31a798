//! Diffie-Hellman over a prime-order subgroup of Z/pZ.
use crypto_bigint::modular::{BoxedMontyForm, BoxedMontyParams};
use crypto_bigint::BoxedUint;
use zeroize::Zeroizing;

use super::{precision_for_len, uint_from_be_bytes, uint_to_be_bytes};
use crate::pace::Error;

#[derive(Debug, Clone)]
pub struct DhGroup {
    p: BoxedUint,
    generator: BoxedUint,
    params: BoxedMontyParams,
    prime_len: usize,
    order_len: usize,
}

impl DhGroup {
    pub fn from_be_slices(p: &[u8], g: &[u8], q: &[u8]) -> Result<DhGroup, Error> {
        let precision = precision_for_len(p.len());
        let p_uint = uint_from_be_bytes(p, precision)?;
        let odd_p = Option::from(p_uint.to_odd()).ok_or(Error::InvalidDomainParameters)?;
        return Ok(DhGroup {
            generator: uint_from_be_bytes(g, precision)?,
            params: BoxedMontyParams::new(odd_p),
            prime_len: p_uint.bits().div_ceil(8) as usize,
            order_len: q.iter().skip_while(|byte| **byte == 0).count(),
            p: p_uint,
        });
    }

    /// Bytes in an encoded public key or shared secret.
    pub fn prime_len(&self) -> usize {
        return self.prime_len;
    }

    /// Private keys are as long as the subgroup order.
    pub fn order_len(&self) -> usize {
        return self.order_len;
    }

    pub fn generator(&self) -> &BoxedUint {
        return &self.generator;
    }

    pub fn with_generator(&self, generator: BoxedUint) -> DhGroup {
        let mut mapped = self.clone();
        mapped.generator = generator;
        return mapped;
    }

    /// base ^ exponent mod p
    pub fn pow(&self, base: &BoxedUint, exponent: &BoxedUint) -> BoxedUint {
        let base = BoxedMontyForm::new(base.clone(), self.params.clone());
        return base.pow(exponent).retrieve();
    }

    /// lhs * rhs mod p
    pub fn multiply(&self, lhs: &BoxedUint, rhs: &BoxedUint) -> BoxedUint {
        let lhs = BoxedMontyForm::new(lhs.clone(), self.params.clone());
        let rhs = BoxedMontyForm::new(rhs.clone(), self.params.clone());
        return (&lhs * &rhs).retrieve();
    }

    /// Decodes a public value and checks 1 < y < p - 1.
    pub fn decode_public_key(&self, data: &[u8]) -> Result<BoxedUint, Error> {
        if data.len() > self.prime_len {
            return Err(Error::InvalidPublicKey);
        }
        let value = uint_from_be_bytes(data, self.p.bits_precision())?;
        let one = BoxedUint::one_with_precision(self.p.bits_precision());
        let p_minus_one = self.p.wrapping_sub(&one);
        if value <= one || value >= p_minus_one {
            return Err(Error::InvalidPublicKey);
        }
        return Ok(value);
    }

    /// Encodes a group element padded to the length of p.
    pub fn encode(&self, value: &BoxedUint) -> Zeroizing<Vec<u8>> {
        return Zeroizing::new(uint_to_be_bytes(value, self.prime_len));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypt::parameters;
    use hex_literal::hex;

    #[test]
    fn appendix_g2_static_agreement() {
        let (_, p, g, q) = parameters::named_group(0).unwrap();
        let group = DhGroup::from_be_slices(p, g, q).unwrap();
        assert_eq!(group.prime_len(), 128);
        assert_eq!(group.order_len(), 20);

        let terminal_private = uint_from_be_bytes(
            &hex!("5265030F751F4AD18B08AC565FC7AC952E41618D"),
            192,
        )
        .unwrap();
        let terminal_public = group.pow(group.generator(), &terminal_private);
        assert_eq!(
            group.encode(&terminal_public).as_slice(),
            hex!("23FB3749EA030D2A25B278D2A562047ADE3F01B74F17A15402CB7352CA7D2B3EB71C343DB13D1DEBCE9A3666DBCFC920B49174A602CB47965CAA73DC702489A44D41DB914DE9613DC5E98C94160551C0DF86274B9359BC0490D01B03AD54022DCB4F57FAD6322497D7A1E28D46710F461AFE710FBBBC5F8BA166F4311975EC6C")
        );
    }

    #[test]
    fn rejects_degenerate_public_values() {
        let (_, p, g, q) = parameters::named_group(0).unwrap();
        let group = DhGroup::from_be_slices(p, g, q).unwrap();
        assert_eq!(group.decode_public_key(&[0x01]), Err(Error::InvalidPublicKey));
        assert_eq!(group.decode_public_key(&[0x00]), Err(Error::InvalidPublicKey));
        assert_eq!(group.decode_public_key(p), Err(Error::InvalidPublicKey));
        assert!(group.decode_public_key(g).is_ok());
    }
}
