//! Short Weierstrass curves over prime fields.
//!
//! Points are added with the complete formulas of Renes, Costello and Batina
//! (https://eprint.iacr.org/2015/1060), algorithms 1 and 3, which work for any `a`
//! and need no special case for doubling or the point at infinity.
use crypto_bigint::modular::{BoxedMontyForm, BoxedMontyParams};
use crypto_bigint::BoxedUint;
use zeroize::Zeroizing;

use super::{precision_for_len, uint_from_be_bytes, uint_to_be_bytes};
use crate::pace::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffinePoint {
    pub x: BoxedUint,
    pub y: BoxedUint,
}

#[derive(Debug, Clone)]
struct ProjectivePoint {
    x: BoxedMontyForm,
    y: BoxedMontyForm,
    z: BoxedMontyForm,
}

#[derive(Debug, Clone)]
pub struct PrimeCurve {
    p: BoxedUint,
    a: BoxedUint,
    b: BoxedUint,
    generator: AffinePoint,
    params: BoxedMontyParams,
    field_len: usize,
}

impl PrimeCurve {
    /// Builds a curve from big-endian p, a, b and generator coordinates.
    pub fn from_be_slices(
        p: &[u8],
        a: &[u8],
        b: &[u8],
        gx: &[u8],
        gy: &[u8],
    ) -> Result<PrimeCurve, Error> {
        let precision = precision_for_len(p.len());
        let p_uint = uint_from_be_bytes(p, precision)?;
        let odd_p = Option::from(p_uint.to_odd()).ok_or(Error::InvalidDomainParameters)?;
        let field_len = p_uint.bits().div_ceil(8) as usize;
        let curve = PrimeCurve {
            a: uint_from_be_bytes(a, precision)?,
            b: uint_from_be_bytes(b, precision)?,
            generator: AffinePoint {
                x: uint_from_be_bytes(gx, precision)?,
                y: uint_from_be_bytes(gy, precision)?,
            },
            params: BoxedMontyParams::new(odd_p),
            p: p_uint,
            field_len,
        };
        if !curve.is_on_curve(&curve.generator) {
            return Err(Error::InvalidDomainParameters);
        }
        return Ok(curve);
    }

    /// Bytes in one coordinate.
    pub fn field_len(&self) -> usize {
        return self.field_len;
    }

    pub fn generator(&self) -> &AffinePoint {
        return &self.generator;
    }

    /// The same curve with another base point, as produced by a mapping.
    pub fn with_generator(&self, generator: AffinePoint) -> PrimeCurve {
        let mut mapped = self.clone();
        mapped.generator = generator;
        return mapped;
    }

    fn monty(&self, value: &BoxedUint) -> BoxedMontyForm {
        return BoxedMontyForm::new(value.clone(), self.params.clone());
    }

    fn to_projective(&self, point: &AffinePoint) -> ProjectivePoint {
        return ProjectivePoint {
            x: self.monty(&point.x),
            y: self.monty(&point.y),
            z: BoxedMontyForm::one(self.params.clone()),
        };
    }

    /// None for the point at infinity.
    fn to_affine(&self, point: &ProjectivePoint) -> Option<AffinePoint> {
        let z_inverse: BoxedMontyForm = Option::from(point.z.invert())?;
        return Some(AffinePoint {
            x: (&point.x * &z_inverse).retrieve(),
            y: (&point.y * &z_inverse).retrieve(),
        });
    }

    fn infinity(&self) -> ProjectivePoint {
        return ProjectivePoint {
            x: BoxedMontyForm::zero(self.params.clone()),
            y: BoxedMontyForm::one(self.params.clone()),
            z: BoxedMontyForm::zero(self.params.clone()),
        };
    }

    pub fn is_on_curve(&self, point: &AffinePoint) -> bool {
        if point.x >= self.p || point.y >= self.p {
            return false;
        }
        let x = self.monty(&point.x);
        let y = self.monty(&point.y);
        let lhs = &y * &y;
        let rhs = &(&(&(&x * &x) * &x) + &(&self.monty(&self.a) * &x)) + &self.monty(&self.b);
        return lhs.retrieve() == rhs.retrieve();
    }

    fn double(&self, point: &ProjectivePoint) -> ProjectivePoint {
        let a = self.monty(&self.a);
        let b = self.monty(&self.b);
        let b3 = &(&b + &b) + &b;
        let (x, y, z) = (&point.x, &point.y, &point.z);

        let t0 = x * x;
        let t1 = y * y;
        let t2 = z * z;
        let t3 = x * y;
        let t3 = &t3 + &t3;
        let z3 = x * z;
        let z3 = &z3 + &z3;
        let x3 = &a * &z3;
        let y3 = &x3 + &(&b3 * &t2);
        let x3 = &t1 - &y3;
        let y3 = &x3 * &(&t1 + &y3);
        let x3 = &t3 * &x3;
        let z3 = &b3 * &z3;
        let t2 = &a * &t2;
        let t3 = &(&a * &(&t0 - &t2)) + &z3;
        let z3 = &t0 + &t0;
        let t0 = &(&z3 + &t0) + &t2;
        let t0 = &t0 * &t3;
        let y3 = &y3 + &t0;
        let t2 = y * z;
        let t2 = &t2 + &t2;
        let t0 = &t2 * &t3;
        let x3 = &x3 - &t0;
        let z3 = &t2 * &t1;
        let z3 = &z3 + &z3;
        let z3 = &z3 + &z3;
        return ProjectivePoint {
            x: x3,
            y: y3,
            z: z3,
        };
    }

    fn add(&self, lhs: &ProjectivePoint, rhs: &ProjectivePoint) -> ProjectivePoint {
        let a = self.monty(&self.a);
        let b = self.monty(&self.b);
        let b3 = &(&b + &b) + &b;

        let t0 = &lhs.x * &rhs.x;
        let t1 = &lhs.y * &rhs.y;
        let t2 = &lhs.z * &rhs.z;
        let t3 = &(&lhs.x + &lhs.y) * &(&rhs.x + &rhs.y);
        let t3 = &t3 - &(&t0 + &t1);
        let t4 = &(&lhs.x + &lhs.z) * &(&rhs.x + &rhs.z);
        let t4 = &t4 - &(&t0 + &t2);
        let t5 = &(&lhs.y + &lhs.z) * &(&rhs.y + &rhs.z);
        let t5 = &t5 - &(&t1 + &t2);
        let z3 = &(&b3 * &t2) + &(&a * &t4);
        let x3 = &t1 - &z3;
        let z3 = &t1 + &z3;
        let y3 = &x3 * &z3;
        let t1 = &(&t0 + &t0) + &t0;
        let t2 = &a * &t2;
        let t4 = &b3 * &t4;
        let t1 = &t1 + &t2;
        let t2 = &a * &(&t0 - &t2);
        let t4 = &t4 + &t2;
        let y3 = &y3 + &(&t1 * &t4);
        let x3 = &(&t3 * &x3) - &(&t5 * &t4);
        let z3 = &(&t5 * &z3) + &(&t3 * &t1);
        return ProjectivePoint {
            x: x3,
            y: y3,
            z: z3,
        };
    }

    /// scalar * point. Fails if the result is the point at infinity.
    pub fn multiply(&self, scalar: &BoxedUint, point: &AffinePoint) -> Result<AffinePoint, Error> {
        let mut result = self.infinity();
        let mut addend = self.to_projective(point);
        // walk every bit of the precision, not just the significant ones
        for i in 0..scalar.bits_precision() {
            let sum = self.add(&result, &addend);
            if bool::from(scalar.bit(i)) {
                result = sum;
            }
            addend = self.double(&addend);
        }
        return self.to_affine(&result).ok_or(Error::InvalidPublicKey);
    }

    /// lhs + rhs. Fails if the result is the point at infinity.
    pub fn add_points(&self, lhs: &AffinePoint, rhs: &AffinePoint) -> Result<AffinePoint, Error> {
        let sum = self.add(&self.to_projective(lhs), &self.to_projective(rhs));
        return self.to_affine(&sum).ok_or(Error::InvalidPublicKey);
    }

    /// Decodes an uncompressed point (04 || x || y) and checks it lies on the curve.
    pub fn decode_point(&self, data: &[u8]) -> Result<AffinePoint, Error> {
        if data.len() != 1 + 2 * self.field_len || data[0] != 0x04 {
            return Err(Error::InvalidPublicKey);
        }
        let (x, y) = data[1..].split_at(self.field_len);
        let precision = self.p.bits_precision();
        let point = AffinePoint {
            x: uint_from_be_bytes(x, precision)?,
            y: uint_from_be_bytes(y, precision)?,
        };
        if !self.is_on_curve(&point) {
            return Err(Error::InvalidPublicKey);
        }
        return Ok(point);
    }

    pub fn encode_point(&self, point: &AffinePoint) -> Vec<u8> {
        let mut encoded = Vec::with_capacity(1 + 2 * self.field_len);
        encoded.push(0x04);
        encoded.extend(uint_to_be_bytes(&point.x, self.field_len));
        encoded.extend(uint_to_be_bytes(&point.y, self.field_len));
        return encoded;
    }

    /// The x coordinate, padded to the field length.
    pub fn encode_x(&self, point: &AffinePoint) -> Zeroizing<Vec<u8>> {
        return Zeroizing::new(uint_to_be_bytes(&point.x, self.field_len));
    }
}
