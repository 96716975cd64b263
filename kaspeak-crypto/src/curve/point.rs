use num_bigint::BigUint;
use num_traits::Zero;

use super::arith::{mod_inv, sqrt_fp, sub_mod};
use super::{CurveError, FIELD_PRIME, GROUP_ORDER};

/// A secp256k1 point in affine coordinates.
///
/// The point at infinity is an explicit variant so scalar multiplication by
/// a multiple of the group order has somewhere honest to land.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Point {
    Infinity,
    Affine { x: BigUint, y: BigUint },
}

impl Point {
    pub const COMPRESSED_SIZE: usize = 33;
    pub const UNCOMPRESSED_SIZE: usize = 65;

    pub fn is_infinity(&self) -> bool {
        matches!(self, Point::Infinity)
    }

    /// Decodes a compressed (33-byte, `0x02`/`0x03` prefix) or uncompressed
    /// (65-byte, `0x04` prefix) point encoding.
    ///
    /// Compressed input recovers `y` as the square root of `x³ + 7`,
    /// picking the parity the prefix asks for; uncompressed input is
    /// checked against the curve equation.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CurveError> {
        let p = &*FIELD_PRIME;
        match bytes.len() {
            Self::COMPRESSED_SIZE => {
                let prefix = bytes[0];
                if prefix != 0x02 && prefix != 0x03 {
                    return Err(CurveError::InvalidPrefix(prefix));
                }
                let x = BigUint::from_bytes_be(&bytes[1..]);
                if x >= *p {
                    return Err(CurveError::CoordinateOutOfRange);
                }
                let mut y = sqrt_fp(&curve_rhs(&x))?;
                let want_odd = prefix == 0x03;
                if y.bit(0) != want_odd {
                    y = p - y;
                }
                Ok(Point::Affine { x, y })
            }
            Self::UNCOMPRESSED_SIZE => {
                let prefix = bytes[0];
                if prefix != 0x04 {
                    return Err(CurveError::InvalidPrefix(prefix));
                }
                let x = BigUint::from_bytes_be(&bytes[1..33]);
                let y = BigUint::from_bytes_be(&bytes[33..]);
                if x >= *p || y >= *p {
                    return Err(CurveError::CoordinateOutOfRange);
                }
                if (&y * &y) % p != curve_rhs(&x) {
                    return Err(CurveError::NotOnCurve);
                }
                Ok(Point::Affine { x, y })
            }
            other => Err(CurveError::InvalidLength(other)),
        }
    }

    /// Recovers the even-`y` point for an x-only key.
    pub fn lift_x(x: &BigUint) -> Result<Self, CurveError> {
        let p = &*FIELD_PRIME;
        if x >= p {
            return Err(CurveError::CoordinateOutOfRange);
        }
        let mut y = sqrt_fp(&curve_rhs(x))?;
        if y.bit(0) {
            y = p - y;
        }
        Ok(Point::Affine { x: x.clone(), y })
    }

    /// 33-byte compressed encoding, prefix taken from the parity of `y`.
    pub fn to_compressed(&self) -> Result<[u8; 33], CurveError> {
        match self {
            Point::Infinity => Err(CurveError::Infinity),
            Point::Affine { x, y } => {
                let mut out = [0u8; 33];
                out[0] = if y.bit(0) { 0x03 } else { 0x02 };
                out[1..].copy_from_slice(&super::be_bytes32(x));
                Ok(out)
            }
        }
    }

    /// 65-byte uncompressed encoding.
    pub fn to_uncompressed(&self) -> Result<[u8; 65], CurveError> {
        match self {
            Point::Infinity => Err(CurveError::Infinity),
            Point::Affine { x, y } => {
                let mut out = [0u8; 65];
                out[0] = 0x04;
                out[1..33].copy_from_slice(&super::be_bytes32(x));
                out[33..].copy_from_slice(&super::be_bytes32(y));
                Ok(out)
            }
        }
    }

    pub fn add(&self, other: &Point) -> Point {
        let p = &*FIELD_PRIME;
        match (self, other) {
            (Point::Infinity, _) => other.clone(),
            (_, Point::Infinity) => self.clone(),
            (Point::Affine { x: x1, y: y1 }, Point::Affine { x: x2, y: y2 }) => {
                if x1 == x2 {
                    if y1 == y2 {
                        return self.double();
                    }
                    // y2 = p - y1, the inverse point
                    return Point::Infinity;
                }

                let num = sub_mod(y2, y1, p);
                let den = sub_mod(x2, x1, p);
                let lambda = num * mod_inv(&den, p).expect("nonzero denominator") % p;

                let x3 = sub_mod(&sub_mod(&(&lambda * &lambda % p), x1, p), x2, p);
                let y3 = sub_mod(&(&lambda * sub_mod(x1, &x3, p) % p), y1, p);
                Point::Affine { x: x3, y: y3 }
            }
        }
    }

    pub fn double(&self) -> Point {
        let p = &*FIELD_PRIME;
        match self {
            Point::Infinity => Point::Infinity,
            Point::Affine { x, y } => {
                if y.is_zero() {
                    return Point::Infinity;
                }

                let num = BigUint::from(3u32) * x * x % p;
                let den = BigUint::from(2u32) * y % p;
                let lambda = num * mod_inv(&den, p).expect("nonzero denominator") % p;

                let two_x = BigUint::from(2u32) * x % p;
                let x3 = sub_mod(&(&lambda * &lambda % p), &two_x, p);
                let y3 = sub_mod(&(&lambda * sub_mod(x, &x3, p) % p), y, p);
                Point::Affine { x: x3, y: y3 }
            }
        }
    }

    /// Variable-time scalar multiplication. The scalar is reduced modulo the
    /// group order; a zero scalar or an infinity input yields infinity.
    pub fn mul(&self, scalar: &BigUint) -> Point {
        let k = scalar % &*GROUP_ORDER;
        if k.is_zero() || self.is_infinity() {
            return Point::Infinity;
        }

        let mut acc = Point::Infinity;
        let mut addend = self.clone();
        for bit in 0..k.bits() {
            if k.bit(bit) {
                acc = acc.add(&addend);
            }
            addend = addend.double();
        }
        acc
    }
}

/// `x³ + 7 mod p`, the right-hand side of the curve equation.
fn curve_rhs(x: &BigUint) -> BigUint {
    let p = &*FIELD_PRIME;
    (x * x % p * x + BigUint::from(7u32)) % p
}
