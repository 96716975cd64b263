//! secp256k1 curve layer
//!
//! Affine point arithmetic over the standard secp256k1 parameters, plus the
//! modular helpers the identifier algebra leans on. Everything here is
//! variable-time on purpose: the protocol only ever moves public material
//! through these functions.

mod arith;
mod point;

use num_bigint::BigUint;
use num_traits::One;
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::hash::Hasher;

pub use arith::{mod_inv, pow_mod};
pub use point::Point;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CurveError {
    #[error("invalid point encoding length {0}, expecting 33 or 65 bytes")]
    InvalidLength(usize),

    #[error("invalid point encoding prefix {0:#04x}")]
    InvalidPrefix(u8),

    #[error("coordinate is not a field element")]
    CoordinateOutOfRange,

    #[error("x coordinate has no square root in the field")]
    NonResidue,

    #[error("point is not on the curve")]
    NotOnCurve,

    #[error("the point at infinity has no encoding")]
    Infinity,

    #[error("value is not invertible for the given modulus")]
    NotInvertible,
}

/// Field prime `p = 2^256 - 2^32 - 977`.
pub static FIELD_PRIME: Lazy<BigUint> = Lazy::new(|| {
    BigUint::parse_bytes(
        b"fffffffffffffffffffffffffffffffffffffffffffffffffffffffefffffc2f",
        16,
    )
    .expect("valid hex constant")
});

/// Group order `n`.
pub static GROUP_ORDER: Lazy<BigUint> = Lazy::new(|| {
    BigUint::parse_bytes(
        b"fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141",
        16,
    )
    .expect("valid hex constant")
});

/// Generator point `G`.
pub static GENERATOR: Lazy<Point> = Lazy::new(|| {
    let x = BigUint::parse_bytes(
        b"79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798",
        16,
    )
    .expect("valid hex constant");
    let y = BigUint::parse_bytes(
        b"483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8",
        16,
    )
    .expect("valid hex constant");
    Point::Affine { x, y }
});

/// Exponent `(p + 1) / 4` used to take square roots in the field.
pub(crate) static SQRT_EXP: Lazy<BigUint> =
    Lazy::new(|| (&*FIELD_PRIME + BigUint::one()) >> 2);

/// Fixed-width big-endian encoding of a value already reduced below `2^256`.
pub fn be_bytes32(v: &BigUint) -> [u8; 32] {
    let bytes = v.to_bytes_be();
    debug_assert!(bytes.len() <= 32);
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

/// ECDH with the Kaspeak derivation applied: the 32-byte shared secret is
/// `SHA256(SHA256(compressed(secret · peer)))`.
pub fn shared_secret(secret: &BigUint, peer: &Point) -> Result<[u8; 32], CurveError> {
    let product = peer.mul(secret);
    let compressed = product.to_compressed()?;
    Ok(*Hasher::<256>::hash_twice(&compressed))
}
