//! BIP-340-style x-only Schnorr signatures.
//!
//! All payload authentication and identifier verification goes through
//! here. The message argument is never signed directly: the scheme signs
//! `SHA256(msg)`, so callers hand over the raw preimage bytes (for hex
//! preimages, the UTF-8 bytes of the hex string).

use num_bigint::BigUint;
use num_traits::Zero;

use crate::curve::{be_bytes32, Point, GENERATOR, GROUP_ORDER};
use crate::hash::Hasher;

use super::{KeyError, SecretKey, Signature};

/// `SHA256(SHA256(tag) ‖ SHA256(tag) ‖ data...)` per BIP-340.
pub(crate) fn tagged_hash(tag: &str, chunks: &[&[u8]]) -> [u8; 32] {
    let tag_digest = Hasher::<256>::hash(tag.as_bytes());
    let mut hasher = Hasher::<256>::new();
    hasher.input(tag_digest.as_ref());
    hasher.input(tag_digest.as_ref());
    for chunk in chunks {
        hasher.input(chunk);
    }
    *hasher.finalize()
}

fn challenge(rx: &[u8; 32], px: &[u8; 32], msg: &[u8; 32]) -> BigUint {
    let digest = tagged_hash("BIP0340/challenge", &[rx, px, msg]);
    BigUint::from_bytes_be(&digest) % &*GROUP_ORDER
}

/// Signs `SHA256(msg)` with the given secret key, returning `R.x ‖ s`.
///
/// Deterministic: the nonce comes from the BIP-340 derivation with all-zero
/// auxiliary randomness.
pub fn sign(msg: &[u8], secret: &SecretKey) -> Result<Signature, KeyError> {
    let n = &*GROUP_ORDER;
    let digest = Hasher::<256>::hash(msg);

    let public = GENERATOR.mul(secret.scalar());
    let (px, py) = match &public {
        Point::Affine { x, y } => (x.clone(), y.clone()),
        Point::Infinity => return Err(KeyError::ZeroScalar),
    };

    // negate the secret when the public point has odd y, per x-only keys
    let d = if py.bit(0) {
        n - secret.scalar()
    } else {
        secret.scalar().clone()
    };

    let aux = tagged_hash("BIP0340/aux", &[&[0u8; 32]]);
    let d_bytes = be_bytes32(&d);
    let mut masked = [0u8; 32];
    for (i, byte) in masked.iter_mut().enumerate() {
        *byte = d_bytes[i] ^ aux[i];
    }

    let px_bytes = be_bytes32(&px);
    let nonce_digest = tagged_hash("BIP0340/nonce", &[&masked, &px_bytes, digest.as_ref()]);
    let k0 = BigUint::from_bytes_be(&nonce_digest) % n;
    if k0.is_zero() {
        return Err(KeyError::ZeroNonce);
    }

    let r_point = GENERATOR.mul(&k0);
    let (rx, ry) = match &r_point {
        Point::Affine { x, y } => (x.clone(), y.clone()),
        Point::Infinity => return Err(KeyError::ZeroNonce),
    };
    let k = if ry.bit(0) { n - &k0 } else { k0 };

    let rx_bytes = be_bytes32(&rx);
    let e = challenge(&rx_bytes, &px_bytes, &digest);
    let s = (&k + &e * &d) % n;

    let mut sig = [0u8; Signature::SIZE];
    sig[..32].copy_from_slice(&rx_bytes);
    sig[32..].copy_from_slice(&be_bytes32(&s));
    Ok(Signature::from(sig))
}

/// Verifies `sig` over `SHA256(msg)` against an x-only public key.
///
/// Malformed signatures, keys or points all evaluate to `false`; this never
/// fails loudly.
pub fn verify(sig: &[u8], msg: &[u8], x_only: &[u8]) -> bool {
    if sig.len() != Signature::SIZE || x_only.len() != 32 {
        return false;
    }

    let digest = Hasher::<256>::hash(msg);

    let px = BigUint::from_bytes_be(x_only);
    let public = match Point::lift_x(&px) {
        Ok(point) => point,
        Err(_) => return false,
    };

    let n = &*GROUP_ORDER;
    let r = BigUint::from_bytes_be(&sig[..32]);
    let s = BigUint::from_bytes_be(&sig[32..]);
    if r >= *crate::curve::FIELD_PRIME || s >= *n {
        return false;
    }

    let mut rx = [0u8; 32];
    rx.copy_from_slice(&sig[..32]);
    let mut px_bytes = [0u8; 32];
    px_bytes.copy_from_slice(x_only);
    let e = challenge(&rx, &px_bytes, &digest);

    // R = s·G - e·P
    let r_point = GENERATOR.mul(&s).add(&public.mul(&(n - e)));
    match r_point {
        Point::Infinity => false,
        Point::Affine { x, y } => !y.bit(0) && x == r,
    }
}
