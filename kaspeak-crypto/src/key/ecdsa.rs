//! ECDSA over secp256k1 with the same `SHA256(msg)` digest rule as the
//! Schnorr scheme. Nonces are deterministic per RFC 6979.

use cryptoxide::{hmac::Hmac, mac::Mac, sha2::Sha256};
use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::curve::{be_bytes32, mod_inv, Point, GENERATOR, GROUP_ORDER};
use crate::hash::Hasher;

use super::{KeyError, SecretKey, Signature};

fn hmac_sha256(key: &[u8], chunks: &[&[u8]]) -> [u8; 32] {
    let mut mac = Hmac::new(Sha256::new(), key);
    for chunk in chunks {
        mac.input(chunk);
    }
    let mut out = [0u8; 32];
    mac.raw_result(&mut out);
    out
}

/// RFC 6979 HMAC-DRBG producing nonce candidates in `[1, n-1]`.
struct NonceDrbg {
    k: [u8; 32],
    v: [u8; 32],
}

impl NonceDrbg {
    fn new(secret: &[u8; 32], digest: &[u8; 32]) -> Self {
        let mut k = [0u8; 32];
        let mut v = [1u8; 32];

        k = hmac_sha256(&k, &[&v, &[0x00], secret, digest]);
        v = hmac_sha256(&k, &[&v]);
        k = hmac_sha256(&k, &[&v, &[0x01], secret, digest]);
        v = hmac_sha256(&k, &[&v]);

        Self { k, v }
    }

    fn next(&mut self) -> BigUint {
        loop {
            self.v = hmac_sha256(&self.k, &[&self.v]);
            let candidate = BigUint::from_bytes_be(&self.v);
            if !candidate.is_zero() && candidate < *GROUP_ORDER {
                return candidate;
            }
            self.k = hmac_sha256(&self.k, &[&self.v, &[0x00]]);
            self.v = hmac_sha256(&self.k, &[&self.v]);
        }
    }
}

/// Signs `SHA256(msg)`, returning `r ‖ s` as 64 bytes.
pub fn sign(msg: &[u8], secret: &SecretKey) -> Result<Signature, KeyError> {
    let n = &*GROUP_ORDER;
    let digest = Hasher::<256>::hash(msg);
    let h = BigUint::from_bytes_be(digest.as_ref()) % n;

    let secret_bytes = be_bytes32(secret.scalar());
    let mut drbg = NonceDrbg::new(&secret_bytes, &digest);

    loop {
        let k = drbg.next();

        let r_point = GENERATOR.mul(&k);
        let rx = match &r_point {
            Point::Affine { x, .. } => x.clone(),
            Point::Infinity => continue,
        };

        let r = rx % n;
        if r.is_zero() {
            continue;
        }

        let k_inv = mod_inv(&k, n)?;
        let s = k_inv * ((&h + &r * secret.scalar()) % n) % n;
        if s.is_zero() {
            continue;
        }

        let mut sig = [0u8; Signature::SIZE];
        sig[..32].copy_from_slice(&be_bytes32(&r));
        sig[32..].copy_from_slice(&be_bytes32(&s));
        return Ok(Signature::from(sig));
    }
}

/// Verifies `sig` over `SHA256(msg)` against a compressed or uncompressed
/// public key encoding. Malformed input evaluates to `false`.
pub fn verify(sig: &[u8], msg: &[u8], public_key: &[u8]) -> bool {
    if sig.len() != Signature::SIZE {
        return false;
    }

    let public = match Point::from_bytes(public_key) {
        Ok(point) => point,
        Err(_) => return false,
    };

    let n = &*GROUP_ORDER;
    let r = BigUint::from_bytes_be(&sig[..32]);
    let s = BigUint::from_bytes_be(&sig[32..]);
    if r.is_zero() || s.is_zero() || r >= *n || s >= *n {
        return false;
    }

    let digest = Hasher::<256>::hash(msg);
    let h = BigUint::from_bytes_be(digest.as_ref()) % n;

    let w = match mod_inv(&s, n) {
        Ok(w) => w,
        Err(_) => return false,
    };
    let u1 = &h * &w % n;
    let u2 = &r * &w % n;

    let candidate = GENERATOR.mul(&u1).add(&public.mul(&u2));
    match candidate {
        Point::Infinity => false,
        Point::Affine { x, .. } => x % n == r,
    }
}
