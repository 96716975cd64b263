//! secp256k1 asymmetric keys and signatures
//!
//! [`SecretKey`] holds a scalar in `[1, n-1]` and is the only thing that can
//! produce a [`Signature`]. Payload authentication uses the BIP-340-style
//! x-only Schnorr scheme in [`schnorr`]; an ECDSA scheme with the same
//! message-digest rule lives in [`ecdsa`]. Both emit 64 bytes.

pub mod ecdsa;
pub mod schnorr;

use std::{fmt, str::FromStr};

use num_bigint::BigUint;
use num_traits::Zero;
use rand_core::{CryptoRng, RngCore};
use thiserror::Error;

use crate::curve::{be_bytes32, CurveError, Point, GENERATOR, GROUP_ORDER};

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("secret scalar must be non-zero")]
    ZeroScalar,

    #[error("invalid scalar encoding, expecting {} bytes", SecretKey::SIZE)]
    InvalidScalarSize,

    #[error("invalid hex encoding: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("invalid curve point: {0}")]
    InvalidPoint(#[from] CurveError),

    #[error("signing nonce degenerated to zero")]
    ZeroNonce,
}

/// Error type used when retrieving a [`PublicKey`] via the [`TryFrom`]
/// trait.
#[derive(Debug, Error)]
pub enum TryFromPublicKeyError {
    #[error("invalid public key: {0}")]
    Invalid(#[from] CurveError),
}

/// Error type used when retrieving a [`Signature`] via the [`TryFrom`]
/// trait.
#[derive(Debug, Error)]
pub enum TryFromSignatureError {
    #[error("invalid size, expecting {}", Signature::SIZE)]
    InvalidSize,
}

/// secp256k1 secret key: a scalar in `[1, n-1]`.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(BigUint);

impl SecretKey {
    /// This is the size of the scalar in bytes.
    pub const SIZE: usize = 32;

    /// generate a new [`SecretKey`] with the given random number generator
    pub fn new<Rng>(mut rng: Rng) -> Self
    where
        Rng: RngCore + CryptoRng,
    {
        loop {
            let mut bytes = [0u8; Self::SIZE];
            rng.fill_bytes(&mut bytes);
            let scalar = BigUint::from_bytes_be(&bytes) % &*GROUP_ORDER;
            if !scalar.is_zero() {
                return Self(scalar);
            }
        }
    }

    /// Normalises an arbitrary scalar into the key range, rejecting values
    /// congruent to zero.
    pub fn from_scalar(scalar: BigUint) -> Result<Self, KeyError> {
        let reduced = scalar % &*GROUP_ORDER;
        if reduced.is_zero() {
            return Err(KeyError::ZeroScalar);
        }
        Ok(Self(reduced))
    }

    /// Fixed-width big-endian bytes, the usual wallet export form.
    pub fn from_bytes(bytes: [u8; Self::SIZE]) -> Result<Self, KeyError> {
        Self::from_scalar(BigUint::from_bytes_be(&bytes))
    }

    /// 64-char hex string form.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let mut bytes = [0u8; Self::SIZE];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| KeyError::InvalidScalarSize)?;
        Self::from_bytes(bytes)
    }

    /// Small-integer form, handy for tests and deterministic fixtures.
    pub fn from_u64(v: u64) -> Result<Self, KeyError> {
        Self::from_scalar(BigUint::from(v))
    }

    /// get the [`PublicKey`] associated to this key
    pub fn public_key(&self) -> PublicKey {
        let point = GENERATOR.mul(&self.0);
        PublicKey::from_point(point).expect("non-zero scalar cannot produce infinity")
    }

    /// create a Schnorr [`Signature`] for the given message
    ///
    /// The signed value is `SHA256(msg)`; verification takes the x-only
    /// form of the associated [`PublicKey`].
    pub fn sign<T>(&self, msg: T) -> Result<Signature, KeyError>
    where
        T: AsRef<[u8]>,
    {
        schnorr::sign(msg.as_ref(), self)
    }

    /// create an ECDSA [`Signature`] for the given message
    pub fn sign_ecdsa<T>(&self, msg: T) -> Result<Signature, KeyError>
    where
        T: AsRef<[u8]>,
    {
        ecdsa::sign(msg.as_ref(), self)
    }

    /// ECDH against a peer key, with the double-SHA-256 derivation applied.
    pub fn shared_secret(&self, peer: &PublicKey) -> Result<[u8; 32], CurveError> {
        crate::curve::shared_secret(&self.0, peer.point())
    }

    pub(crate) fn scalar(&self) -> &BigUint {
        &self.0
    }

    /// convert the [`SecretKey`] into its raw byte composition
    ///
    /// # Safety
    ///
    /// Not unsafe in the memory sense, but it removes the opaque-`Debug`
    /// protection around the scalar; the caller takes on responsibility for
    /// not leaking the bytes. The associated-function form forces call
    /// sites to spell out `SecretKey::leak_into_bytes(key)`.
    pub unsafe fn leak_into_bytes(Self(scalar): Self) -> [u8; Self::SIZE] {
        be_bytes32(&scalar)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// secp256k1 public key, held alongside its compressed encoding.
///
/// Never the point at infinity.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    point: Point,
    bytes: [u8; Self::SIZE],
}

impl PublicKey {
    /// This is the size of the compressed encoding in bytes.
    pub const SIZE: usize = 33;

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CurveError> {
        let point = Point::from_bytes(bytes)?;
        Self::from_point(point)
    }

    pub fn from_point(point: Point) -> Result<Self, CurveError> {
        let bytes = point.to_compressed()?;
        Ok(Self { point, bytes })
    }

    pub fn point(&self) -> &Point {
        &self.point
    }

    /// Compressed 33-byte encoding.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        self.bytes
    }

    pub fn as_bytes(&self) -> &[u8; Self::SIZE] {
        &self.bytes
    }

    /// The 32 x-only bytes Schnorr verification wants.
    pub fn x_only(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.bytes[1..]);
        out
    }

    /// verify a Schnorr [`Signature`] over the given message
    pub fn verify<T>(&self, signature: &Signature, msg: T) -> bool
    where
        T: AsRef<[u8]>,
    {
        schnorr::verify(signature.as_ref(), msg.as_ref(), &self.bytes[1..])
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = TryFromPublicKeyError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self::from_bytes(value)?)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey").field(&hex::encode(self.bytes)).finish()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.bytes))
    }
}

impl FromStr for PublicKey {
    type Err = TryFromPublicKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| CurveError::InvalidLength(s.len() / 2))?;
        Ok(Self::from_bytes(&bytes)?)
    }
}

/// A 64-byte signature, `r ‖ s` for ECDSA and `R.x ‖ s` for Schnorr.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; Self::SIZE]);

impl Signature {
    /// This is the size of the signature in bytes.
    pub const SIZE: usize = 64;
}

impl From<[u8; Signature::SIZE]> for Signature {
    fn from(bytes: [u8; Signature::SIZE]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Signature {
    type Error = TryFromSignatureError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; Self::SIZE] = value
            .try_into()
            .map_err(|_| TryFromSignatureError::InvalidSize)?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signature").field(&hex::encode(self.0)).finish()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Signature {
    type Err = TryFromSignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| TryFromSignatureError::InvalidSize)?;
        Self::try_from(bytes.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_scalar_is_rejected() {
        assert!(matches!(
            SecretKey::from_u64(0),
            Err(KeyError::ZeroScalar)
        ));
        assert!(SecretKey::from_bytes([0u8; 32]).is_err());
    }

    #[test]
    fn scalar_is_reduced_modulo_order() {
        let order_plus_six = &*GROUP_ORDER + BigUint::from(6u32);
        let wrapped = SecretKey::from_scalar(order_plus_six).unwrap();
        assert_eq!(wrapped, SecretKey::from_u64(6).unwrap());
    }

    #[test]
    fn hex_and_bytes_forms_agree() {
        let hex_form =
            SecretKey::from_hex("0000000000000000000000000000000000000000000000000000000000000006")
                .unwrap();
        assert_eq!(hex_form, SecretKey::from_u64(6).unwrap());
    }

    #[test]
    fn public_key_round_trips_through_bytes() {
        let sk = SecretKey::from_u64(1337).unwrap();
        let pk = sk.public_key();
        let back = PublicKey::from_bytes(&pk.to_bytes()).unwrap();
        assert_eq!(back, pk);
    }

    #[test]
    fn debug_never_prints_the_scalar() {
        let sk = SecretKey::from_u64(6).unwrap();
        assert_eq!(format!("{sk:?}"), "SecretKey(..)");
    }

    #[test]
    fn generator_public_key() {
        let sk = SecretKey::from_u64(1).unwrap();
        assert_eq!(
            sk.public_key().to_string(),
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798",
        );
    }

    #[test]
    fn random_keys_differ() {
        let a = SecretKey::new(rand::rngs::OsRng);
        let b = SecretKey::new(rand::rngs::OsRng);
        assert_ne!(a, b);
    }
}
