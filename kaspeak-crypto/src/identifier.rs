//! Identifier algebra
//!
//! An [`Identifier`] is a curve point used as an opaque message label. A
//! conversation walks the chain `ID_i = PK · k^i mod n` for `i ≥ 1`, where
//! `k` is the conversation's [`ChainKey`]: with `k` in hand, neighbouring
//! labels are one cheap multiplication apart in either direction; without
//! it, the labels are indistinguishable from unrelated points.

use std::{fmt, ops::Deref, str::FromStr};

use num_bigint::BigUint;
use rand_core::{CryptoRng, RngCore};
use thiserror::Error;

use crate::curve::{mod_inv, pow_mod, CurveError, Point, GROUP_ORDER};
use crate::hash::Hasher;
use crate::key::{schnorr, KeyError, PublicKey, SecretKey, Signature};

#[derive(Error, Debug)]
pub enum IdentifierError {
    #[error("chain index must be at least 1")]
    IndexOutOfRange,

    #[error("chain key collapses the identifier chain")]
    DegenerateChainKey,

    #[error("invalid identifier point: {0}")]
    Curve(#[from] CurveError),

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Conversation scalar driving an identifier chain.
///
/// Derived from a shared secret as `int(SHA256(secret))`; two peers who ran
/// ECDH against each other hold the same chain key.
#[derive(Clone, PartialEq, Eq)]
pub struct ChainKey(BigUint);

impl ChainKey {
    pub fn new(scalar: BigUint) -> Self {
        Self(scalar)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(BigUint::from_bytes_be(&bytes))
    }

    /// `int(SHA256(shared_secret))`.
    pub fn from_shared_secret(shared_secret: &[u8; 32]) -> Self {
        Self(BigUint::from_bytes_be(
            Hasher::<256>::hash(shared_secret).as_ref(),
        ))
    }

    pub(crate) fn uint(&self) -> &BigUint {
        &self.0
    }
}

impl fmt::Debug for ChainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ChainKey(..)")
    }
}

/// A compressed secp256k1 point acting as a chain-movable message label.
///
/// Identity is the 33-byte compressed encoding: two identifiers are equal,
/// ordered and hashed by those bytes.
#[derive(Clone)]
pub struct Identifier {
    point: Point,
    bytes: [u8; Self::SIZE],
}

impl Identifier {
    pub const SIZE: usize = 33;

    /// Decodes and validates a compressed point encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IdentifierError> {
        let point = Point::from_bytes(bytes)?;
        Self::from_point(point)
    }

    pub(crate) fn from_point(point: Point) -> Result<Self, IdentifierError> {
        let bytes = point.to_compressed()?;
        Ok(Self { point, bytes })
    }

    /// `PK · (k^index mod n)` for `index ≥ 1`; the zeroth element of a chain
    /// is never materialised.
    pub fn from_chain_key(
        chain_key: &ChainKey,
        index: u64,
        reference: &PublicKey,
    ) -> Result<Self, IdentifierError> {
        if index < 1 {
            return Err(IdentifierError::IndexOutOfRange);
        }

        let factor = pow_mod(chain_key.uint(), &BigUint::from(index), &GROUP_ORDER);
        let point = reference.point().mul(&factor);
        Self::from_point(point).map_err(|_| IdentifierError::DegenerateChainKey)
    }

    /// The next identifier on the chain.
    pub fn next(&self, chain_key: &ChainKey) -> Result<Self, IdentifierError> {
        self.next_by(chain_key, 1)
    }

    /// `count` steps forward on the chain.
    pub fn next_by(&self, chain_key: &ChainKey, count: u64) -> Result<Self, IdentifierError> {
        self.stepped(chain_key.uint().clone(), count)
    }

    /// The previous identifier on the chain.
    pub fn prev(&self, chain_key: &ChainKey) -> Result<Self, IdentifierError> {
        self.prev_by(chain_key, 1)
    }

    /// `count` steps backward on the chain.
    pub fn prev_by(&self, chain_key: &ChainKey, count: u64) -> Result<Self, IdentifierError> {
        let reduced = chain_key.uint() % &*GROUP_ORDER;
        let inverse =
            mod_inv(&reduced, &GROUP_ORDER).map_err(|_| IdentifierError::DegenerateChainKey)?;
        self.stepped(inverse, count)
    }

    fn stepped(&self, scalar: BigUint, count: u64) -> Result<Self, IdentifierError> {
        let factor = pow_mod(&scalar, &BigUint::from(count), &GROUP_ORDER);
        let point = self.point.mul(&factor);
        Self::from_point(point).map_err(|_| IdentifierError::DegenerateChainKey)
    }

    pub fn as_bytes(&self) -> &[u8; Self::SIZE] {
        &self.bytes
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        self.bytes
    }

    /// Schnorr verification with this identifier as the x-only key.
    pub fn verify(&self, sig: &[u8], msg: &[u8]) -> bool {
        schnorr::verify(sig, msg, &self.bytes[1..])
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for Identifier {}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.bytes.cmp(&other.bytes)
    }
}

impl std::hash::Hash for Identifier {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Identifier")
            .field(&hex::encode(self.bytes))
            .finish()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.bytes))
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| CurveError::InvalidLength(s.len() / 2))?;
        Self::from_bytes(&bytes)
    }
}

/// An [`Identifier`] built from a known secret scalar, the only form that
/// can sign.
///
/// There are deliberately no public-material constructors here: a
/// `SecretIdentifier` always owns the scalar behind its point.
pub struct SecretIdentifier {
    secret: SecretKey,
    id: Identifier,
}

impl SecretIdentifier {
    /// Builds the identifier `G·s` for a validated secret scalar.
    pub fn from_secret(secret: SecretKey) -> Self {
        let point = crate::curve::GENERATOR.mul(secret.scalar());
        let id = Identifier::from_point(point).expect("non-zero scalar cannot produce infinity");
        Self { secret, id }
    }

    /// Draws a fresh secret scalar from the given CSPRNG.
    pub fn random<Rng>(rng: Rng) -> Self
    where
        Rng: RngCore + CryptoRng,
    {
        Self::from_secret(SecretKey::new(rng))
    }

    /// Schnorr-signs with the stored scalar.
    pub fn sign(&self, msg: &[u8]) -> Result<Signature, KeyError> {
        schnorr::sign(msg, &self.secret)
    }

    pub fn identifier(&self) -> &Identifier {
        &self.id
    }
}

impl Deref for SecretIdentifier {
    type Target = Identifier;

    fn deref(&self) -> &Self::Target {
        &self.id
    }
}

impl fmt::Debug for SecretIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretIdentifier").field(&self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_chain_key() -> ChainKey {
        let a = SecretKey::from_u64(6).unwrap();
        let b = SecretKey::from_u64(1337).unwrap().public_key();
        let shared = a.shared_secret(&b).unwrap();
        ChainKey::from_shared_secret(&shared)
    }

    #[test]
    fn chain_index_zero_is_rejected() {
        let pk = SecretKey::from_u64(6).unwrap().public_key();
        assert!(matches!(
            Identifier::from_chain_key(&test_chain_key(), 0, &pk),
            Err(IdentifierError::IndexOutOfRange)
        ));
    }

    #[test]
    fn next_advances_the_chain() {
        let k = test_chain_key();
        let pk = SecretKey::from_u64(6).unwrap().public_key();

        let id1 = Identifier::from_chain_key(&k, 1, &pk).unwrap();
        let id2 = Identifier::from_chain_key(&k, 2, &pk).unwrap();
        assert_eq!(id1.next(&k).unwrap(), id2);
    }

    #[test]
    fn prev_undoes_next() {
        let k = test_chain_key();
        let pk = SecretKey::from_u64(6).unwrap().public_key();

        let id1 = Identifier::from_chain_key(&k, 1, &pk).unwrap();
        let id2 = id1.next(&k).unwrap();
        assert_eq!(id2.prev(&k).unwrap().to_string(), id1.to_string());
    }

    #[test]
    fn multi_step_matches_direct_index() {
        let k = test_chain_key();
        let pk = SecretKey::from_u64(6).unwrap().public_key();

        let id1 = Identifier::from_chain_key(&k, 1, &pk).unwrap();
        let id5 = Identifier::from_chain_key(&k, 5, &pk).unwrap();
        assert_eq!(id1.next_by(&k, 4).unwrap(), id5);
        assert_eq!(id5.prev_by(&k, 4).unwrap(), id1);
    }

    #[test]
    fn distinct_chain_positions_differ() {
        let k = test_chain_key();
        let pk = SecretKey::from_u64(6).unwrap().public_key();

        let id1 = Identifier::from_chain_key(&k, 1, &pk).unwrap();
        let id2 = Identifier::from_chain_key(&k, 2, &pk).unwrap();
        assert_ne!(id1, id2);
    }

    #[test]
    fn encoding_round_trips() {
        let k = test_chain_key();
        let pk = SecretKey::from_u64(6).unwrap().public_key();
        let id = Identifier::from_chain_key(&k, 3, &pk).unwrap();

        let back: Identifier = id.to_string().parse().unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn secret_identifier_signs_and_verifies() {
        let secret = SecretKey::from_u64(99).unwrap();
        let sid = SecretIdentifier::from_secret(secret);

        let sig = sid.sign(b"label proof").unwrap();
        assert!(sid.verify(sig.as_ref(), b"label proof"));
        assert!(!sid.verify(sig.as_ref(), b"other message"));
    }

    #[test]
    fn random_identifiers_differ() {
        let a = SecretIdentifier::random(rand::rngs::OsRng);
        let b = SecretIdentifier::random(rand::rngs::OsRng);
        assert_ne!(a.identifier(), b.identifier());
    }
}
