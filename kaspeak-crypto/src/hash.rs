//! Cryptographic hashing for Kaspeak
//!
//! Two helper objects live here:
//!
//! * [`Hasher`] to stream bytes into a digest without collecting them first
//! * [`struct@Hash`] a conveniently strongly typed byte array
//!
//! The algorithm is `SHA-256` throughout: payload preimages, ECDH secret
//! derivation and chain-key derivation all hash with it.
//!
//! ```
//! use kaspeak_crypto::hash::Hasher;
//!
//! let digest = Hasher::<256>::hash(b"hello world");
//! assert_eq!(
//!     digest.to_string(),
//!     "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9",
//! );
//! ```

use std::{fmt, ops::Deref, str::FromStr};

use cryptoxide::sha2::Sha256;
use kaspeak_codec::minicbor;
use serde::de::{Error as DeError, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Data that is a cryptographic [`struct@Hash`] of `BYTES` long.
///
/// Kaspeak only produces 32-byte digests (transaction ids, block hashes,
/// shared secrets), but the width stays a type parameter so mixing them up
/// is a compile error.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash<const BYTES: usize>([u8; BYTES]);

impl<const BYTES: usize> Hash<BYTES> {
    #[inline]
    pub const fn new(bytes: [u8; BYTES]) -> Self {
        Self(bytes)
    }
}

impl<const BYTES: usize> From<[u8; BYTES]> for Hash<BYTES> {
    #[inline]
    fn from(bytes: [u8; BYTES]) -> Self {
        Self::new(bytes)
    }
}

impl<const BYTES: usize> AsRef<[u8]> for Hash<BYTES> {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl<const BYTES: usize> Deref for Hash<BYTES> {
    type Target = [u8; BYTES];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const BYTES: usize> PartialEq<[u8]> for Hash<BYTES> {
    fn eq(&self, other: &[u8]) -> bool {
        self.0.eq(other)
    }
}

impl<const BYTES: usize> fmt::Debug for Hash<BYTES> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(&format!("Hash<{size}>", size = BYTES))
            .field(&hex::encode(self))
            .finish()
    }
}

impl<const BYTES: usize> fmt::Display for Hash<BYTES> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self))
    }
}

impl<const BYTES: usize> FromStr for Hash<BYTES> {
    type Err = hex::FromHexError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0; BYTES];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self::new(bytes))
    }
}

impl<C, const BYTES: usize> minicbor::Encode<C> for Hash<BYTES> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.bytes(&self.0)?;
        Ok(())
    }
}

impl<'a, C, const BYTES: usize> minicbor::Decode<'a, C> for Hash<BYTES> {
    fn decode(
        d: &mut minicbor::Decoder<'a>,
        _ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let bytes = d.bytes()?;
        if bytes.len() == BYTES {
            let mut hash = [0; BYTES];
            hash.copy_from_slice(bytes);
            Ok(Self::new(hash))
        } else {
            Err(minicbor::decode::Error::message("invalid hash size"))
        }
    }
}

impl<const BYTES: usize> Serialize for Hash<BYTES> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

struct HashVisitor<const BYTES: usize> {}

impl<'de, const BYTES: usize> Visitor<'de> for HashVisitor<BYTES> {
    type Value = Hash<BYTES>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a hex string representing {BYTES} bytes")
    }

    fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
    where
        E: DeError,
    {
        match Hash::<BYTES>::from_str(s) {
            Ok(x) => Ok(x),
            Err(_) => Err(DeError::invalid_value(Unexpected::Str(s), &self)),
        }
    }
}

impl<'de, const BYTES: usize> Deserialize<'de> for Hash<BYTES> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(HashVisitor::<BYTES> {})
    }
}

/// Streaming SHA-256 hasher producing a [`struct@Hash`] of `BITS / 8` bytes.
pub struct Hasher<const BITS: usize>(Sha256);

impl Hasher<256> {
    #[inline]
    pub fn new() -> Self {
        Self(Sha256::new())
    }

    /// update the [`Hasher`] with the given inputs
    #[inline]
    pub fn input(&mut self, bytes: &[u8]) {
        use cryptoxide::digest::Digest as _;
        self.0.input(bytes);
    }

    /// convenient function to directly generate the digest of the given
    /// bytes without streaming through the intermediary [`Hasher`]
    #[inline]
    pub fn hash(bytes: &[u8]) -> Hash<32> {
        let mut hasher = Self::new();
        hasher.input(bytes);
        hasher.finalize()
    }

    /// `SHA256(SHA256(bytes))`, the derivation Kaspeak applies to ECDH
    /// outputs before using them as shared secrets
    #[inline]
    pub fn hash_twice(bytes: &[u8]) -> Hash<32> {
        Self::hash(Self::hash(bytes).as_ref())
    }

    /// consume the [`Hasher`] and return the computed digest
    pub fn finalize(mut self) -> Hash<32> {
        use cryptoxide::digest::Digest as _;
        let mut hash = [0; 32];
        self.0.result(&mut hash);
        Hash::new(hash)
    }
}

impl Default for Hasher<256> {
    fn default() -> Self {
        Self::new()
    }
}
