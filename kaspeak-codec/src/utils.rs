use std::{fmt, ops::Deref};

/// A byte vector that renders as lowercase hex and round-trips through
/// hex strings.
///
/// On-ledger payloads travel as hex strings through the RPC boundary, so
/// most byte blobs in Kaspeak need a cheap hex view in both directions.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bytes(Vec<u8>);

impl Bytes {
    pub fn to_vec(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(xs: Vec<u8>) -> Self {
        Bytes(xs)
    }
}

impl From<&[u8]> for Bytes {
    fn from(xs: &[u8]) -> Self {
        Bytes(xs.to_vec())
    }
}

impl From<Bytes> for Vec<u8> {
    fn from(b: Bytes) -> Self {
        b.0
    }
}

impl Deref for Bytes {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&str> for Bytes {
    type Error = hex::FromHexError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let v = hex::decode(value)?;
        Ok(Bytes(v))
    }
}

impl From<Bytes> for String {
    fn from(b: Bytes) -> Self {
        hex::encode(b.deref())
    }
}

impl fmt::Display for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

/// Decodes a hex string, rejecting odd-length and non-hex input.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(s)
}

/// Lowercase hex of the given bytes.
pub fn encode_hex(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_round_trip_through_hex() {
        let b = Bytes::try_from("deadbeef").unwrap();
        assert_eq!(b.as_ref(), &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(b.to_string(), "deadbeef");
    }

    #[test]
    fn odd_length_hex_is_rejected() {
        assert!(Bytes::try_from("abc").is_err());
        assert!(decode_hex("f").is_err());
    }
}
