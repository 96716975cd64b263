//! The on-ledger payload frame
//!
//! A Kaspeak record rides in the opaque payload field of an ordinary
//! transaction. The frame is a fixed 143-byte header followed by the
//! message bytes:
//!
//! ```text
//! offset  size  field
//!      0     4  marker "KSPK"
//!      4     1  version (1)
//!      5     4  prefix, NUL-padded ascii
//!      9     2  message type, little-endian
//!     11    33  identifier, compressed point
//!     44    33  signer public key, compressed point
//!     77    64  Schnorr signature
//!    141     2  data length, little-endian
//!    143     N  data
//! ```
//!
//! The signature covers the canonical preimage: the lowercase-hex
//! concatenation of every field except the signature itself, followed by
//! the outpoint ids of the carrying transaction. The hex string's UTF-8
//! bytes are what gets hashed, and no length delimiters are inserted.

use kaspeak_crypto::key::{schnorr, KeyError, PublicKey, SecretKey, Signature};
use kaspeak_crypto::identifier::Identifier;
use thiserror::Error;

use crate::prefix::Prefix;

/// Frame marker, `"KSPK"`.
pub const MARKER: [u8; 4] = *b"KSPK";

/// Current protocol version.
pub const VERSION: u8 = 1;

/// Fixed header length in bytes.
pub const HEADER_LEN: usize = 143;

/// Largest data section a frame can carry; the length field is 16 bits and
/// truncation is not an acceptable way to round-trip.
pub const MAX_DATA_LEN: usize = u16::MAX as usize;

const ID_LEN: usize = 33;
const PUBKEY_LEN: usize = 33;
const SIGNATURE_LEN: usize = 64;

#[derive(Error, Debug, PartialEq)]
pub enum PayloadError {
    #[error("payload length {0} is shorter than the {HEADER_LEN}-byte header")]
    TooShort(usize),

    #[error("payload is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("payload does not start with the KSPK marker")]
    BadMarker,

    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),

    #[error("{field} has invalid compressed-point prefix {byte:#04x}")]
    BadPointPrefix { field: &'static str, byte: u8 },

    #[error("data length field says {declared} but {actual} bytes are present")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("data section of {0} bytes exceeds the {MAX_DATA_LEN}-byte limit")]
    DataTooLong(usize),

    #[error("payload is already signed")]
    AlreadySigned,

    #[error("signing failed: {0}")]
    Signing(String),
}

/// A parsed or under-construction payload frame.
///
/// Immutable after construction except for the signature, which [`sign`]
/// sets exactly once.
///
/// [`sign`]: Payload::sign
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payload {
    prefix: Prefix,
    message_type: u16,
    id: [u8; ID_LEN],
    public_key: [u8; PUBKEY_LEN],
    signature: [u8; SIGNATURE_LEN],
    data: Vec<u8>,
}

impl Payload {
    /// Builds an unsigned frame. The identifier and public key arrive as
    /// raw compressed encodings; only their prefix byte is checked here,
    /// full point validation being the concern of whoever produced them.
    pub fn build(
        prefix: Prefix,
        message_type: u16,
        id: [u8; ID_LEN],
        public_key: [u8; PUBKEY_LEN],
        data: Vec<u8>,
    ) -> Result<Self, PayloadError> {
        if id[0] != 0x02 && id[0] != 0x03 {
            return Err(PayloadError::BadPointPrefix {
                field: "identifier",
                byte: id[0],
            });
        }
        if public_key[0] != 0x02 && public_key[0] != 0x03 {
            return Err(PayloadError::BadPointPrefix {
                field: "public key",
                byte: public_key[0],
            });
        }
        if data.len() > MAX_DATA_LEN {
            return Err(PayloadError::DataTooLong(data.len()));
        }

        Ok(Self {
            prefix,
            message_type,
            id,
            public_key,
            signature: [0u8; SIGNATURE_LEN],
            data,
        })
    }

    /// Convenience constructor from typed crypto material.
    pub fn new(
        prefix: Prefix,
        message_type: u16,
        id: &Identifier,
        public_key: &PublicKey,
        data: Vec<u8>,
    ) -> Result<Self, PayloadError> {
        Self::build(prefix, message_type, id.to_bytes(), public_key.to_bytes(), data)
    }

    pub fn prefix(&self) -> &Prefix {
        &self.prefix
    }

    pub fn message_type(&self) -> u16 {
        self.message_type
    }

    pub fn id(&self) -> &[u8; ID_LEN] {
        &self.id
    }

    /// Decodes the identifier field into a validated curve point.
    pub fn identifier(&self) -> Result<Identifier, kaspeak_crypto::identifier::IdentifierError> {
        Identifier::from_bytes(&self.id)
    }

    pub fn public_key(&self) -> &[u8; PUBKEY_LEN] {
        &self.public_key
    }

    pub fn signature(&self) -> &[u8; SIGNATURE_LEN] {
        &self.signature
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Serialises the frame at its fixed offsets.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.data.len());
        out.extend_from_slice(&MARKER);
        out.push(VERSION);
        out.extend_from_slice(self.prefix.as_bytes());
        out.extend_from_slice(&self.message_type.to_le_bytes());
        out.extend_from_slice(&self.id);
        out.extend_from_slice(&self.public_key);
        out.extend_from_slice(&self.signature);
        out.extend_from_slice(&(self.data.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.data);
        out
    }

    /// Lowercase hex of [`to_bytes`].
    ///
    /// [`to_bytes`]: Payload::to_bytes
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Parses a frame, reporting the first violated invariant.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PayloadError> {
        if bytes.len() < HEADER_LEN {
            return Err(PayloadError::TooShort(bytes.len()));
        }
        if bytes[0..4] != MARKER {
            return Err(PayloadError::BadMarker);
        }
        if bytes[4] != VERSION {
            return Err(PayloadError::UnsupportedVersion(bytes[4]));
        }

        let mut prefix = [0u8; Prefix::SIZE];
        prefix.copy_from_slice(&bytes[5..9]);

        let message_type = u16::from_le_bytes([bytes[9], bytes[10]]);

        let mut id = [0u8; ID_LEN];
        id.copy_from_slice(&bytes[11..44]);
        if id[0] != 0x02 && id[0] != 0x03 {
            return Err(PayloadError::BadPointPrefix {
                field: "identifier",
                byte: id[0],
            });
        }

        let mut public_key = [0u8; PUBKEY_LEN];
        public_key.copy_from_slice(&bytes[44..77]);
        if public_key[0] != 0x02 && public_key[0] != 0x03 {
            return Err(PayloadError::BadPointPrefix {
                field: "public key",
                byte: public_key[0],
            });
        }

        let mut signature = [0u8; SIGNATURE_LEN];
        signature.copy_from_slice(&bytes[77..141]);

        let declared = u16::from_le_bytes([bytes[141], bytes[142]]) as usize;
        let data = bytes[HEADER_LEN..].to_vec();
        if data.len() != declared {
            return Err(PayloadError::LengthMismatch {
                declared,
                actual: data.len(),
            });
        }

        Ok(Self {
            prefix: Prefix::from_bytes(prefix),
            message_type,
            id,
            public_key,
            signature,
            data,
        })
    }

    /// Parses a frame from its lowercase-hex transport form.
    pub fn from_hex(payload: &str) -> Result<Self, PayloadError> {
        let bytes = hex::decode(payload)?;
        Self::from_bytes(&bytes)
    }

    /// The canonical preimage: every field except the signature, as one
    /// lowercase hex string, with the outpoint ids appended.
    pub fn preimage(&self, outpoint_ids: &str) -> String {
        let mut out = String::with_capacity(HEADER_LEN * 2 + self.data.len() * 2 + outpoint_ids.len());
        out.push_str(&hex::encode(MARKER));
        out.push_str(&hex::encode([VERSION]));
        out.push_str(&hex::encode(self.prefix.as_bytes()));
        out.push_str(&hex::encode(self.message_type.to_le_bytes()));
        out.push_str(&hex::encode(self.id));
        out.push_str(&hex::encode(self.public_key));
        out.push_str(&hex::encode(&self.data));
        out.push_str(&outpoint_ids.to_lowercase());
        out
    }

    /// Signs the preimage over the given outpoint ids, storing the 64-byte
    /// Schnorr signature. May be called exactly once per frame.
    pub fn sign(&mut self, outpoint_ids: &str, secret: &SecretKey) -> Result<(), PayloadError> {
        if self.signature != [0u8; SIGNATURE_LEN] {
            return Err(PayloadError::AlreadySigned);
        }

        let preimage = self.preimage(outpoint_ids);
        let signature = secret
            .sign(preimage.as_bytes())
            .map_err(|e: KeyError| PayloadError::Signing(e.to_string()))?;
        self.signature.copy_from_slice(signature.as_ref());
        Ok(())
    }

    /// Recomputes the preimage and checks the stored signature against the
    /// embedded public key. Malformed material evaluates to `false`.
    pub fn verify(&self, outpoint_ids: &str) -> bool {
        let preimage = self.preimage(outpoint_ids);
        schnorr::verify(&self.signature, preimage.as_bytes(), &self.public_key[1..])
    }

    /// The stored signature as a typed value, if one has been set.
    pub fn typed_signature(&self) -> Option<Signature> {
        if self.signature == [0u8; SIGNATURE_LEN] {
            None
        } else {
            Signature::try_from(&self.signature[..]).ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_id() -> [u8; 33] {
        let mut id = [0u8; 33];
        id[0] = 0x02;
        id[32] = 0x01;
        id
    }

    fn generator_key() -> [u8; 33] {
        SecretKey::from_u64(1).unwrap().public_key().to_bytes()
    }

    #[test]
    fn frame_layout_is_exact() {
        let payload = Payload::build(
            Prefix::coerce("TEST").unwrap(),
            1,
            sample_id(),
            generator_key(),
            vec![0xde, 0xad, 0xbe, 0xef],
        )
        .unwrap();

        let bytes = payload.to_bytes();
        assert_eq!(bytes.len(), 147);
        assert_eq!(&bytes[0..4], &[0x4b, 0x53, 0x50, 0x4b]);
        assert_eq!(bytes[4], 0x01);
        assert_eq!(&bytes[5..9], b"TEST");
        assert_eq!(&bytes[9..11], &[0x01, 0x00]);
        assert_eq!(&bytes[141..143], &[0x04, 0x00]);
        assert_eq!(&bytes[143..], &[0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn frames_round_trip_field_wise() {
        let payload = Payload::build(
            Prefix::coerce("CHAT").unwrap(),
            513,
            sample_id(),
            generator_key(),
            b"some message bytes".to_vec(),
        )
        .unwrap();

        let parsed = Payload::from_bytes(&payload.to_bytes()).unwrap();
        assert_eq!(parsed, payload);
        assert_eq!(parsed.signature(), &[0u8; 64]);
    }

    #[test]
    fn hex_round_trips() {
        let payload = Payload::build(
            Prefix::coerce("TEST").unwrap(),
            7,
            sample_id(),
            generator_key(),
            vec![],
        )
        .unwrap();

        assert_eq!(Payload::from_hex(&payload.to_hex()).unwrap(), payload);
    }

    #[test]
    fn parse_rejects_each_violation_in_order() {
        let good = Payload::build(
            Prefix::coerce("TEST").unwrap(),
            1,
            sample_id(),
            generator_key(),
            vec![1, 2, 3],
        )
        .unwrap()
        .to_bytes();

        assert_eq!(
            Payload::from_bytes(&good[..100]),
            Err(PayloadError::TooShort(100))
        );

        let mut bad_marker = good.clone();
        bad_marker[0] = b'X';
        assert_eq!(
            Payload::from_bytes(&bad_marker),
            Err(PayloadError::BadMarker)
        );

        let mut bad_version = good.clone();
        bad_version[4] = 2;
        assert_eq!(
            Payload::from_bytes(&bad_version),
            Err(PayloadError::UnsupportedVersion(2))
        );

        let mut bad_id = good.clone();
        bad_id[11] = 0x04;
        assert!(matches!(
            Payload::from_bytes(&bad_id),
            Err(PayloadError::BadPointPrefix { field: "identifier", .. })
        ));

        let mut bad_key = good.clone();
        bad_key[44] = 0x00;
        assert!(matches!(
            Payload::from_bytes(&bad_key),
            Err(PayloadError::BadPointPrefix { field: "public key", .. })
        ));

        let mut truncated = good.clone();
        truncated.pop();
        assert_eq!(
            Payload::from_bytes(&truncated),
            Err(PayloadError::LengthMismatch {
                declared: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn oversized_data_is_rejected() {
        let result = Payload::build(
            Prefix::coerce("TEST").unwrap(),
            1,
            sample_id(),
            generator_key(),
            vec![0u8; MAX_DATA_LEN + 1],
        );
        assert_eq!(result, Err(PayloadError::DataTooLong(MAX_DATA_LEN + 1)));
    }

    #[test]
    fn preimage_is_deterministic_and_delimiter_free() {
        let payload = Payload::build(
            Prefix::coerce("TEST").unwrap(),
            1,
            sample_id(),
            generator_key(),
            vec![0xde, 0xad],
        )
        .unwrap();

        let outpoints = "aa".repeat(64);
        let preimage = payload.preimage(&outpoints);
        assert_eq!(preimage, payload.preimage(&outpoints));

        let expected = format!(
            "4b53504b01{}{}{}{}{}{}",
            "54455354",
            "0100",
            hex::encode(sample_id()),
            hex::encode(generator_key()),
            "dead",
            outpoints,
        );
        assert_eq!(preimage, expected);
    }

    #[test]
    fn preimage_lowercases_outpoint_ids() {
        let payload = Payload::build(
            Prefix::coerce("TEST").unwrap(),
            1,
            sample_id(),
            generator_key(),
            vec![],
        )
        .unwrap();

        assert_eq!(
            payload.preimage("ABCDEF"),
            payload.preimage("abcdef"),
        );
    }

    #[test]
    fn sign_then_verify() {
        let secret = SecretKey::from_u64(6).unwrap();
        let mut payload = Payload::build(
            Prefix::coerce("TEST").unwrap(),
            1,
            sample_id(),
            secret.public_key().to_bytes(),
            vec![],
        )
        .unwrap();

        let outpoints = "aa".repeat(64);
        payload.sign(&outpoints, &secret).unwrap();
        assert!(payload.verify(&outpoints));
        assert!(payload.typed_signature().is_some());

        // a different transaction context must not verify
        assert!(!payload.verify(&"bb".repeat(64)));
    }

    #[test]
    fn verify_fails_for_foreign_public_key() {
        let secret = SecretKey::from_u64(6).unwrap();
        let outpoints = "aa".repeat(64);

        let mut signed = Payload::build(
            Prefix::coerce("TEST").unwrap(),
            1,
            sample_id(),
            secret.public_key().to_bytes(),
            vec![],
        )
        .unwrap();
        signed.sign(&outpoints, &secret).unwrap();

        let mut bytes = signed.to_bytes();
        // flip a byte inside the embedded public key
        bytes[50] ^= 0x01;
        match Payload::from_bytes(&bytes) {
            Ok(tampered) => assert!(!tampered.verify(&outpoints)),
            // flipping may corrupt the point prefix byte instead
            Err(PayloadError::BadPointPrefix { .. }) => {}
            Err(other) => panic!("unexpected parse failure: {other}"),
        }
    }

    #[test]
    fn signing_twice_is_an_error() {
        let secret = SecretKey::from_u64(6).unwrap();
        let mut payload = Payload::build(
            Prefix::coerce("TEST").unwrap(),
            1,
            sample_id(),
            secret.public_key().to_bytes(),
            vec![],
        )
        .unwrap();

        payload.sign("aa", &secret).unwrap();
        assert_eq!(
            payload.sign("aa", &secret),
            Err(PayloadError::AlreadySigned)
        );
    }

    #[test]
    fn signature_survives_serialisation() {
        let secret = SecretKey::from_u64(6).unwrap();
        let outpoints = "cc".repeat(32);

        let mut payload = Payload::build(
            Prefix::coerce("TEST").unwrap(),
            42,
            sample_id(),
            secret.public_key().to_bytes(),
            b"signed content".to_vec(),
        )
        .unwrap();
        payload.sign(&outpoints, &secret).unwrap();

        let reparsed = Payload::from_bytes(&payload.to_bytes()).unwrap();
        assert!(reparsed.verify(&outpoints));
    }
}
