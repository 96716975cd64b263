use std::any::Any;

use kaspeak_codec::plain::PlainValue;
use kaspeak_crypto::hash::Hash;
use kaspeak_crypto::identifier::Identifier;
use kaspeak_crypto::key::{SecretKey, Signature};
use kaspeak_messages::pipeline::{self, NONCE_LEN};
use kaspeak_messages::{
    KaspeakMessage, MessageError, MessageRegistry, RegisteredMessage, UnknownMessage,
};
use kaspeak_primitives::{BlockMeta, MessageHeader, Peer, Prefix};

#[derive(Default)]
struct SecretNote {
    text: String,
    header: Option<MessageHeader>,
}

impl KaspeakMessage for SecretNote {
    fn message_type(&self) -> u16 {
        Self::MESSAGE_TYPE
    }

    fn requires_encryption(&self) -> bool {
        Self::REQUIRES_ENCRYPTION
    }

    fn header(&self) -> Option<&MessageHeader> {
        self.header.as_ref()
    }

    fn attach_header(&mut self, header: MessageHeader) {
        self.header = Some(header);
    }

    fn to_plain(&self) -> Result<PlainValue, MessageError> {
        Ok(PlainValue::object([("t", self.text.clone())]))
    }

    fn hydrate(&mut self, value: PlainValue) -> Result<(), MessageError> {
        self.text = value
            .get("t")
            .and_then(PlainValue::as_text)
            .ok_or(MessageError::MissingField("t"))?
            .to_string();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl RegisteredMessage for SecretNote {
    const MESSAGE_TYPE: u16 = 101;
    const REQUIRES_ENCRYPTION: bool = true;
}

#[derive(Default)]
struct Announcement {
    text: String,
    header: Option<MessageHeader>,
}

impl KaspeakMessage for Announcement {
    fn message_type(&self) -> u16 {
        Self::MESSAGE_TYPE
    }

    fn requires_encryption(&self) -> bool {
        Self::REQUIRES_ENCRYPTION
    }

    fn header(&self) -> Option<&MessageHeader> {
        self.header.as_ref()
    }

    fn attach_header(&mut self, header: MessageHeader) {
        self.header = Some(header);
    }

    fn to_plain(&self) -> Result<PlainValue, MessageError> {
        Ok(PlainValue::object([("t", self.text.clone())]))
    }

    fn hydrate(&mut self, value: PlainValue) -> Result<(), MessageError> {
        self.text = value
            .get("t")
            .and_then(PlainValue::as_text)
            .ok_or(MessageError::MissingField("t"))?
            .to_string();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl RegisteredMessage for Announcement {
    const MESSAGE_TYPE: u16 = 102;
    const REQUIRES_ENCRYPTION: bool = false;
}

fn registry() -> MessageRegistry {
    let mut registry = MessageRegistry::new();
    registry.register::<SecretNote>(None);
    registry.register::<Announcement>(None);
    registry
}

fn header(message_type: u16) -> MessageHeader {
    let local = SecretKey::from_u64(6).unwrap();
    let sender = local.public_key();
    let identifier = Identifier::from_bytes(&sender.to_bytes()).unwrap();
    let peer = Peer::new(
        "kaspatest:sender".into(),
        sender,
        Signature::from([0u8; 64]),
        false,
        local,
    );

    MessageHeader::new(
        Hash::new([0x11; 32]),
        peer,
        Prefix::coerce("TEST").unwrap(),
        message_type,
        identifier,
        BlockMeta::new(Hash::new([0x22; 32]), 1_700_000_000, 42),
        "aa".repeat(64),
    )
}

fn shared_key() -> [u8; 32] {
    let secret = SecretKey::from_u64(6).unwrap();
    let public = secret.public_key();
    secret.shared_secret(&public).unwrap()
}

#[test]
fn encrypted_round_trip() {
    let mut note = SecretNote::default();
    note.text = "I love Kaspa!".into();

    let key = shared_key();
    let data = pipeline::encode(&note, Some(&key)).unwrap();
    assert!(data.len() >= NONCE_LEN);

    let decoded = pipeline::decode(&registry(), &header(101), &data, Some(&key)).unwrap();
    let decoded = decoded
        .as_any()
        .downcast_ref::<SecretNote>()
        .expect("should hydrate as a secret note");
    assert_eq!(decoded.text, "I love Kaspa!");
}

#[test]
fn wrong_key_yields_unknown_with_decrypt_code() {
    let mut note = SecretNote::default();
    note.text = "I love Kaspa!".into();

    let key = shared_key();
    let mut other_key = key;
    other_key[0] ^= 0xff;

    let data = pipeline::encode(&note, Some(&key)).unwrap();
    let decoded = pipeline::decode(&registry(), &header(101), &data, Some(&other_key)).unwrap();

    let unknown = decoded
        .as_any()
        .downcast_ref::<UnknownMessage>()
        .expect("should fall back to unknown");
    assert!(unknown.code <= 1, "decrypt stage code, got {}", unknown.code);
    assert_eq!(unknown.raw_data, data);
}

#[test]
fn plaintext_round_trip() {
    let mut msg = Announcement::default();
    msg.text = "hello dag".into();

    let data = pipeline::encode(&msg, None).unwrap();
    let decoded = pipeline::decode(&registry(), &header(102), &data, None).unwrap();

    let decoded = decoded
        .as_any()
        .downcast_ref::<Announcement>()
        .expect("should hydrate as an announcement");
    assert_eq!(decoded.text, "hello dag");
}

#[test]
fn surplus_key_is_ignored_for_plaintext_types() {
    let mut msg = Announcement::default();
    msg.text = "public".into();

    let key = shared_key();
    let with_key = pipeline::encode(&msg, Some(&key)).unwrap();
    let decoded = pipeline::decode(&registry(), &header(102), &with_key, None).unwrap();
    assert_eq!(
        decoded
            .as_any()
            .downcast_ref::<Announcement>()
            .unwrap()
            .text,
        "public"
    );
}

#[test]
fn missing_key_fails_loudly_on_encode() {
    let note = SecretNote::default();
    assert!(matches!(
        pipeline::encode(&note, None),
        Err(pipeline::PipelineError::EncryptionKeyMissing)
    ));
}

#[test]
fn missing_key_fails_loudly_on_decode() {
    let mut note = SecretNote::default();
    note.text = "secret".into();
    let key = shared_key();
    let data = pipeline::encode(&note, Some(&key)).unwrap();

    assert!(matches!(
        pipeline::decode(&registry(), &header(101), &data, None),
        Err(pipeline::PipelineError::EncryptionKeyMissing)
    ));
}

#[test]
fn unknown_type_fails_loudly() {
    let result = pipeline::decode(&registry(), &header(404), b"whatever", None);
    assert!(matches!(
        result,
        Err(pipeline::PipelineError::UnknownType(_))
    ));
}

#[test]
fn truncated_ciphertext_reports_malformed() {
    let key = shared_key();
    let decoded = pipeline::decode(&registry(), &header(101), &[0u8; 10], Some(&key)).unwrap();
    let unknown = decoded.as_any().downcast_ref::<UnknownMessage>().unwrap();
    assert_eq!(unknown.code, 2);
}

#[test]
fn garbage_bytes_report_decompression_failure() {
    let decoded = pipeline::decode(&registry(), &header(102), &[0xde, 0xad, 0xbe], None).unwrap();
    let unknown = decoded.as_any().downcast_ref::<UnknownMessage>().unwrap();
    assert_eq!(unknown.code, 3);
}

#[test]
fn compressed_non_cbor_reports_cbor_failure() {
    let not_cbor = zstd::encode_all([0xffu8, 0x00].as_slice(), 16).unwrap();
    let decoded = pipeline::decode(&registry(), &header(102), &not_cbor, None).unwrap();
    let unknown = decoded.as_any().downcast_ref::<UnknownMessage>().unwrap();
    assert_eq!(unknown.code, 4);
}

#[test]
fn wrong_shape_reports_hydration_failure() {
    // a valid CBOR map that lacks the "t" field announcements need
    let plain = PlainValue::object([("other", PlainValue::from(1u64))]);
    let cbor = kaspeak_codec::minicbor::to_vec(&plain).unwrap();
    let compressed = zstd::encode_all(cbor.as_slice(), 16).unwrap();

    let decoded = pipeline::decode(&registry(), &header(102), &compressed, None).unwrap();
    let unknown = decoded.as_any().downcast_ref::<UnknownMessage>().unwrap();
    assert_eq!(unknown.code, 5);
}

#[test]
fn decoded_messages_carry_their_header() {
    let mut msg = Announcement::default();
    msg.text = "with header".into();

    let data = pipeline::encode(&msg, None).unwrap();
    let decoded = pipeline::decode(&registry(), &header(102), &data, None).unwrap();

    let header = decoded.header().expect("header should be attached");
    assert_eq!(header.message_type(), 102);
    assert_eq!(header.prefix().to_string(), "TEST");
}
