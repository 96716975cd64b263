use std::any::Any;

use kaspeak_codec::plain::PlainValue;
use kaspeak_primitives::MessageHeader;

use crate::message::{KaspeakMessage, MessageError};

/// Stable codes describing where in the decode pipeline a message died.
pub mod codes {
    /// AEAD rejected the ciphertext (usually a wrong key).
    pub const DECRYPT_REJECTED: u8 = 0;
    /// Decryption succeeded but yielded no bytes.
    pub const DECRYPT_EMPTY: u8 = 1;
    /// Ciphertext too short to carry a nonce and tag.
    pub const MALFORMED_CIPHERTEXT: u8 = 2;
    /// Zstd could not decompress the plaintext.
    pub const DECOMPRESS_FAILED: u8 = 3;
    /// The decompressed bytes were not CBOR.
    pub const CBOR_FAILED: u8 = 4;
    /// The CBOR carried a shape the message type could not hydrate from.
    pub const HYDRATE_FAILED: u8 = 5;
}

/// Produced by the decode pipeline whenever a message's bytes survive the
/// frame but fail somewhere on the way back to a typed value.
///
/// Carries the raw data section untouched so applications can retry with a
/// different key or archive the bytes.
#[derive(Debug, Clone)]
pub struct UnknownMessage {
    pub raw_data: Vec<u8>,
    pub error_desc: String,
    pub code: u8,
    header: Option<MessageHeader>,
}

impl UnknownMessage {
    /// Sentinel type code; unknown messages are never encoded.
    pub const MESSAGE_TYPE: u16 = u16::MAX;

    pub fn new(raw_data: Vec<u8>, error_desc: impl Into<String>, code: u8) -> Self {
        Self {
            raw_data,
            error_desc: error_desc.into(),
            code,
            header: None,
        }
    }
}

impl KaspeakMessage for UnknownMessage {
    fn message_type(&self) -> u16 {
        self.header
            .as_ref()
            .map(|h| h.message_type())
            .unwrap_or(Self::MESSAGE_TYPE)
    }

    fn requires_encryption(&self) -> bool {
        false
    }

    fn header(&self) -> Option<&MessageHeader> {
        self.header.as_ref()
    }

    fn attach_header(&mut self, header: MessageHeader) {
        self.header = Some(header);
    }

    fn to_plain(&self) -> Result<PlainValue, MessageError> {
        Ok(PlainValue::object([
            ("rawData", PlainValue::from(self.raw_data.clone())),
            ("errorDesc", PlainValue::from(self.error_desc.clone())),
            ("code", PlainValue::from(self.code as u64)),
        ]))
    }

    fn hydrate(&mut self, value: PlainValue) -> Result<(), MessageError> {
        self.raw_data = value
            .get("rawData")
            .and_then(PlainValue::as_bytes)
            .ok_or(MessageError::MissingField("rawData"))?
            .to_vec();
        self.error_desc = value
            .get("errorDesc")
            .and_then(PlainValue::as_text)
            .ok_or(MessageError::MissingField("errorDesc"))?
            .to_string();
        self.code = value
            .get("code")
            .and_then(PlainValue::as_u64)
            .ok_or(MessageError::MissingField("code"))? as u8;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
