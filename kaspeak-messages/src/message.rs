use std::any::Any;

use kaspeak_codec::plain::PlainValue;
use kaspeak_primitives::MessageHeader;
use thiserror::Error;

/// Failure while lowering a message to its plain object or hydrating it
/// back.
#[derive(Error, Debug)]
pub enum MessageError {
    #[error("missing field {0}")]
    MissingField(&'static str),

    #[error("unexpected value for field {0}")]
    InvalidField(&'static str),

    #[error("{0}")]
    Other(String),
}

/// Object-safe surface of a typed Kaspeak message.
///
/// Implementations lower themselves to a [`PlainValue`] on the way out and
/// hydrate their fields from one on the way in; everything between those
/// two points (CBOR, compression, encryption) is the pipeline's business.
pub trait KaspeakMessage: Any + Send {
    /// Wire type code, `0..=65535`, unique within a deployment.
    fn message_type(&self) -> u16;

    /// Whether the pipeline must encrypt this message's bytes.
    fn requires_encryption(&self) -> bool;

    /// The header of the transaction this instance arrived in, if any.
    fn header(&self) -> Option<&MessageHeader>;

    /// Attaches the inbound header. Called once by the pipeline before
    /// hydration.
    fn attach_header(&mut self, header: MessageHeader);

    /// Lowers the message fields into a CBOR-encodable plain object.
    fn to_plain(&self) -> Result<PlainValue, MessageError>;

    /// Hydrates the message fields from a decoded plain object.
    fn hydrate(&mut self, value: PlainValue) -> Result<(), MessageError>;

    /// Downcasting hook for workers and tests.
    fn as_any(&self) -> &dyn Any;
}

/// Declare-time constants of a registrable message type.
///
/// The registry instantiates messages through [`Default`], so the constants
/// live on a separate non-object-safe trait rather than on
/// [`KaspeakMessage`] itself.
pub trait RegisteredMessage: KaspeakMessage + Default {
    /// Wire type code of every instance of this type.
    const MESSAGE_TYPE: u16;

    /// Whether instances of this type travel encrypted.
    const REQUIRES_ENCRYPTION: bool;
}
