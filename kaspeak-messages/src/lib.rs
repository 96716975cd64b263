//! Typed messages for the Kaspeak protocol
//!
//! Applications declare message types by implementing [`RegisteredMessage`]
//! and handing the type to a [`MessageRegistry`]. The [`pipeline`] turns a
//! typed value into ciphertext bytes and back: plain object → CBOR → Zstd →
//! optional XChaCha20-Poly1305.

pub mod message;
pub mod pipeline;
pub mod registry;
pub mod unknown;

pub use message::{KaspeakMessage, MessageError, RegisteredMessage};
pub use registry::{MessageRegistry, MessageWorker, RegistryError};
pub use unknown::UnknownMessage;
