//! Rust-native building blocks for the Kaspeak messaging protocol
//!
//! Kaspeak carries typed, authenticated, optionally encrypted messages
//! inside the opaque payload field of transactions on a Kaspa-like
//! blockDAG. This crate doesn't provide any particular application; it
//! re-exports the protocol engine so higher-level use-cases (bots, chat
//! clients, indexers) can build on one dependency.

#[doc(inline)]
pub use kaspeak_codec as codec;

#[doc(inline)]
pub use kaspeak_crypto as crypto;

#[doc(inline)]
pub use kaspeak_engine as engine;

#[doc(inline)]
pub use kaspeak_messages as messages;

#[doc(inline)]
pub use kaspeak_primitives as primitives;

pub mod prelude {
    //! The handful of types most applications touch

    pub use kaspeak_crypto::identifier::{ChainKey, Identifier, SecretIdentifier};
    pub use kaspeak_crypto::key::{PublicKey, SecretKey, Signature};
    pub use kaspeak_engine::{
        EventKind, LedgerRpc, Session, SessionError, SessionEvent,
    };
    pub use kaspeak_messages::{
        KaspeakMessage, MessageRegistry, MessageWorker, RegisteredMessage, UnknownMessage,
    };
    pub use kaspeak_primitives::{MessageHeader, Payload, Peer, Prefix};
}
