//! Kaspeak session engine
//!
//! Sits between an application's typed messages and the ledger RPC
//! collaborator: the [`session::Session`] façade owns the message registry,
//! the event bus and the dedup set, and wires confirmed blocks from the
//! ledger subscription through the [`ingest`] engine into
//! `message-received` events and per-type workers.

pub mod dedup;
pub mod events;
pub mod ingest;
pub mod ledger;
pub mod logging;
pub mod session;
pub mod units;

pub use dedup::DedupSet;
pub use events::{EventBus, EventKind, ListenerId, ListenerResult, SessionEvent};
pub use ingest::IngestError;
pub use ledger::{
    BlockAdded, LedgerError, LedgerRpc, RpcBlock, RpcBlockHeader, RpcTransaction,
    RpcTransactionInput, RpcVerboseData, SubmitResult, UtxoEntry,
};
pub use session::{ConversationKeys, Session, SessionError};
