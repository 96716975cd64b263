//! Wire-level primitives for the Kaspeak protocol
//!
//! Everything that has an exact byte layout or a fixed derivation rule
//! lives here: the on-ledger payload frame, the outpoint-id consensus hash,
//! block metadata, the per-sender [`peer::Peer`] descriptor and the
//! immutable [`header::MessageHeader`] handed to message workers.

pub mod block;
pub mod header;
pub mod outpoint;
pub mod payload;
pub mod peer;
pub mod prefix;

pub use block::BlockMeta;
pub use header::MessageHeader;
pub use outpoint::{outpoint_ids, Outpoint};
pub use payload::Payload;
pub use peer::Peer;
pub use prefix::Prefix;
