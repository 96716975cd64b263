use kaspeak_crypto::hash::Hash;
use kaspeak_crypto::identifier::Identifier;

use crate::block::BlockMeta;
use crate::peer::Peer;
use crate::prefix::Prefix;

/// Everything a worker learns about an inbound message besides its data.
///
/// Built once by the ingestion engine and never mutated afterwards.
#[derive(Clone, Debug)]
pub struct MessageHeader {
    txid: Hash<32>,
    peer: Peer,
    prefix: Prefix,
    message_type: u16,
    identifier: Identifier,
    block_meta: BlockMeta,
    consensus_hash: String,
}

impl MessageHeader {
    pub fn new(
        txid: Hash<32>,
        peer: Peer,
        prefix: Prefix,
        message_type: u16,
        identifier: Identifier,
        block_meta: BlockMeta,
        consensus_hash: String,
    ) -> Self {
        Self {
            txid,
            peer,
            prefix,
            message_type,
            identifier,
            block_meta,
            consensus_hash,
        }
    }

    pub fn txid(&self) -> &Hash<32> {
        &self.txid
    }

    pub fn peer(&self) -> &Peer {
        &self.peer
    }

    pub fn prefix(&self) -> &Prefix {
        &self.prefix
    }

    pub fn message_type(&self) -> u16 {
        self.message_type
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn block_meta(&self) -> &BlockMeta {
        &self.block_meta
    }

    /// The outpoint ids of the carrying transaction, as used in the
    /// signature preimage.
    pub fn consensus_hash(&self) -> &str {
        &self.consensus_hash
    }
}
