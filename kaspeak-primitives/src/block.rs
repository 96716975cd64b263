use kaspeak_crypto::hash::Hash;
use serde::{Deserialize, Serialize};

/// Metadata of the confirmed block a message arrived in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockMeta {
    pub hash: Hash<32>,
    pub timestamp: u64,
    pub daa_score: u64,
}

impl BlockMeta {
    pub fn new(hash: Hash<32>, timestamp: u64, daa_score: u64) -> Self {
        Self {
            hash,
            timestamp,
            daa_score,
        }
    }
}
