//! Ledger RPC collaborator
//!
//! The engine does not speak to a node itself; it consumes an
//! implementation of [`LedgerRpc`] and the model types below. Everything
//! here mirrors what a Kaspa-like RPC surface provides: a block-added
//! subscription, UTXO queries, transaction submission and the network's
//! address-from-pubkey rule.

use async_trait::async_trait;
use kaspeak_crypto::hash::Hash;
use kaspeak_crypto::key::{PublicKey, SecretKey};
use kaspeak_primitives::{outpoint_ids, BlockMeta, Outpoint};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("not connected to the ledger")]
    NotConnected,

    #[error("rpc call failed: {0}")]
    Rpc(String),

    #[error("cannot build transaction: {0}")]
    TransactionBuild(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransactionInput {
    pub previous_outpoint: Outpoint,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcVerboseData {
    pub transaction_id: Hash<32>,
}

/// A transaction as the block subscription delivers it: inputs, the opaque
/// payload as a hex string, and per-node verbose data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    pub inputs: Vec<RpcTransactionInput>,
    pub payload: String,
    pub verbose_data: Option<RpcVerboseData>,
}

impl RpcTransaction {
    /// The consensus hash of this transaction, per the outpoint ordering
    /// rule.
    pub fn outpoint_ids(&self) -> String {
        outpoint_ids(self.inputs.iter().map(|input| &input.previous_outpoint))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlockHeader {
    pub hash: Hash<32>,
    pub timestamp: u64,
    pub daa_score: u64,
}

impl From<&RpcBlockHeader> for BlockMeta {
    fn from(header: &RpcBlockHeader) -> Self {
        BlockMeta::new(header.hash, header.timestamp, header.daa_score)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlock {
    pub header: RpcBlockHeader,
    pub transactions: Vec<RpcTransaction>,
}

/// Notification delivered for every confirmed block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockAdded {
    pub block: RpcBlock,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoEntry {
    pub amount: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResult {
    pub transaction_id: Hash<32>,
}

/// The ledger capabilities the engine consumes.
///
/// `address_from_pubkey` is a pure derivation rule rather than an RPC round
/// trip; implementations must not suspend there, since the ingestion engine
/// calls it while processing a block.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    async fn connect(&self, network_id: &str, url: Option<&str>) -> Result<(), LedgerError>;

    async fn disconnect(&self) -> Result<(), LedgerError>;

    /// Streams one [`BlockAdded`] per confirmed block, in arrival order.
    async fn subscribe_block_added(&self) -> Result<mpsc::Receiver<BlockAdded>, LedgerError>;

    async fn get_utxos_by_addresses(
        &self,
        addresses: &[String],
    ) -> Result<Vec<UtxoEntry>, LedgerError>;

    /// Builds an unsigned self-transfer able to carry a payload of
    /// `payload_len` bytes at the given priority fee.
    async fn create_self_transfer(
        &self,
        address: &str,
        payload_len: usize,
        priority_fee_sompi: u64,
    ) -> Result<RpcTransaction, LedgerError>;

    async fn sign_transaction(
        &self,
        tx: RpcTransaction,
        secret: &SecretKey,
    ) -> Result<RpcTransaction, LedgerError>;

    async fn submit_transaction(&self, tx: RpcTransaction) -> Result<SubmitResult, LedgerError>;

    /// The network's address derivation for a compressed public key.
    fn address_from_pubkey(
        &self,
        public_key: &PublicKey,
        network_id: &str,
    ) -> Result<String, LedgerError>;
}
