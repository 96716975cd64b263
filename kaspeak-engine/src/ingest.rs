//! Block ingestion engine
//!
//! Consumes confirmed blocks from the ledger subscription and turns every
//! well-formed Kaspeak payload into a `message-received` event plus an
//! optional worker dispatch. One bad transaction never aborts a block:
//! per-transaction failures are logged and processing moves on.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use kaspeak_crypto::curve::CurveError;
use kaspeak_crypto::identifier::IdentifierError;
use kaspeak_crypto::key::{PublicKey, Signature};
use kaspeak_primitives::payload::{PayloadError, HEADER_LEN};
use kaspeak_primitives::{BlockMeta, MessageHeader, Payload, Peer};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::events::SessionEvent;
use crate::ledger::{BlockAdded, LedgerError, LedgerRpc, RpcTransaction};
use crate::session::Shared;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("kaspeak transaction with {inputs} inputs and a {payload_len}-byte payload carries no verbose data")]
    MissingVerboseData { inputs: usize, payload_len: usize },

    #[error("payload is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("frame rejected: {0}")]
    Frame(#[from] PayloadError),

    #[error("payload prefix is not ascii")]
    NonAsciiPrefix,

    #[error("identifier rejected: {0}")]
    Identifier(#[from] IdentifierError),

    #[error("signer public key rejected: {0}")]
    SignerKey(#[from] CurveError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub(crate) struct Ingest {
    shared: Arc<Shared>,
    ledger: Arc<dyn LedgerRpc>,
    network_id: String,
}

impl Ingest {
    pub(crate) fn new(shared: Arc<Shared>, ledger: Arc<dyn LedgerRpc>, network_id: String) -> Self {
        Self {
            shared,
            ledger,
            network_id,
        }
    }

    /// Processes one confirmed block, transaction by transaction, in block
    /// order.
    pub(crate) fn handle_block(&self, added: BlockAdded) {
        let meta = BlockMeta::from(&added.block.header);
        trace!(block = %meta.hash, txs = added.block.transactions.len(), "processing block");

        for tx in &added.block.transactions {
            if let Err(e) = self.process_transaction(&meta, tx) {
                warn!(block = %meta.hash, "skipping transaction: {e}");
            }
        }
    }

    fn process_transaction(&self, meta: &BlockMeta, tx: &RpcTransaction) -> Result<(), IngestError> {
        let payload_hex = &tx.payload;

        if payload_hex.len() % 2 != 0 {
            return Ok(());
        }
        if payload_hex.len() < HEADER_LEN * 2 {
            return Ok(());
        }
        if !payload_hex.as_bytes()[..8].eq_ignore_ascii_case(b"4b53504b") {
            return Ok(());
        }

        let verbose = tx
            .verbose_data
            .as_ref()
            .ok_or(IngestError::MissingVerboseData {
                inputs: tx.inputs.len(),
                payload_len: payload_hex.len() / 2,
            })?;
        let txid = verbose.transaction_id;

        {
            let mut dedup = self.shared.dedup.lock().expect("dedup set poisoned");
            if !dedup.try_add(txid) {
                debug!(%txid, "already processed, skipping");
                return Ok(());
            }
        }

        let bytes = hex::decode(payload_hex)?;
        let payload = Payload::from_bytes(&bytes)?;

        let prefix = *payload.prefix();
        if !prefix.trimmed().is_ascii() {
            return Err(IngestError::NonAsciiPrefix);
        }

        if self.shared.prefix_filter.load(Ordering::SeqCst) && prefix != self.shared.prefix {
            trace!(%txid, prefix = %prefix, "foreign prefix, skipping");
            return Ok(());
        }

        let consensus_hash = tx.outpoint_ids();

        if self.shared.verify_signatures.load(Ordering::SeqCst) && !payload.verify(&consensus_hash)
        {
            warn!(%txid, "signature verification failed, skipping");
            return Ok(());
        }

        let identifier = payload.identifier()?;
        let sender = PublicKey::from_bytes(payload.public_key())?;
        let address = self.ledger.address_from_pubkey(&sender, &self.network_id)?;
        let is_own = sender == self.shared.public_key;

        let peer = Peer::new(
            address,
            sender,
            Signature::from(*payload.signature()),
            is_own,
            self.shared.secret.clone(),
        );

        let header = Arc::new(MessageHeader::new(
            txid,
            peer,
            prefix,
            payload.message_type(),
            identifier,
            *meta,
            consensus_hash,
        ));
        let data: Arc<[u8]> = Arc::from(payload.data());

        self.shared.bus.emit(SessionEvent::MessageReceived {
            header: header.clone(),
            data: data.clone(),
        });

        if prefix == self.shared.prefix {
            let worker = {
                let registry = self.shared.registry.read().expect("registry poisoned");
                registry.worker(payload.message_type())
            };

            if let Some(worker) = worker {
                let header = (*header).clone();
                let data = data.to_vec();
                tokio::spawn(async move {
                    if let Err(e) = worker.handle(header, data).await {
                        warn!(%txid, "message worker failed: {e}");
                    }
                });
            }
        }

        Ok(())
    }
}
