//! Session façade
//!
//! One [`Session`] owns everything a Kaspeak participant needs: the key
//! pair, the coerced application prefix, the message registry, the event
//! bus and the dedup set. All shared state lives behind the session's
//! `Arc`, mutated only by the ingestion engine and the configuration calls
//! below.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use kaspeak_crypto::curve::CurveError;
use kaspeak_crypto::hash::Hash;
use kaspeak_crypto::identifier::{ChainKey, Identifier};
use kaspeak_crypto::key::{KeyError, PublicKey, SecretKey};
use kaspeak_messages::{MessageRegistry, MessageWorker, RegisteredMessage};
use kaspeak_primitives::payload::{PayloadError, HEADER_LEN};
use kaspeak_primitives::prefix::PrefixError;
use kaspeak_primitives::{Payload, Prefix};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::dedup::DedupSet;
use crate::events::{EventBus, EventKind, ListenerId, ListenerResult, SessionEvent};
use crate::ingest::Ingest;
use crate::ledger::{LedgerError, LedgerRpc, RpcTransaction, SubmitResult};
use crate::units::{kas_to_sompi, sompi_to_kas};

/// Prefix used when an application does not pick one.
pub const DEFAULT_PREFIX: &str = "TEST";

/// Network targeted when `connect` is not given one.
pub const DEFAULT_NETWORK_ID: &str = "mainnet";

/// Priority fees above this many whole KAS are clamped.
pub const MAX_PRIORITY_FEE_KAS: f64 = 100.0;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Prefix(#[from] PrefixError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("curve operation failed: {0}")]
    Curve(#[from] CurveError),

    #[error("priority fee of {0} KAS is invalid")]
    InvalidFee(f64),

    #[error("session is not connected")]
    NotConnected,
}

/// The two secrets a conversation runs on.
pub struct ConversationKeys {
    /// `SHA256(SHA256(ECDH))`, the symmetric message key.
    pub shared_secret: [u8; 32],
    /// `int(SHA256(shared_secret))`, the identifier-chain scalar.
    pub chain_key: ChainKey,
}

pub(crate) struct Shared {
    pub(crate) secret: SecretKey,
    pub(crate) public_key: PublicKey,
    pub(crate) prefix: Prefix,
    pub(crate) registry: RwLock<MessageRegistry>,
    pub(crate) bus: EventBus,
    pub(crate) dedup: Mutex<DedupSet<Hash<32>>>,
    pub(crate) balance_sompi: AtomicU64,
    pub(crate) utxo_count: AtomicU64,
    pub(crate) prefix_filter: AtomicBool,
    pub(crate) verify_signatures: AtomicBool,
    pub(crate) priority_fee_sompi: AtomicU64,
    pub(crate) connected: AtomicBool,
    pub(crate) address: RwLock<Option<String>>,
}

/// A Kaspeak participant bound to one key pair and one application prefix.
pub struct Session {
    shared: Arc<Shared>,
    ledger: Arc<dyn LedgerRpc>,
    block_task: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Creates a disconnected session.
    ///
    /// The secret key accepts any of the usual forms through
    /// [`SecretKey`]'s constructors (scalar, 32 bytes, hex); the prefix is
    /// coerced to exactly four bytes.
    pub fn create(
        secret: SecretKey,
        prefix: &str,
        ledger: Arc<dyn LedgerRpc>,
    ) -> Result<Self, SessionError> {
        let prefix = Prefix::coerce(prefix)?;
        let public_key = secret.public_key();

        let shared = Arc::new(Shared {
            secret,
            public_key,
            prefix,
            registry: RwLock::new(MessageRegistry::new()),
            bus: EventBus::new(),
            dedup: Mutex::new(DedupSet::default()),
            balance_sompi: AtomicU64::new(0),
            utxo_count: AtomicU64::new(0),
            prefix_filter: AtomicBool::new(true),
            verify_signatures: AtomicBool::new(true),
            priority_fee_sompi: AtomicU64::new(0),
            connected: AtomicBool::new(false),
            address: RwLock::new(None),
        });

        Ok(Self {
            shared,
            ledger,
            block_task: Mutex::new(None),
        })
    }

    /// Connects the ledger collaborator, derives the own address, starts
    /// consuming confirmed blocks and refreshes the balance.
    ///
    /// Reconnecting an already connected session is a warned no-op.
    pub async fn connect(
        &self,
        network_id: Option<&str>,
        url: Option<&str>,
    ) -> Result<(), SessionError> {
        if self.shared.connected.load(Ordering::SeqCst) {
            warn!("session already connected, ignoring connect call");
            return Ok(());
        }

        let network_id = network_id.unwrap_or(DEFAULT_NETWORK_ID).to_string();
        self.ledger.connect(&network_id, url).await?;

        let address = self
            .ledger
            .address_from_pubkey(&self.shared.public_key, &network_id)?;
        info!(%address, %network_id, "session connected");
        *self.shared.address.write().expect("address poisoned") = Some(address);

        let mut blocks = self.ledger.subscribe_block_added().await?;
        let ingest = Ingest::new(self.shared.clone(), self.ledger.clone(), network_id.clone());
        let task = tokio::spawn(async move {
            while let Some(notification) = blocks.recv().await {
                ingest.handle_block(notification);
            }
        });
        *self.block_task.lock().expect("block task poisoned") = Some(task);

        self.shared.connected.store(true, Ordering::SeqCst);
        self.refresh_balance().await?;
        self.shared.bus.emit(SessionEvent::Connected { network_id });
        Ok(())
    }

    /// Releases the subscription task and the ledger connection.
    /// Disconnecting twice is a no-op.
    pub async fn disconnect(&self) -> Result<(), SessionError> {
        if !self.shared.connected.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        if let Some(task) = self.block_task.lock().expect("block task poisoned").take() {
            task.abort();
        }

        self.ledger.disconnect().await?;
        self.shared.bus.emit(SessionEvent::Disconnected);
        Ok(())
    }

    /// Registers a message type and optional worker with the session's
    /// registry. Last registration per type code wins.
    pub fn register_message<M>(&self, worker: Option<Arc<dyn MessageWorker>>)
    where
        M: RegisteredMessage + 'static,
    {
        self.shared
            .registry
            .write()
            .expect("registry poisoned")
            .register::<M>(worker);
    }

    /// Runs a closure against the registry, for decode pipelines that need
    /// a borrow rather than a clone.
    pub fn with_registry<R>(&self, f: impl FnOnce(&MessageRegistry) -> R) -> R {
        f(&self.shared.registry.read().expect("registry poisoned"))
    }

    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(SessionEvent) -> ListenerResult + Send + Sync + 'static,
    {
        self.shared.bus.on(kind, listener)
    }

    pub fn once<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(SessionEvent) -> ListenerResult + Send + Sync + 'static,
    {
        self.shared.bus.once(kind, listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.shared.bus.off(id)
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.shared.public_key
    }

    pub fn public_key_hex(&self) -> String {
        self.shared.public_key.to_string()
    }

    pub fn prefix(&self) -> &Prefix {
        &self.shared.prefix
    }

    /// The own address; `None` until the first connect derives it.
    pub fn address(&self) -> Option<String> {
        self.shared.address.read().expect("address poisoned").clone()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Tracked balance in whole KAS.
    pub fn balance(&self) -> f64 {
        sompi_to_kas(self.balance_sompi())
    }

    pub fn balance_sompi(&self) -> u64 {
        self.shared.balance_sompi.load(Ordering::SeqCst)
    }

    pub fn utxo_count(&self) -> u64 {
        self.shared.utxo_count.load(Ordering::SeqCst)
    }

    /// Enables or disables dropping payloads whose prefix differs from the
    /// session's.
    pub fn set_prefix_filter(&self, enabled: bool) {
        self.shared.prefix_filter.store(enabled, Ordering::SeqCst);
    }

    /// Enables or disables signature verification during ingestion.
    /// Structural invariants stay enforced either way.
    pub fn set_signature_verification(&self, enabled: bool) {
        self.shared
            .verify_signatures
            .store(enabled, Ordering::SeqCst);
    }

    /// Sets the priority fee in whole KAS. Negative fees are an error;
    /// fees above [`MAX_PRIORITY_FEE_KAS`] are clamped with a warning.
    pub fn set_priority_fee(&self, kas: f64) -> Result<(), SessionError> {
        if !kas.is_finite() || kas < 0.0 {
            return Err(SessionError::InvalidFee(kas));
        }

        let clamped = if kas > MAX_PRIORITY_FEE_KAS {
            warn!(
                requested = kas,
                "priority fee above {MAX_PRIORITY_FEE_KAS} KAS, clamping"
            );
            MAX_PRIORITY_FEE_KAS
        } else {
            kas
        };

        self.shared
            .priority_fee_sompi
            .store(kas_to_sompi(clamped), Ordering::SeqCst);
        Ok(())
    }

    pub fn priority_fee_sompi(&self) -> u64 {
        self.shared.priority_fee_sompi.load(Ordering::SeqCst)
    }

    /// Builds and signs a payload frame over the given outpoint ids,
    /// returning its hex transport form.
    pub fn create_payload(
        &self,
        outpoint_ids: &str,
        message_type: u16,
        identifier: &Identifier,
        data: &[u8],
    ) -> Result<String, SessionError> {
        let mut payload = Payload::new(
            self.shared.prefix,
            message_type,
            identifier,
            &self.shared.public_key,
            data.to_vec(),
        )?;
        payload.sign(outpoint_ids, &self.shared.secret)?;
        Ok(payload.to_hex())
    }

    /// Asks the ledger for a self-transfer able to carry `data_len` payload
    /// bytes plus the frame header.
    pub async fn create_transaction(&self, data_len: usize) -> Result<RpcTransaction, SessionError> {
        let address = self.address().ok_or(SessionError::NotConnected)?;
        let tx = self
            .ledger
            .create_self_transfer(&address, data_len + HEADER_LEN, self.priority_fee_sompi())
            .await?;
        Ok(tx)
    }

    /// Attaches the payload, signs the transaction with the session key,
    /// submits it and refreshes the balance.
    pub async fn send_transaction(
        &self,
        mut tx: RpcTransaction,
        payload_hex: &str,
    ) -> Result<SubmitResult, SessionError> {
        tx.payload = payload_hex.to_string();
        let signed = self.ledger.sign_transaction(tx, &self.shared.secret).await?;
        let result = self.ledger.submit_transaction(signed).await?;
        self.refresh_balance().await?;
        Ok(result)
    }

    /// Derives the conversation secrets shared with a peer key.
    pub fn derive_conversation_keys(
        &self,
        peer: &PublicKey,
    ) -> Result<ConversationKeys, SessionError> {
        let shared_secret = self.shared.secret.shared_secret(peer)?;
        let chain_key = ChainKey::from_shared_secret(&shared_secret);
        Ok(ConversationKeys {
            shared_secret,
            chain_key,
        })
    }

    /// The consensus hash of a transaction, per the outpoint ordering rule.
    pub fn outpoint_ids(&self, tx: &RpcTransaction) -> String {
        tx.outpoint_ids()
    }

    /// Re-reads the own UTXO set and publishes the refreshed balance.
    pub async fn refresh_balance(&self) -> Result<u64, SessionError> {
        let address = self.address().ok_or(SessionError::NotConnected)?;
        let entries = self.ledger.get_utxos_by_addresses(&[address]).await?;

        let total: u64 = entries.iter().map(|entry| entry.amount).sum();
        self.shared.balance_sompi.store(total, Ordering::SeqCst);
        self.shared
            .utxo_count
            .store(entries.len() as u64, Ordering::SeqCst);

        self.shared.bus.emit(SessionEvent::BalanceChanged {
            balance_sompi: total,
            utxo_count: entries.len(),
        });
        Ok(total)
    }
}
