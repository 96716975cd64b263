use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use kaspeak_primitives::MessageHeader;
use thiserror::Error;

use crate::message::{KaspeakMessage, RegisteredMessage};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("no message type registered for code {0}")]
    UnknownMessageType(u16),
}

/// Handler scheduled for each inbound message of a given type.
///
/// Workers receive the raw data section and run the decode pipeline
/// themselves; failures are logged by the dispatcher and never propagate.
#[async_trait]
pub trait MessageWorker: Send + Sync {
    async fn handle(
        &self,
        header: MessageHeader,
        data: Vec<u8>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

type MessageCtor = Box<dyn Fn() -> Box<dyn KaspeakMessage> + Send + Sync>;

struct RegistryEntry {
    ctor: MessageCtor,
    worker: Option<Arc<dyn MessageWorker>>,
}

/// Maps wire type codes to message constructors and optional workers.
///
/// Re-registering a code overwrites the previous entry; lookups are
/// constant-time. Codes are `u16`, so the `0..=65535` domain needs no
/// runtime guard.
#[derive(Default)]
pub struct MessageRegistry {
    entries: HashMap<u16, RegistryEntry>,
}

impl MessageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a message type with an optional worker. Last registration
    /// wins.
    pub fn register<M>(&mut self, worker: Option<Arc<dyn MessageWorker>>)
    where
        M: RegisteredMessage + 'static,
    {
        self.register_with(M::MESSAGE_TYPE, Box::new(|| Box::<M>::default()), worker);
    }

    /// Raw registration form for callers that build constructors by hand.
    pub fn register_with(
        &mut self,
        code: u16,
        ctor: MessageCtor,
        worker: Option<Arc<dyn MessageWorker>>,
    ) {
        self.entries.insert(code, RegistryEntry { ctor, worker });
    }

    /// Instantiates a default value of the registered type.
    pub fn create(&self, code: u16) -> Result<Box<dyn KaspeakMessage>, RegistryError> {
        self.entries
            .get(&code)
            .map(|entry| (entry.ctor)())
            .ok_or(RegistryError::UnknownMessageType(code))
    }

    pub fn worker(&self, code: u16) -> Option<Arc<dyn MessageWorker>> {
        self.entries.get(&code).and_then(|entry| entry.worker.clone())
    }

    pub fn contains(&self, code: u16) -> bool {
        self.entries.contains_key(&code)
    }
}
