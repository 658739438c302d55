//! Shared memory ring transport
use std::sync::{Arc, Mutex};

use log::{debug, error};
use thiserror::Error;

mod memory;
mod registry;

pub use memory::MemoryRing;
pub use registry::{Registry, StaticRegistry, TYPE_ERROR, TYPE_HEARTBEAT, TYPE_TRACEBUF2};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("failed to attach to ring {0}")]
    Attach(i64),
    #[error("not attached to any ring")]
    NotAttached,
    #[error("ring {0} is full")]
    RingFull(i64),
    #[error("put rejected: {0}")]
    Rejected(String),
    #[error("transport lock poisoned")]
    Poisoned,
}

/// [MessageLogo] identifies the class and origin of each message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MessageLogo {
    /// Message type
    pub msg_type: u8,
    /// Producing module
    pub module: u8,
    /// Producing installation
    pub installation: u8,
}

/// Real-time messaging [Transport]: one shared ring, one message at a time.
pub trait Transport: Send + 'static {
    /// Attaches to the ring identified by this key.
    fn attach(&mut self, ring_key: i64) -> Result<(), TransportError>;

    /// Submits one message to the attached ring.
    fn put(&mut self, logo: &MessageLogo, message: &[u8]) -> Result<(), TransportError>;

    /// Detaches from the ring. Never fails.
    fn detach(&mut self);
}

/// Scoped ring [Attachment]: the ring is detached when this is dropped,
/// whatever the exit path. Every submission goes through the single
/// transport lock, so at most one message is in flight.
#[derive(Debug)]
pub struct Attachment<T: Transport> {
    transport: Arc<Mutex<T>>,
    ring_key: i64,
}

impl<T: Transport> Attachment<T> {
    /// Attaches to this ring
    pub fn new(transport: Arc<Mutex<T>>, ring_key: i64) -> Result<Self, TransportError> {
        {
            let mut guard = transport.lock().map_err(|_| TransportError::Poisoned)?;
            guard.attach(ring_key)?;
        }
        debug!("attached to ring {}", ring_key);
        Ok(Self {
            transport,
            ring_key,
        })
    }

    pub fn ring_key(&self) -> i64 {
        self.ring_key
    }

    /// Submits one message
    pub fn put(&self, logo: &MessageLogo, message: &[u8]) -> Result<(), TransportError> {
        let mut guard = self
            .transport
            .lock()
            .map_err(|_| TransportError::Poisoned)?;
        guard.put(logo, message)
    }
}

impl<T: Transport> Drop for Attachment<T> {
    fn drop(&mut self) {
        match self.transport.lock() {
            Ok(mut guard) => guard.detach(),
            Err(poisoned) => {
                error!("transport lock poisoned, detaching anyway");
                poisoned.into_inner().detach();
            },
        }
        debug!("detached from ring {}", self.ring_key);
    }
}
