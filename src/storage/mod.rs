//! Storage collaborator: an external key-value store with TTL expiry
//!
//! All circuit state lives here, keyed deterministically by circuit name.
//! Multiple breaker instances sharing one backend coordinate through it;
//! the breaker itself holds no state and no locks.

mod memory;

pub use memory::MemoryStore;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::window::Event;

/// Key-value store with per-entry time-to-live
///
/// `ttl = None` means no expiry. Implementations must be safe to share
/// across tasks; the breaker issues concurrent reads and writes.
#[async_trait]
pub trait CircuitStore: Send + Sync {
    /// True if the key exists and has not expired
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Current value, or `None` if absent or expired
    async fn read(&self, key: &str) -> Result<Option<u64>, StoreError>;

    /// Write a value, replacing any previous entry and its TTL
    async fn write(&self, key: &str, value: u64, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Remove a key; true if a live entry was deleted
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Atomically increment a counter, treating absent or expired as 0 and
    /// resetting the entry's TTL
    ///
    /// Returns the new count, or `None` when the backend has no atomic
    /// increment. Callers then fall back to a read-modify-write pair, which
    /// can lose updates under concurrency.
    async fn increment(
        &self,
        _key: &str,
        _ttl: Option<Duration>,
    ) -> Result<Option<u64>, StoreError> {
        Ok(None)
    }
}

/// Key holding the open flag for a circuit
#[must_use]
pub fn open_key(circuit: &str) -> String {
    format!("circuits:{circuit}:open")
}

/// Key holding the half-open flag for a circuit
#[must_use]
pub fn half_open_key(circuit: &str) -> String {
    format!("circuits:{circuit}:half_open")
}

/// Key holding one event counter for a circuit and aligned bucket
#[must_use]
pub fn stat_key(circuit: &str, bucket: u64, event: Event) -> String {
    format!("circuits:{circuit}:stats:{bucket}:{event}", event = event.as_str())
}
