//! In-process store with TTL expiry
//!
//! Suitable for tests and single-process hosts. Entries are expired lazily
//! on access; [`MemoryStore::evict_expired`] sweeps the rest if a host wants
//! background maintenance. Cross-process coordination needs a shared
//! backend implementing [`CircuitStore`] instead.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::CircuitStore;
use crate::error::StoreError;

/// A stored value with TTL metadata
struct Entry {
    value: u64,
    written_at: Instant,
    ttl: Option<Duration>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        match self.ttl {
            Some(ttl) => self.written_at.elapsed() > ttl,
            None => false,
        }
    }
}

/// Thread-safe in-memory key-value store with per-entry TTL
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
}

impl MemoryStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Read a live value, evicting the entry if it has expired
    fn live(&self, key: &str) -> Option<u64> {
        if let Some(entry) = self.entries.get(key) {
            if entry.is_expired() {
                drop(entry);
                self.entries.remove(key);
                None
            } else {
                Some(entry.value)
            }
        } else {
            None
        }
    }

    /// Remove all expired entries
    pub fn evict_expired(&self) {
        self.entries.retain(|_, entry| !entry.is_expired());
    }

    /// Number of entries currently held, expired ones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the store holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CircuitStore for MemoryStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.live(key).is_some())
    }

    async fn read(&self, key: &str) -> Result<Option<u64>, StoreError> {
        Ok(self.live(key))
    }

    async fn write(&self, key: &str, value: u64, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                written_at: Instant::now(),
                ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        match self.entries.remove(key) {
            Some((_, entry)) => Ok(!entry.is_expired()),
            None => Ok(false),
        }
    }

    async fn increment(
        &self,
        key: &str,
        ttl: Option<Duration>,
    ) -> Result<Option<u64>, StoreError> {
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: 0,
            written_at: Instant::now(),
            ttl,
        });
        if entry.is_expired() {
            entry.value = 0;
        }
        entry.value += 1;
        entry.written_at = Instant::now();
        entry.ttl = ttl;
        Ok(Some(entry.value))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn test_write_then_read() {
        let store = MemoryStore::new();
        store.write("k", 5, None).await.unwrap();

        assert_eq!(store.read("k").await.unwrap(), Some(5));
        assert!(store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_absent_key_reads_none() {
        let store = MemoryStore::new();
        assert_eq!(store.read("missing").await.unwrap(), None);
        assert!(!store.exists("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let store = MemoryStore::new();
        store
            .write("k", 1, Some(Duration::from_millis(5)))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(15)).await;

        assert_eq!(store.read("k").await.unwrap(), None);
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_reports_live_entries_only() {
        let store = MemoryStore::new();
        store.write("k", 1, None).await.unwrap();

        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_increment_is_atomic_and_counts_from_zero() {
        let store = MemoryStore::new();

        assert_eq!(store.increment("c", None).await.unwrap(), Some(1));
        assert_eq!(store.increment("c", None).await.unwrap(), Some(2));
        assert_eq!(store.read("c").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_increment_restarts_after_expiry() {
        let store = MemoryStore::new();
        let ttl = Some(Duration::from_millis(5));

        store.increment("c", ttl).await.unwrap();
        tokio::time::sleep(Duration::from_millis(15)).await;

        assert_eq!(store.increment("c", ttl).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_evict_expired_sweeps_dead_entries() {
        let store = MemoryStore::new();
        store
            .write("short", 1, Some(Duration::from_millis(5)))
            .await
            .unwrap();
        store.write("long", 2, None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(15)).await;
        store.evict_expired();

        assert_eq!(store.len(), 1);
        assert_eq!(store.read("long").await.unwrap(), Some(2));
    }
}
