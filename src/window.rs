//! Sliding-window event counting
//!
//! Wall-clock time is aligned to fixed-size buckets; each bucket carries one
//! counter per event kind, stored with a TTL equal to the bucket length so
//! stale buckets vanish on their own. Two calls straddling a bucket boundary
//! land in different buckets; there is no smoothing across buckets.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::trace;

use crate::error::StoreError;
use crate::storage::{self, CircuitStore};

/// Event kinds tracked per bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The protected operation completed
    Success,
    /// The protected operation failed with a retryable error
    Failure,
}

impl Event {
    /// Key segment for this event kind
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// Per-bucket event counter backed by the storage collaborator
pub struct WindowedCounter {
    store: Arc<dyn CircuitStore>,
}

impl WindowedCounter {
    /// Create a counter reading and writing through `store`
    #[must_use]
    pub fn new(store: Arc<dyn CircuitStore>) -> Self {
        Self { store }
    }

    /// Align a timestamp (seconds since epoch) to its bucket:
    /// `now - (now % window)`
    #[must_use]
    pub fn aligned_bucket(now_secs: u64, window: Duration) -> u64 {
        let window_secs = window.as_secs().max(1);
        now_secs - (now_secs % window_secs)
    }

    /// Bucket containing the current wall-clock time
    #[must_use]
    pub fn current_bucket(window: Duration) -> u64 {
        Self::aligned_bucket(now_secs(), window)
    }

    /// Record one event in the current bucket
    ///
    /// Prefers the store's atomic increment. When the backend reports it
    /// unsupported, falls back to a read-then-write pair; under concurrent
    /// callers that pair can lose updates, so the count is best-effort.
    pub async fn increment(
        &self,
        circuit: &str,
        event: Event,
        window: Duration,
    ) -> Result<(), StoreError> {
        let key = storage::stat_key(circuit, Self::current_bucket(window), event);
        let ttl = Some(window);

        if self.store.increment(&key, ttl).await?.is_some() {
            return Ok(());
        }

        trace!(key = %key, "store has no atomic increment, using read-modify-write");
        let current = self.store.read(&key).await?.unwrap_or(0);
        self.store.write(&key, current + 1, ttl).await
    }

    /// Persisted count for one bucket and event kind, 0 if absent or expired
    pub async fn count_in_window(
        &self,
        circuit: &str,
        event: Event,
        bucket: u64,
    ) -> Result<u64, StoreError> {
        let key = storage::stat_key(circuit, bucket, event);
        Ok(self.store.read(&key).await?.unwrap_or(0))
    }

    /// Failure percentage over a bucket, 0.0 when nothing was observed
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn error_rate(failures: u64, successes: u64) -> f64 {
        let total = failures + successes;
        if total == 0 {
            0.0
        } else {
            (failures as f64 / total as f64) * 100.0
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_aligned_bucket_is_stable_within_a_window() {
        let window = Duration::from_secs(100);

        assert_eq!(WindowedCounter::aligned_bucket(1000, window), 1000);
        assert_eq!(WindowedCounter::aligned_bucket(1001, window), 1000);
        assert_eq!(WindowedCounter::aligned_bucket(1099, window), 1000);
        assert_eq!(WindowedCounter::aligned_bucket(1100, window), 1100);
    }

    #[test]
    fn test_error_rate_of_nothing_is_zero() {
        assert_eq!(WindowedCounter::error_rate(0, 0), 0.0);
    }

    #[test]
    fn test_error_rate_is_percentage_of_failures() {
        assert_eq!(WindowedCounter::error_rate(1, 0), 100.0);
        assert_eq!(WindowedCounter::error_rate(1, 1), 50.0);
        assert_eq!(WindowedCounter::error_rate(1, 3), 25.0);
    }

    #[test]
    fn test_error_rate_monotone_in_failures() {
        let successes = 7;
        let mut previous = 0.0;
        for failures in 0..50 {
            let rate = WindowedCounter::error_rate(failures, successes);
            assert!(rate >= previous);
            previous = rate;
        }
    }

    #[tokio::test]
    async fn test_increment_uses_atomic_path_when_available() {
        let store = Arc::new(MemoryStore::new());
        let counter = WindowedCounter::new(Arc::clone(&store) as Arc<dyn CircuitStore>);
        let window = Duration::from_secs(3600);

        counter.increment("c", Event::Success, window).await.unwrap();
        counter.increment("c", Event::Success, window).await.unwrap();

        let bucket = WindowedCounter::current_bucket(window);
        assert_eq!(
            counter
                .count_in_window("c", Event::Success, bucket)
                .await
                .unwrap(),
            2
        );
    }

    /// Store without the atomic increment capability, forcing the fallback
    struct PlainStore(MemoryStore);

    #[async_trait]
    impl CircuitStore for PlainStore {
        async fn exists(&self, key: &str) -> Result<bool, StoreError> {
            self.0.exists(key).await
        }
        async fn read(&self, key: &str) -> Result<Option<u64>, StoreError> {
            self.0.read(key).await
        }
        async fn write(&self, key: &str, value: u64, ttl: Option<Duration>) -> Result<(), StoreError> {
            self.0.write(key, value, ttl).await
        }
        async fn delete(&self, key: &str) -> Result<bool, StoreError> {
            self.0.delete(key).await
        }
    }

    #[tokio::test]
    async fn test_increment_falls_back_to_read_modify_write() {
        let store = Arc::new(PlainStore(MemoryStore::new()));
        let counter = WindowedCounter::new(Arc::clone(&store) as Arc<dyn CircuitStore>);
        let window = Duration::from_secs(3600);

        counter.increment("c", Event::Failure, window).await.unwrap();
        counter.increment("c", Event::Failure, window).await.unwrap();

        let bucket = WindowedCounter::current_bucket(window);
        assert_eq!(
            counter
                .count_in_window("c", Event::Failure, bucket)
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_counts_are_scoped_per_event_kind() {
        let store = Arc::new(MemoryStore::new());
        let counter = WindowedCounter::new(Arc::clone(&store) as Arc<dyn CircuitStore>);
        let window = Duration::from_secs(3600);

        counter.increment("c", Event::Failure, window).await.unwrap();

        let bucket = WindowedCounter::current_bucket(window);
        assert_eq!(
            counter
                .count_in_window("c", Event::Success, bucket)
                .await
                .unwrap(),
            0
        );
    }
}
