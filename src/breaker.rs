//! Circuit breaker state machine
//!
//! States: **Closed** (normal operation), **Open** (fast-fail while the open
//! flag is alive in the store), **Half-Open** (the open flag expired but the
//! half-open flag is still set, so the next call runs as a trial).
//!
//! All state lives in the injected [`CircuitStore`]; the breaker holds no
//! lock and never polls a clock to expire anything. Open simply becomes
//! half-open when the open flag's TTL lapses in the store. Because of that,
//! any number of breaker instances sharing one backend coordinate correctly,
//! subject to the best-effort counter documented on
//! [`WindowedCounter::increment`].

use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use crate::config::CircuitConfig;
use crate::error::{CircuitOpenError, Error, RunError, StoreError};
use crate::notify::{AlertSink, CircuitOpenAlert, EventSink, TracingAlerts, TracingEvents};
use crate::storage::{self, CircuitStore};
use crate::window::{Event, WindowedCounter};

/// Decides whether an operation error counts as a circuit failure
///
/// Errors rejected by the predicate propagate to the caller without
/// touching circuit state.
pub type ErrorPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Guard around one protected operation, identified by circuit name
///
/// `E` is the error type of the protected operation.
pub struct CircuitBreaker<E> {
    circuit: String,
    config: CircuitConfig,
    store: Arc<dyn CircuitStore>,
    counter: WindowedCounter,
    events: Arc<dyn EventSink>,
    alerts: Arc<dyn AlertSink>,
    retryable: ErrorPredicate<E>,
    open_key: String,
    half_open_key: String,
}

/// Configures and validates a [`CircuitBreaker`]
pub struct Builder<E> {
    circuit: String,
    config: CircuitConfig,
    store: Arc<dyn CircuitStore>,
    events: Arc<dyn EventSink>,
    alerts: Arc<dyn AlertSink>,
    retryable: ErrorPredicate<E>,
}

impl<E> CircuitBreaker<E> {
    /// Start building a breaker for `circuit`, persisting through `store`
    pub fn builder(circuit: impl Into<String>, store: Arc<dyn CircuitStore>) -> Builder<E> {
        Builder {
            circuit: circuit.into(),
            config: CircuitConfig::default(),
            store,
            events: Arc::new(TracingEvents),
            alerts: Arc::new(TracingAlerts),
            retryable: Arc::new(|_| true),
        }
    }

    /// Circuit name this breaker guards
    #[must_use]
    pub fn circuit(&self) -> &str {
        &self.circuit
    }

    /// True while the open flag is alive in the store
    pub async fn is_open(&self) -> Result<bool, StoreError> {
        self.store.exists(&self.open_key).await
    }

    /// Run `operation` under the breaker
    ///
    /// While the circuit is open the operation is not invoked and the call
    /// fails fast with [`RunError::Open`]. Otherwise the operation runs and
    /// its result is surfaced unchanged; retryable failures additionally
    /// update the failure counters and may trip the circuit. Storage
    /// failures abort the call with [`RunError::Store`] rather than
    /// bypassing protection.
    pub async fn run<T, F, Fut>(&self, operation: F) -> Result<T, RunError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if self.is_open().await? {
            return Err(self.skip());
        }

        match operation().await {
            Ok(value) => {
                self.on_success().await?;
                Ok(value)
            }
            Err(err) => {
                if (self.retryable)(&err) {
                    self.on_failure().await?;
                } else {
                    debug!(circuit = %self.circuit, "error not retryable, circuit state untouched");
                }
                Err(RunError::Inner(err))
            }
        }
    }

    fn skip(&self) -> RunError<E> {
        debug!(circuit = %self.circuit, "circuit open, skipping call");
        self.events.event(&self.circuit, "call skipped, circuit is open");
        RunError::Open(CircuitOpenError {
            circuit: self.circuit.clone(),
        })
    }

    async fn on_success(&self) -> Result<(), StoreError> {
        self.counter
            .increment(&self.circuit, Event::Success, self.config.time_window.get())
            .await?;
        if self.is_half_open().await? {
            self.close().await?;
        }
        Ok(())
    }

    async fn on_failure(&self) -> Result<(), StoreError> {
        self.counter
            .increment(&self.circuit, Event::Failure, self.config.time_window.get())
            .await?;
        if self.is_half_open().await? || self.should_open().await? {
            self.trip().await?;
        }
        Ok(())
    }

    /// Close after a successful trial: clear the half-open flag and notify
    ///
    /// Only acts when the open flag has already expired; a concurrent
    /// re-open between the trial and this call wins.
    async fn close(&self) -> Result<(), StoreError> {
        if self.is_open().await? {
            return Ok(());
        }
        if self.store.delete(&self.half_open_key).await? {
            self.events
                .event(&self.circuit, "circuit closed after successful trial");
        }
        Ok(())
    }

    /// Rate policy over the current aligned bucket only
    ///
    /// Opens iff the bucket saw at least `volume_threshold` events AND the
    /// failure rate is at or above `error_threshold`. The volume gate keeps
    /// a statistically insignificant number of calls from tripping the
    /// circuit; the rate gate is the actual health signal.
    async fn should_open(&self) -> Result<bool, StoreError> {
        let (failures, successes) = self.bucket_counts().await?;
        let volume_passed = failures + successes >= self.config.volume_threshold.get();
        Ok(volume_passed
            && WindowedCounter::error_rate(failures, successes)
                >= self.config.error_threshold.get())
    }

    /// Trip the circuit: write both flags and emit the open alert
    ///
    /// Idempotent while the open flag is alive; concurrent trips are
    /// last-writer-wins, which is harmless because the writes carry the
    /// same meaning.
    async fn trip(&self) -> Result<(), StoreError> {
        if self.is_open().await? {
            return Ok(());
        }

        let sleep_window = self.config.sleep_window.get();
        self.store.write(&self.open_key, 1, Some(sleep_window)).await?;
        self.store.write(&self.half_open_key, 1, None).await?;

        let (failures, successes) = self.bucket_counts().await?;
        self.alerts.circuit_opened(&CircuitOpenAlert {
            circuit: self.circuit.clone(),
            failures,
            successes,
            rate: WindowedCounter::error_rate(failures, successes),
            time_window: self.config.time_window.get(),
        });
        Ok(())
    }

    async fn is_half_open(&self) -> Result<bool, StoreError> {
        self.store.exists(&self.half_open_key).await
    }

    async fn bucket_counts(&self) -> Result<(u64, u64), StoreError> {
        let bucket = WindowedCounter::current_bucket(self.config.time_window.get());
        let failures = self
            .counter
            .count_in_window(&self.circuit, Event::Failure, bucket)
            .await?;
        let successes = self
            .counter
            .count_in_window(&self.circuit, Event::Success, bucket)
            .await?;
        Ok((failures, successes))
    }
}

impl<E> Builder<E> {
    /// Replace the default thresholds and windows
    #[must_use]
    pub fn config(mut self, config: CircuitConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the informational event sink
    #[must_use]
    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Replace the alerting sink
    #[must_use]
    pub fn alerts(mut self, alerts: Arc<dyn AlertSink>) -> Self {
        self.alerts = alerts;
        self
    }

    /// Restrict which operation errors count as circuit failures
    ///
    /// The default treats every error as a failure.
    #[must_use]
    pub fn retryable(mut self, predicate: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        self.retryable = Arc::new(predicate);
        self
    }

    /// Validate the configuration and build the breaker
    ///
    /// Fails with [`Error::InvalidConfig`] when `sleep_window` is shorter
    /// than `time_window`.
    pub fn build(self) -> Result<CircuitBreaker<E>, Error> {
        self.config.validate(&self.circuit)?;
        Ok(CircuitBreaker {
            open_key: storage::open_key(&self.circuit),
            half_open_key: storage::half_open_key(&self.circuit),
            counter: WindowedCounter::new(Arc::clone(&self.store)),
            circuit: self.circuit,
            config: self.config,
            store: self.store,
            events: self.events,
            alerts: self.alerts,
            retryable: self.retryable,
        })
    }
}
