//! Storage-backed circuit breaker
//!
//! Guards a potentially failing async operation (typically a remote call):
//! tracks recent success/failure history in an external key-value store with
//! TTL expiry, and once failures exceed a configured rate within the current
//! time bucket, stops invoking the operation for a cooldown period, failing
//! fast instead.
//!
//! # Design
//!
//! - **No internal state**: the open/half-open flags and per-bucket counters
//!   live in an injected [`CircuitStore`]; any number of breaker instances
//!   sharing one backend coordinate through it.
//! - **TTL-driven transitions**: open becomes half-open purely by flag
//!   expiry in the store; the breaker never polls a clock.
//! - **Pass-through errors**: the protected operation's result or error is
//!   always surfaced unchanged; the breaker only adds a fast-fail error when
//!   it skips a call.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use fusebox::{CircuitBreaker, CircuitConfig, MemoryStore};
//!
//! # #[derive(Debug, thiserror::Error)]
//! # #[error("upstream timeout")]
//! # struct Timeout;
//! # async fn call_upstream() -> Result<String, Timeout> { Ok(String::new()) }
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let breaker = CircuitBreaker::<Timeout>::builder("upstream", Arc::new(MemoryStore::new()))
//!     .config(CircuitConfig {
//!         time_window: Duration::from_secs(60).into(),
//!         volume_threshold: 10.into(),
//!         error_threshold: 50.0.into(),
//!         sleep_window: Duration::from_secs(120).into(),
//!     })
//!     .build()?;
//!
//! let _response = breaker.run(|| call_upstream()).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod breaker;
pub mod config;
pub mod error;
pub mod notify;
pub mod storage;
pub mod window;

pub use breaker::{Builder, CircuitBreaker, ErrorPredicate};
pub use config::{CircuitConfig, Setting};
pub use error::{CircuitOpenError, Error, Result, RunError, StoreError};
pub use notify::{AlertSink, CircuitOpenAlert, EventSink, TracingAlerts, TracingEvents};
pub use storage::{CircuitStore, MemoryStore};
pub use window::{Event, WindowedCounter};
