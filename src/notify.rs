//! Notification sinks for breaker state changes
//!
//! Two independent collaborators: an informational event sink (call skipped,
//! circuit closed) and an alerting sink that receives a structured record
//! exactly when a circuit trips. Defaults route both to `tracing`.

use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

/// Structured record emitted when a circuit transitions to open
#[derive(Debug, Clone, Serialize)]
pub struct CircuitOpenAlert {
    /// Circuit that tripped
    pub circuit: String,
    /// Failures observed in the current bucket
    pub failures: u64,
    /// Successes observed in the current bucket
    pub successes: u64,
    /// Failure percentage over the current bucket
    pub rate: f64,
    /// Length of the counting bucket the snapshot covers
    #[serde(with = "humantime_serde")]
    pub time_window: Duration,
}

/// Informational event sink
pub trait EventSink: Send + Sync {
    /// Receive a human-readable event for one circuit
    fn event(&self, circuit: &str, message: &str);
}

/// Alerting sink, invoked exactly when a circuit opens
pub trait AlertSink: Send + Sync {
    /// Receive the open-transition snapshot
    fn circuit_opened(&self, alert: &CircuitOpenAlert);
}

/// Routes informational events to `tracing` at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEvents;

impl EventSink for TracingEvents {
    fn event(&self, circuit: &str, message: &str) {
        info!(circuit, "{message}");
    }
}

/// Routes open alerts to `tracing` at warn level with structured fields
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlerts;

impl AlertSink for TracingAlerts {
    fn circuit_opened(&self, alert: &CircuitOpenAlert) {
        warn!(
            circuit = %alert.circuit,
            failures = alert.failures,
            successes = alert.successes,
            rate = alert.rate,
            time_window_secs = alert.time_window.as_secs(),
            "circuit opened, failing fast"
        );
    }
}
