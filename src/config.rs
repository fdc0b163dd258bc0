//! Circuit configuration
//!
//! Every field is a [`Setting`]: either a fixed literal or a zero-argument
//! accessor re-evaluated on each read, so hosts can reconfigure thresholds
//! at runtime without rebuilding the breaker.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::Error;

/// A configuration value: fixed, or produced by a thunk on every read
pub enum Setting<T> {
    /// Literal value
    Fixed(T),
    /// Accessor evaluated on each read
    Dynamic(Arc<dyn Fn() -> T + Send + Sync>),
}

impl<T: Clone> Setting<T> {
    /// Resolve the current value
    pub fn get(&self) -> T {
        match self {
            Self::Fixed(value) => value.clone(),
            Self::Dynamic(thunk) => thunk(),
        }
    }
}

impl<T> Setting<T> {
    /// Build a dynamic setting from an accessor
    pub fn dynamic(thunk: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self::Dynamic(Arc::new(thunk))
    }
}

impl<T> From<T> for Setting<T> {
    fn from(value: T) -> Self {
        Self::Fixed(value)
    }
}

impl<T: Clone> Clone for Setting<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Fixed(value) => Self::Fixed(value.clone()),
            Self::Dynamic(thunk) => Self::Dynamic(Arc::clone(thunk)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Setting<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Setting<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Self::Fixed)
    }
}

/// Deserialize a humantime duration (`"100s"`, `"5m"`) into a fixed setting
fn duration_setting<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Setting<Duration>, D::Error> {
    humantime_serde::deserialize(deserializer).map(Setting::Fixed)
}

/// Thresholds and windows for one circuit
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CircuitConfig {
    /// Length of one counting bucket; counters expire with it
    #[serde(deserialize_with = "duration_setting")]
    pub time_window: Setting<Duration>,

    /// Minimum `failures + successes` in the current bucket before a rate
    /// decision is trusted
    pub volume_threshold: Setting<u64>,

    /// Failure percentage (0-100) at or above which the circuit opens
    pub error_threshold: Setting<f64>,

    /// How long the circuit stays open before a trial call is permitted
    #[serde(deserialize_with = "duration_setting")]
    pub sleep_window: Setting<Duration>,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            time_window: Setting::Fixed(Duration::from_secs(60)),
            volume_threshold: Setting::Fixed(10),
            error_threshold: Setting::Fixed(50.0),
            sleep_window: Setting::Fixed(Duration::from_secs(300)),
        }
    }
}

impl CircuitConfig {
    /// Check the `sleep_window >= time_window` invariant
    ///
    /// A shorter sleep would put the circuit back in service inside the
    /// same bucket whose error rate tripped it.
    pub fn validate(&self, circuit: &str) -> Result<(), Error> {
        let sleep_window = self.sleep_window.get();
        let time_window = self.time_window.get();
        if sleep_window < time_window {
            return Err(Error::InvalidConfig {
                circuit: circuit.to_string(),
                sleep_window,
                time_window,
            });
        }
        Ok(())
    }
}
