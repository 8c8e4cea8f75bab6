//! Error types for the VentGuard controller.
//!
//! Every subsystem has its own enum so callers can match on exactly the
//! failures that subsystem produces.  None of these are fatal to the
//! process: sensor and subscription failures degrade, actuator failures
//! are reported to the caller and retried on the next eligible tick, and
//! telemetry failures are logged and dropped.

use core::time::Duration;

use thiserror::Error;

use crate::app::ports::Edge;

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

/// A sensor driver could not produce a reading this tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorError {
    /// The driver timed out or returned no data.
    #[error("sensor read failed")]
    ReadFailed,
    /// The single-wire frame arrived but failed its checksum.
    #[error("checksum mismatch")]
    ChecksumMismatch,
    /// The underlying GPIO line reported an error.
    #[error("GPIO read failed: {0}")]
    Gpio(String),
}

// ---------------------------------------------------------------------------
// Gas event subscription errors
// ---------------------------------------------------------------------------

/// The gas driver refused an edge-triggered subscription.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    /// The backend cannot deliver this edge mode.
    #[error("{0:?} edge detection not supported")]
    Unsupported(Edge),
    /// The backend accepted the request but failed to arm it.
    #[error("edge detection setup failed: {0}")]
    Driver(String),
}

// ---------------------------------------------------------------------------
// Physical driver errors
// ---------------------------------------------------------------------------

/// A write to a physical output failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("PWM write failed: {0}")]
    Pwm(String),
    #[error("GPIO write failed: {0}")]
    Gpio(String),
    #[error("driver disconnected")]
    Disconnected,
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

/// Failures reported by the actuator controller and the override surface.
///
/// `InvalidAngle`, `UnknownPreset` and `InvalidSweep` are caller errors and
/// never mutate actuator state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActuatorError {
    #[error("angle {0} is outside 0..=180 degrees")]
    InvalidAngle(i64),
    #[error("unknown preset position '{0}'")]
    UnknownPreset(String),
    #[error("invalid sweep: {0}")]
    InvalidSweep(String),
    #[error("actuator driver failure: {0}")]
    DriverFailure(#[from] DriverError),
    /// A policy write arrived before its minimum interval elapsed.
    #[error("policy change rate limited, retry in {retry_in:?}")]
    RateLimited { retry_in: Duration },
}

// ---------------------------------------------------------------------------
// Telemetry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TelemetryError {
    #[error("payload encoding failed: {0}")]
    Encode(String),
    #[error("publish rejected: {0}")]
    Rejected(String),
    #[error("publish timed out")]
    Timeout,
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    /// A field failed range validation.  The message names the field.
    #[error("validation failed: {0}")]
    ValidationFailed(&'static str),
}
