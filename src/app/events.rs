//! Outbound application events.
//!
//! The [`ControlLoop`](crate::control::cycle::ControlLoop) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on the
//! other side decide what to do with them (log to console, forward to a
//! dashboard, etc.).

use crate::control::actuator::{Angle, Source};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Startup finished; the vent sits at `angle`.
    Started { angle: Angle },

    /// The policy moved the vent.
    VentChanged {
        from: Angle,
        to: Angle,
        reason: String,
        source: Source,
    },

    /// A policy move was requested but the driver failed.
    VentChangeFailed { to: Angle, error: String },

    /// Climate reads failed more than the tolerated number of times in a row.
    SensorDegraded { consecutive_failures: u32 },

    /// A valid climate read arrived after a degraded period.
    SensorRecovered,

    /// The shutdown sequence ran.
    Shutdown,
}
