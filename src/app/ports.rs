//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SensorSampler / GasWatcher / ActuatorController
//! ```
//!
//! Driven adapters (sensors, servo, alarm, display, telemetry, event sinks)
//! implement these traits.  The domain core consumes them as boxed trait
//! objects so the control loop and the override handlers can share them
//! across tasks without touching hardware directly.
//!
//! All port methods are synchronous except [`TelemetryPort::publish`], which
//! crosses the network.  GPIO and PWM calls on the Pi complete in
//! microseconds; the servo settle time is awaited by the controller, not by
//! the port.

use std::sync::Arc;

use async_trait::async_trait;

use crate::control::actuator::Angle;
use crate::error::{DriverError, SensorError, SubscriptionError, TelemetryError};
use crate::telemetry::TelemetryPayload;

use super::events::AppEvent;

// ───────────────────────────────────────────────────────────────
// Sensor ports (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// One temperature/humidity sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

/// DHT-class combined temperature/humidity sensor.
pub trait ClimateSensorPort: Send {
    fn read_temperature_humidity(&mut self) -> Result<ClimateReading, SensorError>;
}

/// PIR motion sensor.  `true` while the sensor output is asserted.
pub trait MotionSensorPort: Send {
    fn read_motion(&mut self) -> Result<bool, SensorError>;
}

/// Electrical edge on the gas sensor's digital output.
///
/// The MQ-2 output is active-low: a falling edge means gas appeared and a
/// rising edge means it cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Both,
    Rising,
    Falling,
}

impl Edge {
    /// Subscription modes in the order they are attempted.
    pub const FALLBACK_ORDER: [Edge; 3] = [Edge::Both, Edge::Rising, Edge::Falling];
}

/// Callback invoked by a gas driver on a subscribed edge.  The argument is
/// the gas state read at the time of the edge (`true` = gas present).
pub type GasCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// MQ-2 gas/smoke sensor, digital output.
pub trait GasSensorPort: Send {
    /// Read the current gas state directly (`true` = gas present).
    fn read_gas(&mut self) -> Result<bool, SensorError>;

    /// Arm edge-triggered notification.  The callback may run on a driver
    /// thread, concurrently with the control loop.
    fn subscribe(&mut self, edge: Edge, on_change: GasCallback) -> Result<(), SubscriptionError>;

    /// Disarm any active subscription.  Called once at shutdown.
    fn unsubscribe(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Actuator ports (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Servo that positions the vent flap.
///
/// Only [`ActuatorController`](crate::control::actuator::ActuatorController)
/// holds one of these.
pub trait ServoPort: Send {
    /// Start driving the servo towards `angle`.
    fn set_angle(&mut self, angle: Angle) -> Result<(), DriverError>;

    /// Stop the control pulse once the servo has settled (prevents jitter).
    fn stop_pulse(&mut self) -> Result<(), DriverError>;

    /// Release the PWM channel.  The servo is not driven afterwards.
    fn release(&mut self);
}

/// Gas alarm outputs (indicator LED and buzzer, switched together).
pub trait AlarmPort: Send {
    fn set_alarm(&mut self, on: bool) -> Result<(), DriverError>;
}

/// Two-row character display.
pub trait DisplayPort: Send {
    /// Write `text` to `row` (0 or 1).  The text is already padded to width.
    fn write_line(&mut self, row: u8, text: &str);
}

// ───────────────────────────────────────────────────────────────
// Telemetry port (driven adapter: domain → cloud)
// ───────────────────────────────────────────────────────────────

/// Cloud publish collaborator.  Failures are reported, never retried here.
#[async_trait]
pub trait TelemetryPort: Send + Sync {
    async fn publish(&self, channel: &str, payload: &TelemetryPayload) -> Result<(), TelemetryError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Local wall-clock time of day.  Monotonic time comes from
/// `tokio::time::Instant` so tests can pause it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

pub trait ClockPort: Send {
    fn wall_time(&self) -> WallTime;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The control loop emits structured [`AppEvent`]s through this port.
/// Adapters decide where they go.
pub trait EventSink: Send {
    fn emit(&mut self, event: &AppEvent);
}
