//! Periodic cloud telemetry.
//!
//! Publishing is best-effort: each publish runs on its own task with a
//! deadline of one publish interval, and failures are logged and dropped.
//! The control loop never waits on the network.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout};

use crate::app::ports::TelemetryPort;
use crate::control::actuator::Angle;
use crate::error::TelemetryError;
use crate::sensors::SensorSnapshot;

/// Message body sent to the telemetry channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TelemetryPayload {
    pub temperature: f32,
    pub humidity: f32,
    pub motion: bool,
    pub gas: bool,
    pub vent_angle: Angle,
}

impl TelemetryPayload {
    pub fn new(snapshot: &SensorSnapshot, vent_angle: Angle) -> Self {
        Self {
            temperature: snapshot.temperature,
            humidity: snapshot.humidity,
            motion: snapshot.motion,
            gas: snapshot.gas,
            vent_angle,
        }
    }

    pub fn to_json(&self) -> Result<String, TelemetryError> {
        serde_json::to_string(self).map_err(|e| TelemetryError::Encode(e.to_string()))
    }
}

pub struct TelemetryPublisher {
    port: Arc<dyn TelemetryPort>,
    channel: Arc<str>,
    interval: Duration,
    last_publish: Option<Instant>,
}

impl TelemetryPublisher {
    pub fn new(port: Arc<dyn TelemetryPort>, channel: &str, interval: Duration) -> Self {
        Self {
            port,
            channel: Arc::from(channel),
            interval,
            last_publish: None,
        }
    }

    /// Whether a publish is due at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        self.last_publish
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval)
    }

    /// Spawn a publish if one is due.  The returned handle is only useful
    /// to tests; dropping it detaches the task.
    pub fn maybe_publish(
        &mut self,
        snapshot: &SensorSnapshot,
        vent_angle: Angle,
        now: Instant,
    ) -> Option<JoinHandle<()>> {
        if !self.is_due(now) {
            return None;
        }
        self.last_publish = Some(now);

        let payload = TelemetryPayload::new(snapshot, vent_angle);
        let port = Arc::clone(&self.port);
        let channel = Arc::clone(&self.channel);
        let deadline = self.interval;
        Some(tokio::spawn(async move {
            let result = match timeout(deadline, port.publish(&channel, &payload)).await {
                Ok(result) => result,
                Err(_) => Err(TelemetryError::Timeout),
            };
            match result {
                Ok(()) => debug!("Telemetry published to '{channel}'"),
                Err(e) => warn!("Telemetry publish failed: {e}"),
            }
        }))
    }
}
