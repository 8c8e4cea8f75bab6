//! Sensor subsystem: climate and motion sampling plus the gas watcher.
//!
//! [`SensorSampler`] owns the climate and motion drivers and produces one
//! [`SensorSnapshot`] per control-loop tick.  The gas level comes from the
//! shared [`GasWatcher`] latch, which is fed independently of the tick.

pub mod gas;
pub mod motion;

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::time::Instant;

use crate::app::ports::{ClimateSensorPort, MotionSensorPort};
use gas::GasWatcher;
use motion::{MotionHistory, MotionTracker};

/// Immutable set of readings from one tick.
///
/// When `valid` is `false` the climate read failed this tick and
/// `temperature`/`humidity` carry the last good values (or zero before the
/// first good read); callers must not act on them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSnapshot {
    pub temperature: f32,
    pub humidity: f32,
    pub motion: bool,
    pub gas: bool,
    pub timestamp: Instant,
    pub valid: bool,
}

/// Produces snapshots and tracks climate-read health.
pub struct SensorSampler {
    climate: Box<dyn ClimateSensorPort>,
    motion_sensor: Box<dyn MotionSensorPort>,
    gas: Arc<GasWatcher>,
    tracker: MotionTracker,
    last_temperature: f32,
    last_humidity: f32,
    consecutive_failures: u32,
    failure_threshold: u32,
}

impl SensorSampler {
    pub fn new(
        climate: Box<dyn ClimateSensorPort>,
        motion_sensor: Box<dyn MotionSensorPort>,
        gas: Arc<GasWatcher>,
        tracker: MotionTracker,
        failure_threshold: u32,
    ) -> Self {
        Self {
            climate,
            motion_sensor,
            gas,
            tracker,
            last_temperature: 0.0,
            last_humidity: 0.0,
            consecutive_failures: 0,
            failure_threshold,
        }
    }

    /// Read every sensor once.
    ///
    /// Climate failures never propagate: they mark the snapshot invalid and
    /// bump the failure counter.  A failed motion read keeps the previous
    /// level so a flaky PIR cannot fake an idle room.
    pub fn sample(&mut self, now: Instant) -> SensorSnapshot {
        let valid = match self.climate.read_temperature_humidity() {
            Ok(reading) => {
                if self.consecutive_failures > self.failure_threshold {
                    info!(
                        "Climate sensor recovered after {} failed reads",
                        self.consecutive_failures
                    );
                }
                self.consecutive_failures = 0;
                self.last_temperature = reading.temperature_c;
                self.last_humidity = reading.humidity_pct;
                true
            }
            Err(e) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                debug!(
                    "Climate read failed ({e}), {} in a row",
                    self.consecutive_failures
                );
                false
            }
        };

        let motion = match self.motion_sensor.read_motion() {
            Ok(level) => level,
            Err(e) => {
                warn!("Motion read failed: {e}");
                self.tracker.is_active()
            }
        };
        if self.tracker.observe(motion, now) {
            debug!("Motion event #{}", self.tracker.history().motion_count);
        }

        SensorSnapshot {
            temperature: self.last_temperature,
            humidity: self.last_humidity,
            motion,
            gas: self.gas.current_state(),
            timestamp: now,
            valid,
        }
    }

    /// More than `failure_threshold` climate reads have failed in a row.
    pub fn is_degraded(&self) -> bool {
        self.consecutive_failures > self.failure_threshold
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn motion_history(&self) -> MotionHistory {
        self.tracker.history()
    }

    pub fn gas_watcher(&self) -> &Arc<GasWatcher> {
        &self.gas
    }
}
