//! System configuration parameters
//!
//! All tunable parameters for the VentGuard controller.
//! Values come from the defaults below, optionally overlaid by a TOML file
//! and by command-line / environment overrides in `main`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::control::policy::PolicyThresholds;
use crate::error::ConfigError;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Vent policy ---
    /// Above this temperature (Celsius) the vent opens fully
    pub temp_high_c: f32,
    /// Below this temperature (Celsius) the vent closes
    pub temp_low_c: f32,
    /// Above this relative humidity (%) the vent opens fully in the normal band
    pub humidity_high_pct: f32,
    /// Seconds without motion before the room is treated as empty
    pub no_motion_secs: u64,
    /// Vent angle when no rule fires
    pub default_angle: u8,

    // --- Timing ---
    /// Control loop cadence (milliseconds)
    pub loop_interval_ms: u64,
    /// Minimum spacing between autonomous vent changes (seconds)
    pub policy_min_interval_secs: u64,
    /// Telemetry publish interval (seconds)
    pub telemetry_interval_secs: u64,
    /// Gas polling interval when no edge event arrives (milliseconds)
    pub gas_poll_interval_ms: u64,
    /// Minimum quiet interval between counted motion events (milliseconds)
    pub motion_debounce_ms: u64,
    /// Seconds each display view stays on screen
    pub display_period_secs: u32,

    // --- Actuator ---
    /// Servo settle time for autonomous moves (milliseconds)
    pub policy_settle_ms: u64,
    /// Servo settle time for operator moves (milliseconds)
    pub override_settle_ms: u64,
    /// Vent angle applied at startup
    pub initial_angle: u8,

    // --- Sensing ---
    /// Consecutive climate read failures tolerated before DEGRADED
    pub sensor_failure_threshold: u32,
    /// MQ-2 heater warm-up before the first gas read (seconds)
    pub gas_warmup_secs: u64,
    /// PIR stabilisation delay at startup (seconds)
    pub pir_settle_secs: u64,

    // --- Service ---
    /// Listen address of the override API
    pub bind_addr: String,
    /// Channel name passed to the telemetry collaborator
    pub telemetry_channel: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Policy
            temp_high_c: 26.0,
            temp_low_c: 18.0,
            humidity_high_pct: 70.0,
            no_motion_secs: 600, // 10 min
            default_angle: 90,

            // Timing
            loop_interval_ms: 1000, // 1 Hz
            policy_min_interval_secs: 10,
            telemetry_interval_secs: 5,
            gas_poll_interval_ms: 500,
            motion_debounce_ms: 1000,
            display_period_secs: 5,

            // Actuator (SG90)
            policy_settle_ms: 300,
            override_settle_ms: 500,
            initial_angle: 90,

            // Sensing
            sensor_failure_threshold: 5,
            gas_warmup_secs: 10,
            pir_settle_secs: 2,

            // Service
            bind_addr: "0.0.0.0:5500".into(),
            telemetry_channel: "smart-vent".into(),
        }
    }
}

impl SystemConfig {
    /// Load a TOML file over the defaults.  Missing keys keep their default.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject out-of-range values rather than clamping them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temp_low_c >= self.temp_high_c {
            return Err(ConfigError::ValidationFailed(
                "temp_low_c must be below temp_high_c",
            ));
        }
        if !(0.0..=100.0).contains(&self.humidity_high_pct) {
            return Err(ConfigError::ValidationFailed(
                "humidity_high_pct must be within 0..=100",
            ));
        }
        if self.default_angle > 180 || self.initial_angle > 180 {
            return Err(ConfigError::ValidationFailed(
                "vent angles must be within 0..=180",
            ));
        }
        if self.loop_interval_ms == 0
            || self.gas_poll_interval_ms == 0
            || self.telemetry_interval_secs == 0
            || self.display_period_secs == 0
        {
            return Err(ConfigError::ValidationFailed("intervals must be non-zero"));
        }
        if self.policy_settle_ms >= self.loop_interval_ms {
            return Err(ConfigError::ValidationFailed(
                "policy_settle_ms must be shorter than loop_interval_ms",
            ));
        }
        Ok(())
    }

    pub fn thresholds(&self) -> PolicyThresholds {
        PolicyThresholds {
            temp_high_c: self.temp_high_c,
            temp_low_c: self.temp_low_c,
            humidity_high_pct: self.humidity_high_pct,
            no_motion: Duration::from_secs(self.no_motion_secs),
            default_angle: self.default_angle,
        }
    }

    pub fn loop_interval(&self) -> Duration {
        Duration::from_millis(self.loop_interval_ms)
    }

    pub fn gas_poll_interval(&self) -> Duration {
        Duration::from_millis(self.gas_poll_interval_ms)
    }

    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_secs(self.telemetry_interval_secs)
    }

    pub fn motion_debounce(&self) -> Duration {
        Duration::from_millis(self.motion_debounce_ms)
    }
}
