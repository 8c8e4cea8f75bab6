//! Vent positioning policy.
//!
//! A pure decision function: given the latest sensor snapshot and the time
//! of the last counted motion event, pick a target angle and a reason.
//! Rules are applied in a fixed order and a later rule overwrites the
//! result of an earlier one:
//!
//! | # | Condition                                   | Angle | Reason                    |
//! |---|---------------------------------------------|-------|---------------------------|
//! | 1 | gas detected                                | 180   | gas/smoke detected (final)|
//! | 2 | temp > high / temp < low                    | 180/0 | high temp / low temp      |
//! | 3 | low ≤ temp ≤ high and humidity > high       | 180   | high humidity             |
//! | 4 | no motion now and none for > `no_motion`    | 180   | ventilating (no motion)   |
//!
//! Rule 4 can reopen a vent that rule 2 closed for low temperature.
//! Physical actuation is the caller's job.

use core::fmt;
use std::time::Duration;

use tokio::time::Instant;

use crate::control::actuator::Angle;
use crate::sensors::SensorSnapshot;

/// Thresholds the rules compare against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyThresholds {
    pub temp_high_c: f32,
    pub temp_low_c: f32,
    pub humidity_high_pct: f32,
    pub no_motion: Duration,
    pub default_angle: u8,
}

impl Default for PolicyThresholds {
    fn default() -> Self {
        Self {
            temp_high_c: 26.0,
            temp_low_c: 18.0,
            humidity_high_pct: 70.0,
            no_motion: Duration::from_secs(600),
            default_angle: 90,
        }
    }
}

/// Why the policy chose an angle.  Carries the triggering value for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VentReason {
    Gas,
    HighTemperature(f32),
    LowTemperature(f32),
    HighHumidity(f32),
    NoMotion { idle_mins: u64 },
    Normal,
}

impl fmt::Display for VentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gas => write!(f, "gas/smoke detected"),
            Self::HighTemperature(t) => write!(f, "high temp ({t:.1}C)"),
            Self::LowTemperature(t) => write!(f, "low temp ({t:.1}C)"),
            Self::HighHumidity(h) => write!(f, "high humidity ({h:.0}%)"),
            Self::NoMotion { idle_mins } => {
                write!(f, "ventilating (no motion {idle_mins}min)")
            }
            Self::Normal => write!(f, "normal ventilation"),
        }
    }
}

/// Output of [`VentPolicy::decide`].  Never stored beyond one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub angle: Angle,
    pub reason: VentReason,
}

/// The rule set, parameterised by its thresholds.
#[derive(Debug, Clone, Copy, Default)]
pub struct VentPolicy {
    thresholds: PolicyThresholds,
}

impl VentPolicy {
    pub fn new(thresholds: PolicyThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &PolicyThresholds {
        &self.thresholds
    }

    /// Decide the vent angle for `snapshot`.  Deterministic: no clock reads,
    /// no state.
    pub fn decide(&self, snapshot: &SensorSnapshot, last_motion: Instant, now: Instant) -> Decision {
        let th = &self.thresholds;

        if snapshot.gas {
            return Decision {
                angle: Angle::MAX,
                reason: VentReason::Gas,
            };
        }

        let temp = snapshot.temperature;
        let mut decision = Decision {
            angle: Angle::saturating_u8(th.default_angle),
            reason: VentReason::Normal,
        };

        if temp > th.temp_high_c {
            decision = Decision {
                angle: Angle::MAX,
                reason: VentReason::HighTemperature(temp),
            };
        } else if temp < th.temp_low_c {
            decision = Decision {
                angle: Angle::MIN,
                reason: VentReason::LowTemperature(temp),
            };
        }

        let normal_band = temp >= th.temp_low_c && temp <= th.temp_high_c;
        if normal_band && snapshot.humidity > th.humidity_high_pct {
            decision = Decision {
                angle: Angle::MAX,
                reason: VentReason::HighHumidity(snapshot.humidity),
            };
        }

        let idle = now.saturating_duration_since(last_motion);
        if !snapshot.motion && idle > th.no_motion {
            decision = Decision {
                angle: Angle::MAX,
                reason: VentReason::NoMotion {
                    idle_mins: idle.as_secs() / 60,
                },
            };
        }

        decision
    }
}
