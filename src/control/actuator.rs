//! Vent actuator controller.
//!
//! [`ActuatorController`] is the only owner of the servo and the single
//! arbitration point between the autonomous policy and operator overrides.
//!
//! ```text
//!  ControlLoop ──(Policy)──┐
//!                          ├──▶ servo lock ──▶ ServoPort ──▶ settle ──▶ ActuatorState (watch)
//!  OverrideService ─(Override)┘
//! ```
//!
//! ## Exclusion contract
//!
//! Every physical move holds the servo lock from the driver write until the
//! settle time has elapsed and the pulse is stopped, so two moves never
//! overlap.  Readers never take that lock: they read the last published
//! [`ActuatorState`] from a `watch` channel, which always holds a complete
//! angle/reason/source triple.
//!
//! ## Rate limit
//!
//! `Source::Policy` writes are accepted at most once per
//! `policy_min_interval` and only when the angle actually changes.
//! `Source::Override` writes take effect immediately but still queue behind
//! any in-flight move.

use core::fmt;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use log::{info, warn};
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::time::{Instant, sleep};

use crate::app::ports::ServoPort;
use crate::config::SystemConfig;
use crate::error::{ActuatorError, DriverError};
use crate::util::lock;

// ───────────────────────────────────────────────────────────────
// Angle
// ───────────────────────────────────────────────────────────────

/// Logical vent position in degrees, always within `0..=180`.
/// 0 = closed, 90 = half open, 180 = fully open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Angle(u8);

impl Angle {
    pub const MIN: Angle = Angle(0);
    pub const CENTER: Angle = Angle(90);
    pub const MAX: Angle = Angle(180);

    /// Clamp any integer into range.  Used for internally computed angles.
    pub fn saturating(degrees: i64) -> Self {
        Self(degrees.clamp(0, 180) as u8)
    }

    pub const fn saturating_u8(degrees: u8) -> Self {
        if degrees > 180 { Self(180) } else { Self(degrees) }
    }

    pub const fn degrees(self) -> u8 {
        self.0
    }
}

/// Range check for externally sourced angles.  Out-of-range values are
/// rejected, not clamped.
impl TryFrom<i64> for Angle {
    type Error = ActuatorError;

    fn try_from(degrees: i64) -> Result<Self, Self::Error> {
        if (0..=180).contains(&degrees) {
            Ok(Self(degrees as u8))
        } else {
            Err(ActuatorError::InvalidAngle(degrees))
        }
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\u{00b0}", self.0)
    }
}

// ───────────────────────────────────────────────────────────────
// Actuator state
// ───────────────────────────────────────────────────────────────

/// Who asked for a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Policy,
    Override,
}

/// The one process-wide record of where the vent is and why.
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatorState {
    pub angle: Angle,
    pub last_changed: Instant,
    pub reason: String,
    pub source: Source,
}

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

struct ServoSlot {
    driver: Box<dyn ServoPort>,
    released: bool,
}

/// Serialised, rate-limited writer of the vent servo.
pub struct ActuatorController {
    servo: Mutex<ServoSlot>,
    state: watch::Sender<ActuatorState>,
    /// Time of the last accepted policy move.  Written under the servo lock.
    last_policy_change: StdMutex<Option<Instant>>,
    policy_min_interval: Duration,
    policy_settle: Duration,
    override_settle: Duration,
}

impl ActuatorController {
    /// Wrap `driver`.  The published state starts at `initial` without
    /// moving the servo; call [`home`](Self::home) to drive it there.
    pub fn new(driver: Box<dyn ServoPort>, config: &SystemConfig) -> Self {
        let initial = ActuatorState {
            angle: Angle::saturating_u8(config.initial_angle),
            last_changed: Instant::now(),
            reason: "initial state".into(),
            source: Source::Policy,
        };
        let (state, _) = watch::channel(initial);
        Self {
            servo: Mutex::new(ServoSlot {
                driver,
                released: false,
            }),
            state,
            last_policy_change: StdMutex::new(None),
            policy_min_interval: Duration::from_secs(config.policy_min_interval_secs),
            policy_settle: Duration::from_millis(config.policy_settle_ms),
            override_settle: Duration::from_millis(config.override_settle_ms),
        }
    }

    /// Drive the servo to the published initial angle.  Does not count
    /// against the policy rate limit.
    pub async fn home(&self) -> Result<(), ActuatorError> {
        let mut slot = self.servo.lock().await;
        let current = self.state.borrow().clone();
        self.move_locked(&mut slot, current.angle, current.reason, Source::Policy)
            .await
    }

    /// Move the vent to `angle`.
    ///
    /// Policy requests for the current angle succeed without touching the
    /// servo; policy requests inside the rate-limit window fail with
    /// [`ActuatorError::RateLimited`].  On driver failure the published
    /// state is left unchanged.
    pub async fn apply(
        &self,
        angle: Angle,
        reason: impl Into<String>,
        source: Source,
    ) -> Result<(), ActuatorError> {
        let mut slot = self.servo.lock().await;

        if source == Source::Policy {
            if self.state.borrow().angle == angle {
                return Ok(());
            }
            let now = Instant::now();
            if let Some(retry_in) = self.policy_retry_in(now) {
                return Err(ActuatorError::RateLimited { retry_in });
            }
        }

        let started = Instant::now();
        self.move_locked(&mut slot, angle, reason.into(), source)
            .await?;
        if source == Source::Policy {
            *lock(&self.last_policy_change) = Some(started);
        }
        Ok(())
    }

    /// Whether a policy move would currently be accepted by the rate limit.
    pub fn policy_window_open(&self, now: Instant) -> bool {
        self.policy_retry_in(now).is_none()
    }

    /// Consistent copy of the current state.
    pub fn state(&self) -> ActuatorState {
        self.state.borrow().clone()
    }

    pub fn angle(&self) -> Angle {
        self.state.borrow().angle
    }

    /// Receiver that is notified after every completed move.
    pub fn subscribe(&self) -> watch::Receiver<ActuatorState> {
        self.state.subscribe()
    }

    /// Wait for any in-flight move, then release the servo for good.
    pub async fn release(&self) {
        let mut slot = self.servo.lock().await;
        if !slot.released {
            slot.driver.release();
            slot.released = true;
            info!("Servo released at {}", self.angle());
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn policy_retry_in(&self, now: Instant) -> Option<Duration> {
        let last = (*lock(&self.last_policy_change))?;
        let elapsed = now.saturating_duration_since(last);
        (elapsed < self.policy_min_interval).then(|| self.policy_min_interval - elapsed)
    }

    /// Perform one physical move.  Caller holds the servo lock.
    async fn move_locked(
        &self,
        slot: &mut ServoSlot,
        angle: Angle,
        reason: String,
        source: Source,
    ) -> Result<(), ActuatorError> {
        if slot.released {
            return Err(DriverError::Disconnected.into());
        }

        slot.driver.set_angle(angle)?;

        let settle = match source {
            Source::Policy => self.policy_settle,
            Source::Override => self.override_settle,
        };
        sleep(settle).await;

        if let Err(e) = slot.driver.stop_pulse() {
            warn!("Servo pulse stop failed after move to {}: {}", angle, e);
        }

        let previous = self.state.send_replace(ActuatorState {
            angle,
            last_changed: Instant::now(),
            reason,
            source,
        });
        if previous.angle != angle {
            info!("Vent {} -> {} ({:?})", previous.angle, angle, source);
        }
        Ok(())
    }
}
