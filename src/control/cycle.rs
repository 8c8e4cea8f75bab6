//! The autonomous control loop.
//!
//! One [`ControlLoop::tick`] per second:
//!
//! ```text
//!  gas poll (if quiet) → sample → [valid?] → policy (if window open) → apply
//!                                   │                                    │
//!                                   └── degraded display                 ▼
//!                                       display rotate → telemetry (5 s) → log
//! ```
//!
//! Every piece of loop state (tick counter, degraded flag, telemetry
//! timestamp, failure counter) lives in the loop or in components it owns.
//! The actuator is shared with the override service and is the only thing
//! the loop does not own outright.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior, interval, sleep};
use tokio_util::sync::CancellationToken;

use crate::app::events::AppEvent;
use crate::app::ports::{ClockPort, EventSink};
use crate::config::SystemConfig;
use crate::control::actuator::{ActuatorController, Angle, Source};
use crate::control::policy::{Decision, VentPolicy};
use crate::display::{DisplayMode, DisplayRotator, StatusView};
use crate::error::ActuatorError;
use crate::sensors::gas::GasWatchState;
use crate::sensors::{SensorSampler, SensorSnapshot};
use crate::telemetry::TelemetryPublisher;

/// What the loop did with the actuator this tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Actuation {
    /// Snapshot invalid; previous decision retained.
    SkippedInvalid,
    /// Policy window still closed.
    RateLimited,
    /// Policy agreed with the current angle.
    Unchanged,
    Moved { from: Angle, to: Angle },
    Failed(ActuatorError),
}

/// Outcome of one tick, for logging and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub snapshot: SensorSnapshot,
    pub gas_polled: bool,
    pub decision: Option<Decision>,
    pub actuation: Actuation,
    pub display: Option<DisplayMode>,
    pub telemetry_sent: bool,
    pub degraded: bool,
}

/// Read-only status shared with the override API.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopStatus {
    pub snapshot: Option<SensorSnapshot>,
    pub degraded: bool,
}

/// Collaborators the loop owns.
pub struct LoopParts {
    pub sampler: SensorSampler,
    pub actuator: Arc<ActuatorController>,
    pub display: DisplayRotator,
    pub telemetry: TelemetryPublisher,
    pub clock: Box<dyn ClockPort>,
    pub sink: Box<dyn EventSink>,
}

pub struct ControlLoop {
    sampler: SensorSampler,
    policy: VentPolicy,
    actuator: Arc<ActuatorController>,
    display: DisplayRotator,
    telemetry: TelemetryPublisher,
    clock: Box<dyn ClockPort>,
    sink: Box<dyn EventSink>,
    status: watch::Sender<LoopStatus>,

    tick_interval: Duration,
    pir_settle: Duration,
    gas_warmup: Duration,

    tick_count: u64,
    degraded: bool,
    shut_down: bool,
}

impl ControlLoop {
    pub fn new(parts: LoopParts, config: &SystemConfig) -> Self {
        let (status, _) = watch::channel(LoopStatus::default());
        Self {
            sampler: parts.sampler,
            policy: VentPolicy::new(config.thresholds()),
            actuator: parts.actuator,
            display: parts.display,
            telemetry: parts.telemetry,
            clock: parts.clock,
            sink: parts.sink,
            status,
            tick_interval: config.loop_interval(),
            pir_settle: Duration::from_secs(config.pir_settle_secs),
            gas_warmup: Duration::from_secs(config.gas_warmup_secs),
            tick_count: 0,
            degraded: false,
            shut_down: false,
        }
    }

    /// Receiver for the latest snapshot and degraded flag.
    pub fn status(&self) -> watch::Receiver<LoopStatus> {
        self.status.subscribe()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Startup sequence: splash screen, sensor settle, gas arming, servo home.
    pub async fn startup(&mut self, cancel: &CancellationToken) {
        self.display.show_startup();
        info!("Waiting {:?} for PIR to settle", self.pir_settle);
        sleep(self.pir_settle).await;
        info!("Warming up gas sensor for {:?}", self.gas_warmup);
        sleep(self.gas_warmup).await;

        let gas_state = self.sampler.gas_watcher().start(cancel.clone());
        if gas_state == GasWatchState::Faulted {
            warn!("Gas sensor unreadable at startup, watcher will keep polling");
        }

        if let Err(e) = self.actuator.home().await {
            error!("Failed to move vent to initial position: {e}");
        }
        let angle = self.actuator.angle();
        self.sink.emit(&AppEvent::Started { angle });
        info!("System startup complete, vent at {angle}");
    }

    /// Tick every `loop_interval` until `cancel` fires, then shut down.
    ///
    /// A tick in progress when `cancel` fires is allowed to finish; its
    /// longest await is one servo settle.
    pub async fn run(&mut self, cancel: CancellationToken) {
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let report = self.tick(Instant::now()).await;
            debug!("tick {}: {:?}", self.tick_count, report.actuation);
        }
        self.shutdown().await;
    }

    /// Best-effort teardown.  Idempotent.
    pub async fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        info!("Shutting down control loop");
        self.display.show_shutdown();
        self.actuator.release().await;
        self.sampler.gas_watcher().stop();
        self.sink.emit(&AppEvent::Shutdown);
    }

    // ── One cycle ─────────────────────────────────────────────

    pub async fn tick(&mut self, now: Instant) -> TickReport {
        self.tick_count += 1;

        // 1. Gas fallback poll
        let gas_polled = self.sampler.gas_watcher().poll_if_quiet(now);

        // 2. Sample
        let snapshot = self.sampler.sample(now);
        self.track_degraded();

        // 3. Invalid snapshot: no actuation, no normal display, no telemetry
        if !snapshot.valid {
            if self.degraded {
                self.display.show_degraded();
            }
            warn!(
                "Sensor read failed, attempt {}",
                self.sampler.consecutive_failures()
            );
            self.publish_status(snapshot);
            return TickReport {
                snapshot,
                gas_polled,
                decision: None,
                actuation: Actuation::SkippedInvalid,
                display: None,
                telemetry_sent: false,
                degraded: self.degraded,
            };
        }

        // 4. Policy and actuation
        let (decision, actuation) = self.actuate(&snapshot, now).await;

        // 5. Display
        let wall = self.clock.wall_time();
        let state = self.actuator.state();
        let view = StatusView {
            temperature: snapshot.temperature,
            humidity: snapshot.humidity,
            motion: snapshot.motion,
            gas: snapshot.gas,
            angle: state.angle,
            reason: &state.reason,
        };
        let display = Some(self.display.refresh(&view, wall));

        // 6. Telemetry
        let telemetry_sent = self
            .telemetry
            .maybe_publish(&snapshot, state.angle, now)
            .is_some();

        // 7. Status line
        info!(
            "[{:02}:{:02}:{:02}] Temp: {:.1}C, Humidity: {:.0}%, Vent: {}, Gas: {}",
            wall.hour,
            wall.minute,
            wall.second,
            snapshot.temperature,
            snapshot.humidity,
            state.angle,
            snapshot.gas
        );

        self.publish_status(snapshot);
        TickReport {
            snapshot,
            gas_polled,
            decision,
            actuation,
            display,
            telemetry_sent,
            degraded: self.degraded,
        }
    }

    async fn actuate(&mut self, snapshot: &SensorSnapshot, now: Instant) -> (Option<Decision>, Actuation) {
        if !self.actuator.policy_window_open(now) {
            return (None, Actuation::RateLimited);
        }

        let last_motion = self.sampler.motion_history().last_motion_time;
        let decision = self.policy.decide(snapshot, last_motion, now);
        let from = self.actuator.angle();
        if decision.angle == from {
            return (Some(decision), Actuation::Unchanged);
        }

        let reason = decision.reason.to_string();
        info!("Adjusting vent: {from} -> {} ({reason})", decision.angle);
        let actuation = match self
            .actuator
            .apply(decision.angle, reason.clone(), Source::Policy)
            .await
        {
            Ok(()) => {
                self.sink.emit(&AppEvent::VentChanged {
                    from,
                    to: decision.angle,
                    reason,
                    source: Source::Policy,
                });
                Actuation::Moved {
                    from,
                    to: decision.angle,
                }
            }
            Err(ActuatorError::RateLimited { .. }) => Actuation::RateLimited,
            Err(e) => {
                error!("Vent move to {} failed: {e}", decision.angle);
                self.sink.emit(&AppEvent::VentChangeFailed {
                    to: decision.angle,
                    error: e.to_string(),
                });
                Actuation::Failed(e)
            }
        };
        (Some(decision), actuation)
    }

    fn track_degraded(&mut self) {
        let degraded = self.sampler.is_degraded();
        if degraded == self.degraded {
            return;
        }
        self.degraded = degraded;
        if degraded {
            self.sink.emit(&AppEvent::SensorDegraded {
                consecutive_failures: self.sampler.consecutive_failures(),
            });
        } else {
            self.sink.emit(&AppEvent::SensorRecovered);
        }
    }

    fn publish_status(&self, snapshot: SensorSnapshot) {
        self.status.send_replace(LoopStatus {
            snapshot: Some(snapshot),
            degraded: self.degraded,
        });
    }
}
