//! Mock adapters and a wired-up rig for integration tests.
//!
//! Hardware comes from [`SimBoard`]; the outer-ring collaborators (event
//! sink, telemetry, wall clock) are recorded here so tests can assert on
//! the full history without touching real GPIO/PWM registers.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use ventguard::adapters::sim::SimBoard;
use ventguard::api::ApiState;
use ventguard::app::events::AppEvent;
use ventguard::app::ports::{ClockPort, EventSink, ServoPort, TelemetryPort, WallTime};
use ventguard::app::service::OverrideService;
use ventguard::config::SystemConfig;
use ventguard::control::actuator::{ActuatorController, Angle};
use ventguard::control::cycle::{ControlLoop, LoopParts};
use ventguard::display::DisplayRotator;
use ventguard::error::{DriverError, TelemetryError};
use ventguard::sensors::SensorSampler;
use ventguard::sensors::gas::GasWatcher;
use ventguard::sensors::motion::MotionTracker;
use ventguard::telemetry::{TelemetryPayload, TelemetryPublisher};

// ── Event sink ────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingSink(pub Arc<Mutex<Vec<AppEvent>>>);

impl RecordingSink {
    pub fn events(&self) -> Vec<AppEvent> {
        self.0.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

// ── Telemetry ─────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingTelemetry {
    pub sent: Mutex<Vec<(String, TelemetryPayload)>>,
}

#[async_trait]
impl TelemetryPort for RecordingTelemetry {
    async fn publish(&self, channel: &str, payload: &TelemetryPayload) -> Result<(), TelemetryError> {
        self.sent.lock().unwrap().push((channel.to_string(), *payload));
        Ok(())
    }
}

// ── Clock ─────────────────────────────────────────────────────

/// Wall clock the test can set.
#[derive(Clone)]
pub struct TestClock(pub Arc<Mutex<WallTime>>);

impl TestClock {
    pub fn at_second(second: u8) -> Self {
        Self(Arc::new(Mutex::new(WallTime {
            hour: 12,
            minute: 0,
            second,
        })))
    }

    pub fn set_second(&self, second: u8) {
        self.0.lock().unwrap().second = second;
    }
}

impl ClockPort for TestClock {
    fn wall_time(&self) -> WallTime {
        *self.0.lock().unwrap()
    }
}

// ── Overlap-detecting servo ───────────────────────────────────

/// Flags a write that starts while a previous move is still in flight
/// (between `set_angle` and `stop_pulse`).
#[derive(Clone, Default)]
pub struct OverlapServo {
    pub in_flight: Arc<AtomicBool>,
    pub overlaps: Arc<AtomicUsize>,
    pub writes: Arc<Mutex<Vec<Angle>>>,
}

impl ServoPort for OverlapServo {
    fn set_angle(&mut self, angle: Angle) -> Result<(), DriverError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.writes.lock().unwrap().push(angle);
        Ok(())
    }

    fn stop_pulse(&mut self) -> Result<(), DriverError> {
        self.in_flight.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn release(&mut self) {}
}

// ── Rig ───────────────────────────────────────────────────────

pub struct Rig {
    pub board: SimBoard,
    pub config: SystemConfig,
    pub control: ControlLoop,
    pub actuator: Arc<ActuatorController>,
    pub gas: Arc<GasWatcher>,
    pub sink: RecordingSink,
    pub telemetry: Arc<RecordingTelemetry>,
    pub clock: TestClock,
    pub cancel: CancellationToken,
}

/// Test config: no startup waits.
pub fn fast_config() -> SystemConfig {
    SystemConfig {
        gas_warmup_secs: 0,
        pir_settle_secs: 0,
        ..SystemConfig::default()
    }
}

pub fn rig() -> Rig {
    rig_with(SimBoard::new(), fast_config())
}

pub fn rig_with(board: SimBoard, config: SystemConfig) -> Rig {
    let actuator = Arc::new(ActuatorController::new(Box::new(board.servo()), &config));
    let gas = Arc::new(GasWatcher::new(
        Box::new(board.gas_sensor()),
        Box::new(board.alarm()),
        config.gas_poll_interval(),
    ));
    let sampler = SensorSampler::new(
        Box::new(board.climate_sensor()),
        Box::new(board.motion_sensor()),
        Arc::clone(&gas),
        MotionTracker::new(Instant::now(), config.motion_debounce()),
        config.sensor_failure_threshold,
    );
    let sink = RecordingSink::default();
    let telemetry = Arc::new(RecordingTelemetry::default());
    let clock = TestClock::at_second(0);
    let control = ControlLoop::new(
        LoopParts {
            sampler,
            actuator: Arc::clone(&actuator),
            display: DisplayRotator::new(Box::new(board.display()), config.display_period_secs),
            telemetry: TelemetryPublisher::new(
                telemetry.clone(),
                &config.telemetry_channel,
                config.telemetry_interval(),
            ),
            clock: Box::new(clock.clone()),
            sink: Box::new(sink.clone()),
        },
        &config,
    );
    Rig {
        board,
        config,
        control,
        actuator,
        gas,
        sink,
        telemetry,
        clock,
        cancel: CancellationToken::new(),
    }
}

impl Rig {
    pub fn api_state(&self) -> ApiState {
        ApiState {
            overrides: Arc::new(OverrideService::new(Arc::clone(&self.actuator))),
            gas: Arc::clone(&self.gas),
            status: self.control.status(),
            shutdown: self.cancel.clone(),
        }
    }
}
