//! Simulated board for host runs and tests.
//!
//! A [`SimBoard`] is one shared bag of pin levels.  Hand its port views to
//! the domain, then drive inputs and inspect outputs from the outside:
//!
//! ```text
//!  test ── set_gas(true) ──▶ SimBoard ──▶ SimGas callbacks ──▶ GasWatcher
//!  test ◀─ servo_angle() ─── SimBoard ◀── SimServo ◀────────── ActuatorController
//! ```

use std::sync::{Arc, Mutex};

use log::debug;

use crate::app::ports::{
    AlarmPort, ClimateReading, ClimateSensorPort, DisplayPort, Edge, GasCallback, GasSensorPort,
    MotionSensorPort, ServoPort,
};
use crate::control::actuator::Angle;
use crate::error::{DriverError, SensorError, SubscriptionError};
use crate::util::lock;

struct BoardState {
    climate: Option<ClimateReading>,
    motion: bool,
    motion_fault: bool,
    gas: bool,
    gas_fault: bool,
    refused_edges: Vec<Edge>,
    subscription: Option<(Edge, GasCallback)>,
    servo_angle: Option<Angle>,
    servo_pulsing: bool,
    servo_released: bool,
    servo_fault: bool,
    servo_writes: Vec<Angle>,
    alarm: bool,
    display: [String; 2],
}

impl Default for BoardState {
    fn default() -> Self {
        Self {
            climate: Some(ClimateReading {
                temperature_c: 22.0,
                humidity_pct: 45.0,
            }),
            motion: false,
            motion_fault: false,
            gas: false,
            gas_fault: false,
            refused_edges: Vec::new(),
            subscription: None,
            servo_angle: None,
            servo_pulsing: false,
            servo_released: false,
            servo_fault: false,
            servo_writes: Vec::new(),
            alarm: false,
            display: [String::new(), String::new()],
        }
    }
}

#[derive(Clone, Default)]
pub struct SimBoard {
    state: Arc<Mutex<BoardState>>,
}

impl SimBoard {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Port views ────────────────────────────────────────────

    pub fn climate_sensor(&self) -> SimClimate {
        SimClimate(self.clone())
    }

    pub fn motion_sensor(&self) -> SimMotion {
        SimMotion(self.clone())
    }

    pub fn gas_sensor(&self) -> SimGas {
        SimGas(self.clone())
    }

    pub fn servo(&self) -> SimServo {
        SimServo(self.clone())
    }

    pub fn alarm(&self) -> SimAlarm {
        SimAlarm(self.clone())
    }

    pub fn display(&self) -> SimDisplay {
        SimDisplay(self.clone())
    }

    // ── Inputs ────────────────────────────────────────────────

    /// `None` makes every climate read fail.
    pub fn set_climate(&self, reading: Option<ClimateReading>) {
        lock(&self.state).climate = reading;
    }

    pub fn set_temperature_humidity(&self, temperature_c: f32, humidity_pct: f32) {
        self.set_climate(Some(ClimateReading {
            temperature_c,
            humidity_pct,
        }));
    }

    pub fn set_motion(&self, motion: bool) {
        lock(&self.state).motion = motion;
    }

    pub fn set_motion_fault(&self, fault: bool) {
        lock(&self.state).motion_fault = fault;
    }

    /// Change the gas level and fire the subscribed callback if the edge
    /// matches.  The output is active-low, so gas appearing is a falling
    /// edge.
    pub fn set_gas(&self, detected: bool) {
        let callback = {
            let mut s = lock(&self.state);
            if s.gas == detected {
                return;
            }
            s.gas = detected;
            let edge = if detected { Edge::Falling } else { Edge::Rising };
            s.subscription
                .as_ref()
                .filter(|(armed, _)| *armed == Edge::Both || *armed == edge)
                .map(|(_, cb)| Arc::clone(cb))
        };
        // Lock released: the callback may call back into the board.
        if let Some(cb) = callback {
            cb(detected);
        }
    }

    pub fn set_gas_fault(&self, fault: bool) {
        lock(&self.state).gas_fault = fault;
    }

    /// Make the gas driver refuse subscriptions for `edges`.
    pub fn refuse_edges(&self, edges: &[Edge]) {
        lock(&self.state).refused_edges = edges.to_vec();
    }

    pub fn set_servo_fault(&self, fault: bool) {
        lock(&self.state).servo_fault = fault;
    }

    // ── Outputs ───────────────────────────────────────────────

    pub fn servo_angle(&self) -> Option<Angle> {
        lock(&self.state).servo_angle
    }

    pub fn servo_writes(&self) -> Vec<Angle> {
        lock(&self.state).servo_writes.clone()
    }

    pub fn servo_pulsing(&self) -> bool {
        lock(&self.state).servo_pulsing
    }

    pub fn servo_released(&self) -> bool {
        lock(&self.state).servo_released
    }

    pub fn alarm_on(&self) -> bool {
        lock(&self.state).alarm
    }

    pub fn gas_subscription(&self) -> Option<Edge> {
        lock(&self.state).subscription.as_ref().map(|(edge, _)| *edge)
    }

    pub fn display_lines(&self) -> [String; 2] {
        lock(&self.state).display.clone()
    }
}

// ── Port implementations ──────────────────────────────────────

pub struct SimClimate(SimBoard);

impl ClimateSensorPort for SimClimate {
    fn read_temperature_humidity(&mut self) -> Result<ClimateReading, SensorError> {
        lock(&self.0.state).climate.ok_or(SensorError::ReadFailed)
    }
}

pub struct SimMotion(SimBoard);

impl MotionSensorPort for SimMotion {
    fn read_motion(&mut self) -> Result<bool, SensorError> {
        let s = lock(&self.0.state);
        if s.motion_fault {
            Err(SensorError::Gpio("PIR line floating".into()))
        } else {
            Ok(s.motion)
        }
    }
}

pub struct SimGas(SimBoard);

impl GasSensorPort for SimGas {
    fn read_gas(&mut self) -> Result<bool, SensorError> {
        let s = lock(&self.0.state);
        if s.gas_fault {
            Err(SensorError::ReadFailed)
        } else {
            Ok(s.gas)
        }
    }

    fn subscribe(&mut self, edge: Edge, on_change: GasCallback) -> Result<(), SubscriptionError> {
        let mut s = lock(&self.0.state);
        if s.refused_edges.contains(&edge) {
            return Err(SubscriptionError::Unsupported(edge));
        }
        s.subscription = Some((edge, on_change));
        Ok(())
    }

    fn unsubscribe(&mut self) {
        lock(&self.0.state).subscription = None;
    }
}

pub struct SimServo(SimBoard);

impl ServoPort for SimServo {
    fn set_angle(&mut self, angle: Angle) -> Result<(), DriverError> {
        let mut s = lock(&self.0.state);
        if s.servo_released {
            return Err(DriverError::Disconnected);
        }
        if s.servo_fault {
            return Err(DriverError::Pwm("simulated PWM fault".into()));
        }
        s.servo_angle = Some(angle);
        s.servo_pulsing = true;
        s.servo_writes.push(angle);
        Ok(())
    }

    fn stop_pulse(&mut self) -> Result<(), DriverError> {
        lock(&self.0.state).servo_pulsing = false;
        Ok(())
    }

    fn release(&mut self) {
        let mut s = lock(&self.0.state);
        s.servo_pulsing = false;
        s.servo_released = true;
    }
}

pub struct SimAlarm(SimBoard);

impl AlarmPort for SimAlarm {
    fn set_alarm(&mut self, on: bool) -> Result<(), DriverError> {
        lock(&self.0.state).alarm = on;
        Ok(())
    }
}

/// Keeps the two rows on the board and echoes them at debug level.
pub struct SimDisplay(SimBoard);

impl DisplayPort for SimDisplay {
    fn write_line(&mut self, row: u8, text: &str) {
        debug!("LCD[{row}] |{text}|");
        if let Some(slot) = lock(&self.0.state).display.get_mut(usize::from(row)) {
            *slot = text.to_string();
        }
    }
}
