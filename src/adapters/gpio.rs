//! `embedded-hal` 1.0 adapters.
//!
//! Wrap any board crate's pins in the port traits.  Nothing here knows about
//! a specific SoC.  The host binary runs on [`SimBoard`](super::sim::SimBoard);
//! a Pi build constructs these around its HAL pins instead.  The DHT11
//! needs a bit-banged single-wire driver and has no adapter here.
//!
//! | Adapter          | Port                | Wiring                          |
//! |------------------|---------------------|---------------------------------|
//! | `PinMotionSensor`| `MotionSensorPort`  | PIR OUT, active-high            |
//! | `PinGasSensor`   | `GasSensorPort`     | MQ-2 DO, active-low, no IRQs    |
//! | `PinAlarm`       | `AlarmPort`         | LED + buzzer, active-high       |
//! | `PwmServo`       | `ServoPort`         | SG90 on a 50 Hz PWM channel     |

use embedded_hal::digital::{Error as _, InputPin, OutputPin, PinState};
use embedded_hal::pwm::{Error as _, SetDutyCycle};
use log::warn;

use crate::app::ports::{
    AlarmPort, Edge, GasCallback, GasSensorPort, MotionSensorPort, ServoPort,
};
use crate::control::actuator::Angle;
use crate::error::{DriverError, SensorError, SubscriptionError};

// ── Servo timing (SG90) ───────────────────────────────────────

/// PWM period at 50 Hz.
pub const SERVO_PERIOD_US: u16 = 20_000;
/// Pulse width at 0°.
pub const SERVO_MIN_PULSE_US: u16 = 500;
/// Pulse width at 180°.
pub const SERVO_MAX_PULSE_US: u16 = 2_400;

/// Linear map of `angle` onto the SG90 pulse range.
pub fn pulse_width_us(angle: Angle) -> u16 {
    let span = u32::from(SERVO_MAX_PULSE_US - SERVO_MIN_PULSE_US);
    let offset = span * u32::from(angle.degrees()) / 180;
    // offset <= span, so the sum fits.
    SERVO_MIN_PULSE_US + offset as u16
}

// ── Inputs ────────────────────────────────────────────────────

pub struct PinMotionSensor<P> {
    pin: P,
}

impl<P: InputPin> PinMotionSensor<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }
}

impl<P: InputPin + Send> MotionSensorPort for PinMotionSensor<P> {
    fn read_motion(&mut self) -> Result<bool, SensorError> {
        self.pin
            .is_high()
            .map_err(|e| SensorError::Gpio(format!("{:?}", e.kind())))
    }
}

/// MQ-2 digital output.  Plain `InputPin`s cannot raise edge events, so
/// every subscription is refused and the watcher polls.
pub struct PinGasSensor<P> {
    pin: P,
}

impl<P: InputPin> PinGasSensor<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }
}

impl<P: InputPin + Send> GasSensorPort for PinGasSensor<P> {
    fn read_gas(&mut self) -> Result<bool, SensorError> {
        self.pin
            .is_low()
            .map_err(|e| SensorError::Gpio(format!("{:?}", e.kind())))
    }

    fn subscribe(&mut self, edge: Edge, _on_change: GasCallback) -> Result<(), SubscriptionError> {
        Err(SubscriptionError::Unsupported(edge))
    }

    fn unsubscribe(&mut self) {}
}

// ── Outputs ───────────────────────────────────────────────────

/// Indicator LED and buzzer switched together.
pub struct PinAlarm<L, B> {
    led: L,
    buzzer: B,
}

impl<L: OutputPin, B: OutputPin> PinAlarm<L, B> {
    pub fn new(led: L, buzzer: B) -> Self {
        Self { led, buzzer }
    }
}

impl<L: OutputPin + Send, B: OutputPin + Send> AlarmPort for PinAlarm<L, B> {
    fn set_alarm(&mut self, on: bool) -> Result<(), DriverError> {
        let level = PinState::from(on);
        let led = self
            .led
            .set_state(level)
            .map_err(|e| DriverError::Gpio(format!("LED: {:?}", e.kind())));
        let buzzer = self
            .buzzer
            .set_state(level)
            .map_err(|e| DriverError::Gpio(format!("buzzer: {:?}", e.kind())));
        // Try both outputs before reporting.
        led.and(buzzer)
    }
}

pub struct PwmServo<P> {
    channel: P,
    released: bool,
}

impl<P: SetDutyCycle> PwmServo<P> {
    /// `channel` must already be configured for a 50 Hz period.
    pub fn new(channel: P) -> Self {
        Self {
            channel,
            released: false,
        }
    }
}

impl<P: SetDutyCycle + Send> ServoPort for PwmServo<P> {
    fn set_angle(&mut self, angle: Angle) -> Result<(), DriverError> {
        if self.released {
            return Err(DriverError::Disconnected);
        }
        self.channel
            .set_duty_cycle_fraction(pulse_width_us(angle), SERVO_PERIOD_US)
            .map_err(|e| DriverError::Pwm(format!("{:?}", e.kind())))
    }

    fn stop_pulse(&mut self) -> Result<(), DriverError> {
        self.channel
            .set_duty_cycle_fully_off()
            .map_err(|e| DriverError::Pwm(format!("{:?}", e.kind())))
    }

    fn release(&mut self) {
        if let Err(e) = self.channel.set_duty_cycle_fully_off() {
            warn!("PWM off at release failed: {:?}", e.kind());
        }
        self.released = true;
    }
}
