//! Inbound operator commands.
//!
//! These represent actions requested by the outside world (the HTTP override
//! API today) that the [`OverrideService`](super::service::OverrideService)
//! validates and routes to the actuator controller.

use std::str::FromStr;
use std::time::Duration;

use crate::control::actuator::Angle;
use crate::error::ActuatorError;

/// Named vent positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    FarLeft,
    Left,
    Center,
    Right,
    FarRight,
}

impl Preset {
    pub fn angle(self) -> Angle {
        let degrees = match self {
            Self::FarLeft => 0,
            Self::Left => 45,
            Self::Center => 90,
            Self::Right => 135,
            Self::FarRight => 180,
        };
        Angle::saturating(degrees)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::FarLeft => "far_left",
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::FarRight => "far_right",
        }
    }
}

impl FromStr for Preset {
    type Err = ActuatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "far_left" => Ok(Self::FarLeft),
            "left" => Ok(Self::Left),
            "center" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            "far_right" => Ok(Self::FarRight),
            other => Err(ActuatorError::UnknownPreset(other.to_string())),
        }
    }
}

/// A validated sweep: every field is in range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepRequest {
    pub start: Angle,
    pub end: Angle,
    pub step: u8,
    pub delay: Duration,
}

impl SweepRequest {
    /// Validate raw, externally-sourced sweep parameters.
    pub fn new(start: i64, end: i64, step: i64, delay_secs: f64) -> Result<Self, ActuatorError> {
        let start = Angle::try_from(start)?;
        let end = Angle::try_from(end)?;
        if !(1..=180).contains(&step) {
            return Err(ActuatorError::InvalidSweep(format!(
                "step {step} must be within 1..=180"
            )));
        }
        let delay = Duration::try_from_secs_f64(delay_secs).map_err(|_| {
            ActuatorError::InvalidSweep(format!(
                "delay {delay_secs} must be a non-negative, representable number of seconds"
            ))
        })?;
        Ok(Self {
            start,
            end,
            step: step as u8,
            delay,
        })
    }

    /// Angles visited, in order.  Descends when `start > end`; `end` is
    /// included only when it lies on the step grid.
    pub fn angles(&self) -> Vec<Angle> {
        let (start, end, step) = (self.start.degrees(), self.end.degrees(), self.step as usize);
        if start <= end {
            (start..=end).step_by(step).map(Angle::saturating_u8).collect()
        } else {
            (end..=start)
                .rev()
                .step_by(step)
                .map(Angle::saturating_u8)
                .collect()
        }
    }
}

/// Commands that the override surface can send into the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum OverrideCommand {
    SetAngle(Angle),
    Preset(Preset),
    Sweep(SweepRequest),
}

impl OverrideCommand {
    /// Range-checked angle command.  Out-of-range values are rejected, not
    /// clamped.
    pub fn set_angle(degrees: i64) -> Result<Self, ActuatorError> {
        Ok(Self::SetAngle(Angle::try_from(degrees)?))
    }

    pub fn preset(name: &str) -> Result<Self, ActuatorError> {
        Ok(Self::Preset(name.parse()?))
    }

    pub fn sweep(start: i64, end: i64, step: i64, delay_secs: f64) -> Result<Self, ActuatorError> {
        Ok(Self::Sweep(SweepRequest::new(start, end, step, delay_secs)?))
    }
}
