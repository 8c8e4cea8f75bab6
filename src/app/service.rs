//! Override service: operator commands routed to the actuator.
//!
//! [`OverrideService`] runs [`OverrideCommand`]s, already range-checked by
//! their constructors, through the shared [`ActuatorController`] with
//! [`Source::Override`].  It holds no lock of its own, so any number of
//! handlers may call it concurrently with the control loop; the controller
//! serialises the physical moves.
//!
//! ```text
//!  HTTP handler ──▶ OverrideService ──(Override)──▶ ActuatorController
//!  ControlLoop ───────────────────────(Policy)───▶        │
//!                                                         ▼
//!                                                     ServoPort
//! ```

use std::sync::Arc;

use log::info;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::control::actuator::{ActuatorController, Angle, Source};
use crate::error::ActuatorError;

use super::commands::{OverrideCommand, Preset, SweepRequest};

/// Result of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepOutcome {
    /// `false` if the sweep was cancelled before its last step.
    pub completed: bool,
    /// Angles actually written.
    pub steps: usize,
    pub last_angle: Option<Angle>,
}

/// What an executed [`OverrideCommand`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverrideOutcome {
    Moved(Angle),
    Preset(Preset),
    Swept {
        request: SweepRequest,
        outcome: SweepOutcome,
    },
}

pub struct OverrideService {
    actuator: Arc<ActuatorController>,
}

impl OverrideService {
    pub fn new(actuator: Arc<ActuatorController>) -> Self {
        Self { actuator }
    }

    pub fn actuator(&self) -> &Arc<ActuatorController> {
        &self.actuator
    }

    /// Run a validated operator command.  `cancel` only matters for sweeps.
    pub async fn execute(
        &self,
        command: OverrideCommand,
        cancel: &CancellationToken,
    ) -> Result<OverrideOutcome, ActuatorError> {
        match command {
            OverrideCommand::SetAngle(angle) => {
                self.actuator
                    .apply(angle, "manual override", Source::Override)
                    .await?;
                Ok(OverrideOutcome::Moved(angle))
            }
            OverrideCommand::Preset(preset) => {
                self.actuator
                    .apply(preset.angle(), format!("preset: {}", preset.name()), Source::Override)
                    .await?;
                Ok(OverrideOutcome::Preset(preset))
            }
            OverrideCommand::Sweep(request) => {
                let outcome = self.sweep(request, cancel).await?;
                Ok(OverrideOutcome::Swept { request, outcome })
            }
        }
    }

    /// Step through `request`, waiting `delay` between steps.
    ///
    /// Each step takes the actuator lock only for its own move, so policy
    /// moves and other overrides can interleave between steps.  `cancel`
    /// ends the sweep between steps; a step already in flight completes.
    pub async fn sweep(
        &self,
        request: SweepRequest,
        cancel: &CancellationToken,
    ) -> Result<SweepOutcome, ActuatorError> {
        let angles = request.angles();
        info!(
            "Sweep {} -> {} step {} delay {:?} ({} steps)",
            request.start,
            request.end,
            request.step,
            request.delay,
            angles.len()
        );

        let mut outcome = SweepOutcome {
            completed: false,
            steps: 0,
            last_angle: None,
        };
        for (i, angle) in angles.iter().copied().enumerate() {
            if cancel.is_cancelled() {
                info!("Sweep cancelled after {} steps", outcome.steps);
                return Ok(outcome);
            }
            self.actuator.apply(angle, "sweep", Source::Override).await?;
            outcome.steps += 1;
            outcome.last_angle = Some(angle);

            let last = i + 1 == angles.len();
            if !last && !request.delay.is_zero() {
                tokio::select! {
                    () = cancel.cancelled() => {
                        info!("Sweep cancelled after {} steps", outcome.steps);
                        return Ok(outcome);
                    }
                    () = sleep(request.delay) => {}
                }
            }
        }
        outcome.completed = true;
        Ok(outcome)
    }
}
