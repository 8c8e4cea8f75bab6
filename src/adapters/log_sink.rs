//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade.  The binary routes that to stderr through
//! `tracing-subscriber`.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] on one line.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { angle } => {
                info!("START | vent={angle}");
            }
            AppEvent::VentChanged {
                from,
                to,
                reason,
                source,
            } => {
                info!("VENT  | {from} -> {to} | {reason} | {source:?}");
            }
            AppEvent::VentChangeFailed { to, error: err } => {
                error!("VENT  | move to {to} failed: {err}");
            }
            AppEvent::SensorDegraded {
                consecutive_failures,
            } => {
                warn!("SENSE | degraded after {consecutive_failures} failed climate reads");
            }
            AppEvent::SensorRecovered => {
                info!("SENSE | climate reads recovered");
            }
            AppEvent::Shutdown => {
                info!("STOP  | shutdown complete");
            }
        }
    }
}
