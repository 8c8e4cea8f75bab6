//! Telemetry adapter that writes each payload to the log.
//!
//! Stands in for a cloud pub/sub client: same port, same JSON body.

use async_trait::async_trait;
use log::info;

use crate::app::ports::TelemetryPort;
use crate::error::TelemetryError;
use crate::telemetry::TelemetryPayload;

#[derive(Debug, Default)]
pub struct LogPublisher;

#[async_trait]
impl TelemetryPort for LogPublisher {
    async fn publish(&self, channel: &str, payload: &TelemetryPayload) -> Result<(), TelemetryError> {
        let body = payload.to_json()?;
        info!("PUB   | {channel} | {body}");
        Ok(())
    }
}
