//! HTTP override API.
//!
//! | Method | Path                 | Body                               |
//! |--------|----------------------|------------------------------------|
//! | GET    | `/api/get_angle`     |                                    |
//! | GET    | `/api/system_status` |                                    |
//! | POST   | `/api/set_angle`     | `{angle}`                          |
//! | POST   | `/api/preset`        | `{position}`                       |
//! | POST   | `/api/sweep`         | `{start, end, step, delay}`        |
//!
//! Missing body fields take the documented defaults.  Every response is
//! JSON and carries permissive CORS headers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::app::commands::OverrideCommand;
use crate::app::service::{OverrideOutcome, OverrideService};
use crate::control::actuator::Angle;
use crate::control::cycle::LoopStatus;
use crate::error::ActuatorError;
use crate::sensors::gas::GasWatcher;

/// Shared handler state.
#[derive(Clone)]
pub struct ApiState {
    pub overrides: Arc<OverrideService>,
    pub gas: Arc<GasWatcher>,
    pub status: watch::Receiver<LoopStatus>,
    /// Fires at process shutdown; ends in-flight sweeps.
    pub shutdown: CancellationToken,
}

// ── Wire types ────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct AngleResponse {
    pub angle: Angle,
}

#[derive(Debug, Serialize)]
pub struct SystemStatusResponse {
    pub angle: Angle,
    pub gas_detected: bool,
    pub motion_detected: bool,
    pub vent_reason: String,
    /// Climate sensor has failed more than the tolerated number of reads.
    pub degraded: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetAngleBody {
    #[serde(default = "default_angle")]
    pub angle: i64,
}

fn default_angle() -> i64 {
    90
}

#[derive(Debug, Deserialize)]
pub struct PresetBody {
    #[serde(default = "default_position")]
    pub position: String,
}

fn default_position() -> String {
    "center".into()
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SweepBody {
    pub start: i64,
    pub end: i64,
    pub step: i64,
    pub delay: f64,
}

impl Default for SweepBody {
    fn default() -> Self {
        Self {
            start: 0,
            end: 180,
            step: 10,
            delay: 0.1,
        }
    }
}

/// `{"status":"error","message":...}` with an HTTP status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "status": "error", "message": self.message });
        (self.status, Json(body)).into_response()
    }
}

impl From<ActuatorError> for ApiError {
    fn from(err: ActuatorError) -> Self {
        let status = match err {
            ActuatorError::InvalidAngle(_)
            | ActuatorError::UnknownPreset(_)
            | ActuatorError::InvalidSweep(_) => StatusCode::BAD_REQUEST,
            ActuatorError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ActuatorError::DriverFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, format!("Invalid JSON data: {}", rejection.body_text()))
    }
}

type ApiResult = Result<Json<serde_json::Value>, ApiError>;

// ── Router ────────────────────────────────────────────────────

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/get_angle", get(get_angle))
        .route("/api/system_status", get(system_status))
        .route("/api/set_angle", post(set_angle))
        .route("/api/preset", post(set_preset))
        .route("/api/sweep", post(sweep))
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Resource not found")
}

async fn get_angle(State(state): State<ApiState>) -> Json<AngleResponse> {
    Json(AngleResponse {
        angle: state.overrides.actuator().angle(),
    })
}

async fn system_status(State(state): State<ApiState>) -> Json<SystemStatusResponse> {
    let vent = state.overrides.actuator().state();
    let (motion_detected, degraded) = {
        let status = state.status.borrow();
        (status.snapshot.is_some_and(|s| s.motion), status.degraded)
    };
    Json(SystemStatusResponse {
        angle: vent.angle,
        gas_detected: state.gas.current_state(),
        motion_detected,
        vent_reason: vent.reason,
        degraded,
    })
}

async fn set_angle(
    State(state): State<ApiState>,
    body: Result<Json<SetAngleBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body?;
    let command = OverrideCommand::set_angle(body.angle).map_err(|e| {
        warn!("set_angle({}) rejected: {e}", body.angle);
        ApiError::from(e)
    })?;
    run_command(&state, command).await
}

async fn set_preset(
    State(state): State<ApiState>,
    body: Result<Json<PresetBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body?;
    run_command(&state, OverrideCommand::preset(&body.position)?).await
}

async fn sweep(
    State(state): State<ApiState>,
    body: Result<Json<SweepBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body?;
    let command = OverrideCommand::sweep(body.start, body.end, body.step, body.delay)?;
    run_command(&state, command).await
}

/// Execute `command` and render its outcome.
async fn run_command(state: &ApiState, command: OverrideCommand) -> ApiResult {
    let body = match state.overrides.execute(command, &state.shutdown).await? {
        OverrideOutcome::Moved(angle) => {
            info!("Override: angle set to {angle}");
            serde_json::json!({ "status": "success", "angle": angle })
        }
        OverrideOutcome::Preset(preset) => {
            info!("Override: preset {}", preset.name());
            serde_json::json!({
                "status": "success",
                "angle": preset.angle(),
                "position": preset.name(),
            })
        }
        OverrideOutcome::Swept { outcome, .. } if !outcome.completed => {
            return Err(ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "sweep interrupted by shutdown",
            ));
        }
        OverrideOutcome::Swept { request, .. } => serde_json::json!({
            "status": "success",
            "start": request.start,
            "end": request.end,
        }),
    };
    Ok(Json(body))
}
