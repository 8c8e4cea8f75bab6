//! VentGuard main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  SimBoard / gpio     LogEventSink    LogPublisher  LocalClock│
//! │  (sensors, servo,    (EventSink)     (Telemetry)   (Clock)   │
//! │   alarm, display)                                            │
//! │                                                              │
//! │  ─────────────────── Port Trait Boundary ─────────────────   │
//! │                                                              │
//! │  ControlLoop (1 Hz) ──Policy──┐                              │
//! │                               ├──▶ ActuatorController        │
//! │  axum API ─▶ OverrideService ─┘                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The binary runs against the simulated board.  A Pi build swaps the
//! `SimBoard` views for `adapters::gpio` wrappers around the board's
//! `embedded-hal` pins.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use log::{error, info};
use tokio::net::TcpListener;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use ventguard::adapters::log_publisher::LogPublisher;
use ventguard::adapters::log_sink::LogEventSink;
use ventguard::adapters::sim::SimBoard;
use ventguard::adapters::time::LocalClock;
use ventguard::api::{ApiState, build_router};
use ventguard::app::service::OverrideService;
use ventguard::config::SystemConfig;
use ventguard::control::actuator::ActuatorController;
use ventguard::control::cycle::{ControlLoop, LoopParts};
use ventguard::display::DisplayRotator;
use ventguard::sensors::SensorSampler;
use ventguard::sensors::gas::GasWatcher;
use ventguard::sensors::motion::MotionTracker;
use ventguard::signals::ShutdownSignals;
use ventguard::telemetry::TelemetryPublisher;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML file overlaid on the built-in defaults.
    #[arg(long, env = "VENTGUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Override API listen address (overrides the config file).
    #[arg(long, env = "VENTGUARD_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        error!("{e:#}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn load_config(args: &Args) -> Result<SystemConfig> {
    let mut config = match &args.config {
        Some(path) => SystemConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => SystemConfig::default(),
    };
    if let Some(bind) = &args.bind {
        config.bind_addr.clone_from(bind);
    }
    Ok(config)
}

async fn run() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    info!("VentGuard {} starting", env!("CARGO_PKG_VERSION"));

    let cancel = CancellationToken::new();
    let board = SimBoard::new();

    // ── Domain wiring ─────────────────────────────────────────
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
    let mut control = ControlLoop::new(
        LoopParts {
            sampler,
            actuator: Arc::clone(&actuator),
            display: DisplayRotator::new(Box::new(board.display()), config.display_period_secs),
            telemetry: TelemetryPublisher::new(
                Arc::new(LogPublisher),
                &config.telemetry_channel,
                config.telemetry_interval(),
            ),
            clock: Box::new(LocalClock),
            sink: Box::new(LogEventSink::new()),
        },
        &config,
    );

    // ── Override API ──────────────────────────────────────────
    let state = ApiState {
        overrides: Arc::new(OverrideService::new(actuator)),
        gas,
        status: control.status(),
        shutdown: cancel.clone(),
    };
    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!("Override API listening on http://{}", listener.local_addr()?);
    let server = tokio::spawn(
        axum::serve(listener, build_router(state))
            .with_graceful_shutdown(cancel.clone().cancelled_owned())
            .into_future(),
    );

    // ── Signals ───────────────────────────────────────────────
    let signals = ShutdownSignals::install().context("failed to install signal handlers")?;
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            let reason = signals.recv().await;
            info!("{reason:?} signal received");
            cancel.cancel();
        }
    });

    // ── Control loop (returns after shutdown) ─────────────────
    control.startup(&cancel).await;
    control.run(cancel.clone()).await;

    server
        .await
        .context("API task panicked")?
        .context("API server failed")?;
    info!("Program exited");
    Ok(())
}

