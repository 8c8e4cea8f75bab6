//! MQ-2 gas/smoke watcher.
//!
//! One debounced latch, two input paths:
//!
//! ```text
//!   driver edge callback ──┐
//!                          ├──▶ observe() ──▶ latch (bool) ──▶ LED + buzzer
//!   poll (task / loop) ────┘
//! ```
//!
//! Both paths diff the new level against the last *published* level under
//! the same lock, so a transition seen by the callback and then again by
//! the poller toggles the alarm exactly once.
//!
//! ## Arming
//!
//! [`GasWatcher::start`] tries edge subscriptions in
//! [`Edge::FALLBACK_ORDER`].  A both-edge subscription is enough on its
//! own.  A single-edge subscription misses half the transitions, and no
//! subscription at all leaves polling as the only source, so in both cases a
//! background poller runs every `gas_poll_interval`.  Gas detection never
//! depends on subscription success.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use log::{error, info, warn};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use crate::app::ports::{AlarmPort, Edge, GasCallback, GasSensorPort};
use crate::error::SensorError;
use crate::util::lock;

/// How the watcher is receiving gas transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmMode {
    EventSubscribed(Edge),
    Polling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasWatchState {
    Uninitialized,
    Armed(ArmMode),
    /// The last direct read failed.  Cleared by the next good read or event.
    Faulted,
}

/// Which path reported a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasSource {
    Event,
    Poll,
}

struct Latch {
    detected: bool,
    /// Last time either path reported a level.
    last_seen: Option<Instant>,
    alarm: Box<dyn AlarmPort>,
}

#[derive(Default)]
struct ArmStatus {
    mode: Option<ArmMode>,
    faulted: bool,
}

pub struct GasWatcher {
    sensor: Mutex<Box<dyn GasSensorPort>>,
    latch: Mutex<Latch>,
    status: Mutex<ArmStatus>,
    poll_interval: Duration,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl GasWatcher {
    pub fn new(
        sensor: Box<dyn GasSensorPort>,
        alarm: Box<dyn AlarmPort>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            sensor: Mutex::new(sensor),
            latch: Mutex::new(Latch {
                detected: false,
                last_seen: None,
                alarm,
            }),
            status: Mutex::new(ArmStatus::default()),
            poll_interval,
            poller: Mutex::new(None),
        }
    }

    /// Seed the latch from a direct read, then arm edge events or polling.
    ///
    /// Must be called from inside a Tokio runtime.  The poller, if any,
    /// stops when `cancel` fires or on [`stop`](Self::stop).
    pub fn start(self: &Arc<Self>, cancel: CancellationToken) -> GasWatchState {
        if let Err(e) = self.poll_once() {
            warn!("Initial gas read failed: {e}");
        }

        let mode = self.subscribe_with_fallback();
        lock(&self.status).mode = Some(mode);

        if mode != ArmMode::EventSubscribed(Edge::Both) {
            self.spawn_poller(cancel);
        }
        info!("Gas watcher armed: {mode:?}");
        self.state()
    }

    fn subscribe_with_fallback(self: &Arc<Self>) -> ArmMode {
        let mut sensor = lock(&self.sensor);
        for edge in Edge::FALLBACK_ORDER {
            let weak: Weak<Self> = Arc::downgrade(self);
            let callback: GasCallback = Arc::new(move |detected| {
                if let Some(watcher) = weak.upgrade() {
                    watcher.on_event(detected);
                }
            });
            match sensor.subscribe(edge, callback) {
                Ok(()) => return ArmMode::EventSubscribed(edge),
                Err(e) => warn!("Gas subscription {edge:?} failed: {e}"),
            }
        }
        warn!("All gas subscriptions failed, polling every {:?}", self.poll_interval);
        ArmMode::Polling
    }

    fn spawn_poller(self: &Arc<Self>, cancel: CancellationToken) {
        let watcher = Arc::clone(self);
        let period = self.poll_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        // Errors are recorded as Faulted inside poll_once.
                        let _ = watcher.poll_once();
                    }
                }
            }
        });
        if let Some(old) = lock(&self.poller).replace(handle) {
            old.abort();
        }
    }

    // ── Input paths ───────────────────────────────────────────

    /// Edge callback entry point.  May run on a driver thread.
    fn on_event(&self, detected: bool) {
        lock(&self.status).faulted = false;
        self.observe(detected, GasSource::Event, Instant::now());
    }

    /// Read the sensor directly and feed the result to the latch.
    pub fn poll_once(&self) -> Result<bool, SensorError> {
        let reading = lock(&self.sensor).read_gas();
        match reading {
            Ok(detected) => {
                let mut status = lock(&self.status);
                if status.faulted {
                    info!("Gas sensor reads recovered");
                    status.faulted = false;
                }
                drop(status);
                self.observe(detected, GasSource::Poll, Instant::now());
                Ok(detected)
            }
            Err(e) => {
                let mut status = lock(&self.status);
                if !status.faulted {
                    error!("Gas sensor read failed: {e}");
                    status.faulted = true;
                }
                Err(e)
            }
        }
    }

    /// Poll only if neither path has reported within one poll interval.
    /// Returns whether a read was attempted.
    pub fn poll_if_quiet(&self, now: Instant) -> bool {
        let last_seen = lock(&self.latch).last_seen;
        let quiet = last_seen.is_none_or(|t| now.saturating_duration_since(t) >= self.poll_interval);
        if quiet {
            let _ = self.poll_once();
        }
        quiet
    }

    /// Shared transition detection.  Returns `true` if the published level
    /// changed.
    pub fn observe(&self, detected: bool, source: GasSource, now: Instant) -> bool {
        let mut latch = lock(&self.latch);
        latch.last_seen = Some(now);
        if latch.detected == detected {
            return false;
        }
        latch.detected = detected;
        if detected {
            warn!("GAS/SMOKE DETECTED ({source:?})");
        } else {
            info!("Gas cleared ({source:?})");
        }
        if let Err(e) = latch.alarm.set_alarm(detected) {
            error!("Gas alarm output failed: {e}");
        }
        true
    }

    // ── Queries ───────────────────────────────────────────────

    /// Last published gas level.
    pub fn current_state(&self) -> bool {
        lock(&self.latch).detected
    }

    pub fn state(&self) -> GasWatchState {
        let status = lock(&self.status);
        match (status.mode, status.faulted) {
            (_, true) => GasWatchState::Faulted,
            (Some(mode), false) => GasWatchState::Armed(mode),
            (None, false) => GasWatchState::Uninitialized,
        }
    }

    /// Stop polling, drop the edge subscription and silence the alarm.
    pub fn stop(&self) {
        if let Some(handle) = lock(&self.poller).take() {
            handle.abort();
        }
        lock(&self.sensor).unsubscribe();
        let mut latch = lock(&self.latch);
        if let Err(e) = latch.alarm.set_alarm(false) {
            warn!("Failed to silence gas alarm: {e}");
        }
        latch.detected = false;
        info!("Gas watcher stopped");
    }
}
