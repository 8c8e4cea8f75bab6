//! PIR motion edge detection with debounce.
//!
//! A reading counts as a new motion event only on a rising edge
//! (previous reading `false`, current `true`) **and** only if at least the
//! debounce interval has passed since the last counted event.  PIR modules
//! re-trigger a few hundred milliseconds after releasing; without the quiet
//! interval one walk-past would count two or three times.

use std::time::Duration;

use tokio::time::Instant;

/// Record of counted motion events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionHistory {
    pub last_motion_time: Instant,
    pub motion_count: u64,
}

pub struct MotionTracker {
    history: MotionHistory,
    previous: bool,
    debounce: Duration,
}

impl MotionTracker {
    /// `started` seeds `last_motion_time`, so an empty room is only treated
    /// as idle once the idle limit has passed after startup.
    pub fn new(started: Instant, debounce: Duration) -> Self {
        Self {
            history: MotionHistory {
                last_motion_time: started,
                motion_count: 0,
            },
            previous: false,
            debounce,
        }
    }

    /// Feed the current PIR level.  Returns `true` if a new event was counted.
    pub fn observe(&mut self, motion: bool, now: Instant) -> bool {
        let rising = motion && !self.previous;
        self.previous = motion;
        if !rising {
            return false;
        }
        let quiet = now.saturating_duration_since(self.history.last_motion_time);
        if quiet < self.debounce {
            return false;
        }
        self.history.last_motion_time = now;
        self.history.motion_count += 1;
        true
    }

    pub fn history(&self) -> MotionHistory {
        self.history
    }

    /// Last raw PIR level seen.
    pub fn is_active(&self) -> bool {
        self.previous
    }
}
