//! Local wall-clock adapter.
//!
//! Monotonic time is `tokio::time::Instant` throughout the crate; this
//! adapter only answers "what time of day is it" for the display and the
//! status log line.

use chrono::{Local, Timelike};

use crate::app::ports::{ClockPort, WallTime};

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl ClockPort for LocalClock {
    fn wall_time(&self) -> WallTime {
        let now = Local::now();
        // chrono guarantees hour < 24, minute < 60, second < 60 (leap
        // seconds are folded into nanoseconds).
        WallTime {
            hour: now.hour() as u8,
            minute: now.minute() as u8,
            second: now.second() as u8,
        }
    }
}
