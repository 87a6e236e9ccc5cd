//! Time source: local wall-clock hour plus a monotonic millisecond counter.

use chrono::{Datelike, Local, Timelike};
use std::time::Instant;

/// Boards without an RTC report an epoch-era date until time sync
/// completes; any year before this is treated as "clock not yet valid".
const MIN_PLAUSIBLE_YEAR: i32 = 2024;

pub struct SystemClock {
    boot: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            boot: Instant::now(),
        }
    }

    /// Current local hour of day, or `None` while the wall clock is not
    /// yet synchronised. The engine treats `None` as night.
    pub fn hour(&self) -> Option<u8> {
        let now = Local::now();
        if now.year() < MIN_PLAUSIBLE_YEAR {
            return None;
        }
        Some(now.hour() as u8)
    }

    /// Current local time as `HH:MM`, or `None` while unsynchronised.
    pub fn hhmm(&self) -> Option<String> {
        let now = Local::now();
        if now.year() < MIN_PLAUSIBLE_YEAR {
            return None;
        }
        Some(now.format("%H:%M").to_string())
    }

    /// Monotonic milliseconds since controller start.
    pub fn tick_ms(&self) -> u64 {
        self.boot.elapsed().as_millis() as u64
    }
}

// ===========================================================================
// Tests
// ===========================================================================
