//! Per-session irrigation state machine.
//!
//! Each session is an independent two-state machine over one moisture
//! sensor and one relay:
//!
//! ```text
//! Off ──[daytime ∧ cooldown elapsed ∧ reading > cutoff]──▶ On
//!  ▲                                                        │
//!  └────────[duration elapsed ∨ not daytime]────────────────┘
//! ```
//!
//! Turning off arms the cooldown; at most one transition happens per tick,
//! so a session can never bounce off-on-off within a single evaluation.

use tracing::{info, warn};

use crate::config::{ControlConfig, SENSOR_FULL_SCALE};

/// Monotonic milliseconds since boot. The counter may wrap; all arithmetic
/// on it must go through [`elapsed`]/[`reached`].
pub type Tick = u64;

/// Wraparound-safe `now - earlier`.
fn elapsed(now: Tick, earlier: Tick) -> Tick {
    now.wrapping_sub(earlier)
}

/// Wraparound-safe `now >= deadline` (serial-number comparison).
fn reached(now: Tick, deadline: Tick) -> bool {
    (now.wrapping_sub(deadline) as i64) >= 0
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Mutable state of one irrigation session. All zeros at boot; reset only
/// by reboot.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionState {
    pub active: bool,
    start_tick: Tick,
    next_allowed_tick: Tick,
}

impl SessionState {
    /// Evaluate one tick for this session and return whether it is active
    /// afterwards.
    ///
    /// `reading` is the raw moisture value (larger = drier), or `None` when
    /// the read failed. A missing or implausible reading counts as "not dry
    /// enough" for this tick only, so a flaky sensor can never start a
    /// cycle on bad data.
    pub fn step(
        &mut self,
        index: usize,
        daytime: bool,
        now: Tick,
        reading: Option<u16>,
        cfg: &ControlConfig,
    ) -> bool {
        if self.active {
            let running = elapsed(now, self.start_tick);
            if running >= cfg.irrigation_duration_ms || !daytime {
                self.active = false;
                self.next_allowed_tick = now.wrapping_add(cfg.irrigation_cooldown_ms);
                info!(
                    session = index,
                    ran_ms = running,
                    reason = if daytime { "duration" } else { "nightfall" },
                    "session OFF"
                );
            }
        } else {
            let dry = match reading {
                Some(v) if v <= SENSOR_FULL_SCALE => v > cfg.moisture_cutoff,
                Some(v) => {
                    warn!(session = index, reading = v, "implausible moisture reading");
                    false
                }
                None => false,
            };

            if daytime && reached(now, self.next_allowed_tick) && dry {
                self.active = true;
                self.start_tick = now;
                info!(session = index, reading = reading.unwrap_or(0), "session ON");
            }
        }

        self.active
    }
}

// ===========================================================================
// Tests
// ===========================================================================
