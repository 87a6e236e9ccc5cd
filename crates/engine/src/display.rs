//! Display mode rotation and the backlight monostable timer.

use crate::session::Tick;

/// How often the two display pages alternate.
pub const MODE_ROTATION_MS: u64 = 30_000;

/// What the two-line display is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Per-session on/off digits plus pump and light state.
    Status,
    /// Connectivity/address info and the current time.
    NetworkInfo,
}

/// Display-facing state owned by the engine. Starts in `Status` with the
/// backlight lit; nothing persists across reboot.
#[derive(Debug, Clone, Copy)]
pub struct DisplayState {
    pub mode: DisplayMode,
    last_mode_switch: Tick,
    pub backlight_on: bool,
    last_backlight_on: Tick,
}

impl DisplayState {
    pub fn new(now: Tick) -> Self {
        Self {
            mode: DisplayMode::Status,
            last_mode_switch: now,
            backlight_on: true,
            last_backlight_on: now,
        }
    }

    /// Advance the display for one tick.
    ///
    /// `changed` is the aggregate "any scheduling output changed" flag; any
    /// tick with a change relights the backlight and re-arms the hold timer
    /// for its full duration. With no change the backlight expires once the
    /// hold elapses. Mode rotation is independent of everything else.
    pub fn update(&mut self, now: Tick, changed: bool, backlight_hold_ms: u64) {
        if now.wrapping_sub(self.last_mode_switch) >= MODE_ROTATION_MS {
            self.mode = match self.mode {
                DisplayMode::Status => DisplayMode::NetworkInfo,
                DisplayMode::NetworkInfo => DisplayMode::Status,
            };
            self.last_mode_switch = now;
        }

        if changed {
            self.backlight_on = true;
            self.last_backlight_on = now;
        } else if self.backlight_on
            && now.wrapping_sub(self.last_backlight_on) >= backlight_hold_ms
        {
            self.backlight_on = false;
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
