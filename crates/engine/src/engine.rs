//! The per-tick control pipeline and edge-triggered command output.

use tracing::{info, warn};

use crate::config::{ControlConfig, SESSION_COUNT};
use crate::display::{DisplayMode, DisplayState};
use crate::light;
use crate::session::{SessionState, Tick};

// ---------------------------------------------------------------------------
// Boundary types
// ---------------------------------------------------------------------------

/// Everything the engine reads from the outside world, sampled once per
/// tick. `hour` is `None` when the time source is unavailable; a failed
/// moisture read is `None` in `readings`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    pub hour: Option<u8>,
    pub now_ms: Tick,
    pub readings: [Option<u16>; SESSION_COUNT],
}

/// One actuator command. Emitted only on state transitions; repeated ticks
/// with unchanged inputs emit nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Relay { session: usize, on: bool },
    Pump(bool),
    Light(bool),
    Backlight(bool),
}

/// What the external display collaborator should render this tick. The
/// engine decides the mode and content inputs; text layout is the
/// collaborator's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayFrame {
    pub mode: DisplayMode,
    pub sessions: [bool; SESSION_COUNT],
    pub pump: bool,
    pub light: bool,
    pub backlight_on: bool,
}

/// Result of one engine tick.
#[derive(Debug, Clone)]
pub struct TickOutput {
    pub commands: Vec<Command>,
    pub frame: DisplayFrame,
}

/// Previous-tick snapshot of every derived output, kept so "did anything
/// change" and the edge-triggered commands fall out of a plain comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Outputs {
    sessions: [bool; SESSION_COUNT],
    pump: bool,
    light: bool,
    backlight: bool,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The scheduling core. Owns all session state and the display state;
/// everything else is handed in per tick and handed back as commands.
pub struct Engine {
    cfg: ControlConfig,
    sessions: [SessionState; SESSION_COUNT],
    display: DisplayState,
    prev: Outputs,
}

impl Engine {
    /// All sessions idle, display in `Status` with the backlight due on.
    /// `prev` starts all-off, so the boot-time backlight state is emitted
    /// as a command on the first tick.
    pub fn new(cfg: ControlConfig) -> Self {
        Self {
            cfg,
            sessions: [SessionState::default(); SESSION_COUNT],
            display: DisplayState::new(0),
            prev: Outputs::default(),
        }
    }

    pub fn config(&self) -> &ControlConfig {
        &self.cfg
    }

    /// Swap in a new validated snapshot. Running sessions keep their timers;
    /// the new thresholds and durations apply from the next tick. The whole
    /// snapshot replaces the old one at once, so derived values can never be
    /// observed mixed between two configurations.
    pub fn apply_config(&mut self, cfg: ControlConfig) {
        info!(
            cutoff = cfg.moisture_cutoff,
            duration_ms = cfg.irrigation_duration_ms,
            cooldown_ms = cfg.irrigation_cooldown_ms,
            "control config applied"
        );
        self.cfg = cfg;
    }

    /// Run one control tick: sessions, then pump aggregation, then the
    /// light rule, then the display, and only then the actuator commands.
    pub fn tick(&mut self, input: &TickInput) -> TickOutput {
        let daytime = match input.hour {
            Some(h) => self.cfg.day_window.contains(h),
            None => {
                // Fail safe: an unreadable clock counts as night rather
                // than reusing a stale hour.
                warn!("clock unavailable; treating hour as outside day window");
                false
            }
        };

        let mut outs = Outputs::default();
        for (i, session) in self.sessions.iter_mut().enumerate() {
            outs.sessions[i] = session.step(i, daytime, input.now_ms, input.readings[i], &self.cfg);
        }

        outs.pump = outs.sessions.iter().any(|&on| on);
        outs.light = light::should_light(input.hour, &self.cfg);

        let changed = outs.sessions != self.prev.sessions
            || outs.pump != self.prev.pump
            || outs.light != self.prev.light;

        self.display
            .update(input.now_ms, changed, self.cfg.backlight_hold_ms);
        outs.backlight = self.display.backlight_on;

        let mut commands = Vec::new();
        for i in 0..SESSION_COUNT {
            if outs.sessions[i] != self.prev.sessions[i] {
                commands.push(Command::Relay {
                    session: i,
                    on: outs.sessions[i],
                });
            }
        }
        if outs.pump != self.prev.pump {
            info!(on = outs.pump, "pump");
            commands.push(Command::Pump(outs.pump));
        }
        if outs.light != self.prev.light {
            info!(on = outs.light, "light");
            commands.push(Command::Light(outs.light));
        }
        if outs.backlight != self.prev.backlight {
            commands.push(Command::Backlight(outs.backlight));
        }

        let frame = DisplayFrame {
            mode: self.display.mode,
            sessions: outs.sessions,
            pump: outs.pump,
            light: outs.light,
            backlight_on: outs.backlight,
        };

        self.prev = outs;
        TickOutput { commands, frame }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    const DRY: u16 = 3000; // above the 2866 default cutoff
    const WET: u16 = 1000;

    fn engine() -> Engine {
        Engine::new(ControlConfig::from_settings(&Settings::default()).unwrap())
    }

    /// Tick input with the same reading for every session.
    fn input(hour: u8, now_ms: Tick, reading: u16) -> TickInput {
        TickInput {
            hour: Some(hour),
            now_ms,
            readings: [Some(reading); SESSION_COUNT],
        }
    }

    fn has(out: &TickOutput, cmd: Command) -> bool {
        out.commands.contains(&cmd)
    }

    // -- Scenario 1: dry session starts, pump follows ----------------------

    #[test]
    fn dry_session_turns_on_and_pump_follows() {
        let mut e = engine();
        let mut inp = input(9, 1_000, WET);
        inp.readings[0] = Some(DRY);

        let out = e.tick(&inp);
        assert!(has(&out, Command::Relay { session: 0, on: true }));
        assert!(has(&out, Command::Pump(true)));
        assert!(out.frame.sessions[0]);
        assert!(!out.frame.sessions[1]);
        assert!(out.frame.pump);
    }

    // -- Scenario 2: duration expiry arms the cooldown ---------------------

    #[test]
    fn session_stops_after_duration_and_respects_cooldown() {
        let mut e = engine();
        let mut on = input(9, 0, WET);
        on.readings[0] = Some(DRY);
        e.tick(&on);

        let mut later = input(9, 600_001, WET);
        later.readings[0] = Some(DRY);
        let out = e.tick(&later);
        assert!(has(&out, Command::Relay { session: 0, on: false }));
        assert!(has(&out, Command::Pump(false)));

        // Still dry, but the cooldown (1h from the off edge) blocks restart.
        let mut blocked = input(9, 600_001 + 3_599_000, WET);
        blocked.readings[0] = Some(DRY);
        let out = e.tick(&blocked);
        assert!(!out.frame.sessions[0]);

        let mut ready = input(9, 600_001 + 3_600_000, WET);
        ready.readings[0] = Some(DRY);
        let out = e.tick(&ready);
        assert!(out.frame.sessions[0]);
    }

    // -- Scenario 3: nightfall forces everything off -----------------------

    #[test]
    fn nightfall_forces_active_session_off() {
        let mut e = engine();
        let mut inp = input(19, 0, WET);
        inp.readings[0] = Some(DRY);
        e.tick(&inp);

        // Hour 21 is outside the 06-20 window; elapsed time is irrelevant.
        let out = e.tick(&input(21, 1_000, DRY));
        assert!(has(&out, Command::Relay { session: 0, on: false }));
        assert!(has(&out, Command::Pump(false)));
    }

    #[test]
    fn unavailable_clock_forces_active_session_off() {
        let mut e = engine();
        let mut inp = input(9, 0, WET);
        inp.readings[0] = Some(DRY);
        e.tick(&inp);

        let blind = TickInput {
            hour: None,
            now_ms: 1_000,
            readings: [Some(DRY); SESSION_COUNT],
        };
        let out = e.tick(&blind);
        assert!(!out.frame.sessions[0]);
        assert!(!out.frame.pump);
        assert!(!out.frame.light);
    }

    // -- Pump aggregation ---------------------------------------------------

    #[test]
    fn pump_is_or_of_all_sessions() {
        let mut e = engine();
        let mut inp = input(9, 0, WET);
        inp.readings[1] = Some(DRY);
        inp.readings[3] = Some(DRY);

        let out = e.tick(&inp);
        assert!(out.frame.pump);
        assert_eq!(out.frame.pump, out.frame.sessions.iter().any(|&s| s));

        // Session 1 and 3 started at the same tick, so they also stop
        // together; the pump must drop with them.
        let out = e.tick(&input(9, 600_000, WET));
        assert!(!out.frame.sessions.iter().any(|&s| s));
        assert!(!out.frame.pump);
        assert!(has(&out, Command::Pump(false)));
    }

    #[test]
    fn pump_stays_on_while_any_session_remains_active() {
        let mut e = engine();
        let mut first = input(9, 0, WET);
        first.readings[0] = Some(DRY);
        e.tick(&first);

        // Second session joins 5 minutes later.
        let mut second = input(9, 300_000, WET);
        second.readings[2] = Some(DRY);
        let out = e.tick(&second);
        assert!(has(&out, Command::Relay { session: 2, on: true }));
        // Pump already on: no duplicate command.
        assert!(!has(&out, Command::Pump(true)));

        // Session 0 expires at 600_000, session 2 keeps the pump alive.
        let out = e.tick(&input(9, 600_000, WET));
        assert!(has(&out, Command::Relay { session: 0, on: false }));
        assert!(out.frame.pump);
        assert!(!out.commands.iter().any(|c| matches!(c, Command::Pump(_))));
    }

    // -- Idempotence (edge-triggered output) --------------------------------

    #[test]
    fn repeated_identical_ticks_emit_no_commands() {
        let mut e = engine();
        let mut inp = input(9, 1_000, WET);
        inp.readings[0] = Some(DRY);
        e.tick(&inp);

        // Same state two ticks later: the session is still running, the
        // pump is still on, nothing changed.
        inp.now_ms = 3_000;
        let out = e.tick(&inp);
        assert!(out.commands.is_empty(), "got: {:?}", out.commands);
    }

    #[test]
    fn first_tick_emits_boot_backlight() {
        let mut e = engine();
        let out = e.tick(&input(3, 0, WET));
        assert_eq!(out.commands, vec![Command::Backlight(true)]);
    }

    // -- Scenario 5 + backlight behaviour ----------------------------------

    #[test]
    fn backlight_expires_after_quiet_hold() {
        let mut e = engine();
        e.tick(&input(9, 0, WET));

        // Three quiet ticks within the 6s hold: backlight stays on.
        for t in [2_000, 4_000, 5_999] {
            assert!(e.tick(&input(9, t, WET)).frame.backlight_on);
        }

        // Full hold elapsed with no change: off, with an edge command.
        let out = e.tick(&input(9, 6_001, WET));
        assert!(!out.frame.backlight_on);
        assert!(has(&out, Command::Backlight(false)));
    }

    #[test]
    fn state_change_rearms_backlight() {
        let mut e = engine();
        e.tick(&input(9, 0, WET));
        e.tick(&input(9, 7_000, WET)); // backlight expired

        let mut inp = input(9, 8_000, WET);
        inp.readings[0] = Some(DRY);
        let out = e.tick(&inp); // session edge relights it
        assert!(out.frame.backlight_on);
        assert!(has(&out, Command::Backlight(true)));

        // Quiet again: off only after a full hold from the change.
        assert!(e.tick(&input(9, 8_000 + 5_999, WET)).frame.backlight_on);
        assert!(!e.tick(&input(9, 8_000 + 6_000 + 1, WET)).frame.backlight_on);
    }

    // -- Scenario 4: light rule through the full pipeline -------------------

    #[test]
    fn light_follows_configured_window() {
        let mut e = engine();
        assert!(!e.tick(&input(9, 0, WET)).frame.light);

        let out = e.tick(&input(10, 1_000, WET));
        assert!(out.frame.light);
        assert!(has(&out, Command::Light(true)));

        let out = e.tick(&input(16, 2_000, WET));
        assert!(!out.frame.light);
        assert!(has(&out, Command::Light(false)));
    }

    // -- Display mode through the pipeline ----------------------------------

    #[test]
    fn frame_mode_rotates() {
        let mut e = engine();
        assert_eq!(e.tick(&input(9, 0, WET)).frame.mode, DisplayMode::Status);
        assert_eq!(
            e.tick(&input(9, 30_000, WET)).frame.mode,
            DisplayMode::NetworkInfo
        );
    }

    // -- Reconfiguration -----------------------------------------------------

    #[test]
    fn apply_config_takes_effect_next_tick() {
        let mut e = engine();
        // 3000 raw is dry at the default 30% threshold...
        let mut inp = input(9, 0, WET);
        inp.readings[0] = Some(DRY);
        assert!(e.tick(&inp).frame.sessions[0]);

        // ...but not at a 10% threshold (cutoff 3685).
        let relaxed = Settings {
            humidity_threshold_percent: 10,
            ..Settings::default()
        };
        let mut e = engine();
        e.apply_config(ControlConfig::from_settings(&relaxed).unwrap());
        let mut inp = input(9, 0, WET);
        inp.readings[0] = Some(DRY);
        assert!(!e.tick(&inp).frame.sessions[0]);
    }
}
