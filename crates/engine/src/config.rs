//! Settings model, validation, and the derived control snapshot the engine
//! runs on.

use anyhow::{bail, Result};
use serde::Deserialize;

/// Number of independently controlled irrigation sessions (zones).
pub const SESSION_COUNT: usize = 5;

/// Full-scale raw value of the moisture ADC (12-bit). Readings above this
/// are implausible and treated as a failed read.
pub const SENSOR_FULL_SCALE: u16 = 4095;

// ---------------------------------------------------------------------------
// Day window
// ---------------------------------------------------------------------------

/// Hour-of-day range during which any resource is permitted to activate.
/// Outside it, sessions are forced off and the light stays dark regardless
/// of every other condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start_hour: u8,
    pub end_hour: u8,
}

impl DayWindow {
    /// Half-open containment: `[start, end)`.
    pub fn contains(&self, hour: u8) -> bool {
        hour >= self.start_hour && hour < self.end_hour
    }
}

/// Compiled-in daytime window: 06:00–20:00 local.
pub const DAY_WINDOW: DayWindow = DayWindow {
    start_hour: 6,
    end_hour: 20,
};

// ---------------------------------------------------------------------------
// Raw settings (the persisted tunables)
// ---------------------------------------------------------------------------

/// The six user-facing tunables, as persisted by the external settings
/// store. Absent keys fall back to the compiled-in defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Soil humidity threshold in percent; below it a session wants water.
    pub humidity_threshold_percent: u8,
    /// How long one irrigation cycle runs.
    pub irrigation_duration_minutes: u32,
    /// Minimum off time between cycles of the same session.
    pub irrigation_cooldown_hours: u32,
    /// Hour of day the grow light switches on.
    pub light_start_hour: u8,
    /// How many hours the grow light stays on.
    pub light_duration_hours: u8,
    /// How long the LCD backlight stays lit after the last state change.
    pub lcd_backlight_hold_seconds: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            humidity_threshold_percent: 30,
            irrigation_duration_minutes: 10,
            irrigation_cooldown_hours: 1,
            light_start_hour: 10,
            light_duration_hours: 6,
            lcd_backlight_hold_seconds: 6,
        }
    }
}

impl Settings {
    /// Validate all fields. Returns `Ok(())` or an error describing every
    /// violation found (not just the first one). Rejected settings are
    /// never applied partially; the previous snapshot stays in force.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.humidity_threshold_percent > 100 {
            errors.push(format!(
                "humidity_threshold_percent {} out of range [0, 100]",
                self.humidity_threshold_percent
            ));
        }
        if self.light_start_hour > 23 {
            errors.push(format!(
                "light_start_hour {} out of range [0, 23]",
                self.light_start_hour
            ));
        }
        if self.light_duration_hours > 24 {
            errors.push(format!(
                "light_duration_hours {} out of range [0, 24]",
                self.light_duration_hours
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            bail!(
                "settings validation failed ({} error{}):\n  - {}",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" },
                errors.join("\n  - ")
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Derived control snapshot
// ---------------------------------------------------------------------------

/// Validated, immutable snapshot the engine evaluates against. Raw
/// percentages and coarse units are pre-converted so the tick path does no
/// arithmetic beyond comparisons. Swapped as one unit via
/// [`crate::Engine::apply_config`] so a reconfiguration can never be
/// observed half-applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlConfig {
    /// Raw reading above which soil counts as dry (larger raw = drier).
    pub moisture_cutoff: u16,
    pub irrigation_duration_ms: u64,
    pub irrigation_cooldown_ms: u64,
    pub light_start_hour: u8,
    pub light_duration_hours: u8,
    pub backlight_hold_ms: u64,
    pub day_window: DayWindow,
}

impl ControlConfig {
    /// Validate `settings` and derive the snapshot.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;

        // 30% humidity threshold -> 70% "dry" of full scale -> cutoff 2866.
        let dryness = 100 - u32::from(settings.humidity_threshold_percent);
        let moisture_cutoff = (dryness * u32::from(SENSOR_FULL_SCALE) / 100) as u16;

        Ok(Self {
            moisture_cutoff,
            irrigation_duration_ms: u64::from(settings.irrigation_duration_minutes) * 60_000,
            irrigation_cooldown_ms: u64::from(settings.irrigation_cooldown_hours) * 3_600_000,
            light_start_hour: settings.light_start_hour,
            light_duration_hours: settings.light_duration_hours,
            backlight_hold_ms: u64::from(settings.lcd_backlight_hold_seconds) * 1_000,
            day_window: DAY_WINDOW,
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
