//! Grow-light rule: hour-of-day window intersected with the day window.

use crate::config::ControlConfig;

/// Whether `hour` falls inside the configured light period
/// `[start, start + duration)`.
///
/// The comparison deliberately does not wrap past midnight: with
/// `start + duration > 24` the window truncates at 24, so e.g. start 22 and
/// duration 6 covers hours 22–23 only, never 0–3. This mirrors the deployed
/// behaviour; see `light_window_truncates_at_midnight`.
pub fn is_light_period(hour: u8, cfg: &ControlConfig) -> bool {
    let end = u16::from(cfg.light_start_hour) + u16::from(cfg.light_duration_hours);
    hour >= cfg.light_start_hour && u16::from(hour) < end
}

/// Derived light state: on only while it is daytime *and* inside the light
/// period. An unavailable clock reads as night, so the light fails safe to
/// off.
pub fn should_light(hour: Option<u8>, cfg: &ControlConfig) -> bool {
    match hour {
        Some(h) => cfg.day_window.contains(h) && is_light_period(h, cfg),
        None => false,
    }
}

// ===========================================================================
// Tests
// ===========================================================================
