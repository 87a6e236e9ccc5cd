mod clock;
mod config;
mod relays;
mod screen;
mod sensors;

use anyhow::Result;
use std::{env, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

use garden_engine::{Command, ControlConfig, Engine, TickInput, SESSION_COUNT};

use clock::SystemClock;
use relays::{RelayBoard, RelayPins};
use screen::{render_frame, Screen};
use sensors::{FlowCounter, MoistureBank};

/// Nominal control tick period. The engine only depends on the monotonic
/// tick values it is handed, not on this exact period.
const TICK_PERIOD: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Settings ────────────────────────────────────────────────────
    let settings_path = env::var("SETTINGS_PATH").unwrap_or_else(|_| "settings.toml".to_string());
    let settings = config::load(&settings_path)?;
    let control = ControlConfig::from_settings(&settings)?;
    info!(
        cutoff = control.moisture_cutoff,
        duration_ms = control.irrigation_duration_ms,
        cooldown_ms = control.irrigation_cooldown_ms,
        light_start = control.light_start_hour,
        light_hours = control.light_duration_hours,
        "settings loaded"
    );

    // ── Relay board ─────────────────────────────────────────────────
    // Many common relay boards are active-low. If yours is active-high, set false.
    let active_low = env::var("RELAY_ACTIVE_LOW")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(true);

    let mut relays = RelayBoard::new(&RelayPins::default(), active_low)?;
    relays.all_off();

    // ── Moisture inputs ─────────────────────────────────────────────
    #[cfg(feature = "sim")]
    let mut moisture = {
        let scenario =
            sensors::Scenario::from_str_lossy(&env::var("SIM_SCENARIO").unwrap_or_default());
        MoistureBank::new(scenario)
    };
    #[cfg(feature = "adc")]
    let mut moisture = MoistureBank::new()?;

    // ── Display ─────────────────────────────────────────────────────
    let mut screen = Screen::new()?;
    let net_label = env::var("NET_LABEL").unwrap_or_else(|_| "net: standalone".to_string());
    let summary = format!(
        "thr {}% dur {}m",
        settings.humidity_threshold_percent, settings.irrigation_duration_minutes
    );

    // ── Engine + control loop ───────────────────────────────────────
    let wall = SystemClock::new();
    let mut engine = Engine::new(control);
    let mut flow = FlowCounter::new(wall.tick_ms());
    let mut ticker = tokio::time::interval(TICK_PERIOD);

    info!(sessions = SESSION_COUNT, tick_sec = TICK_PERIOD.as_secs(), "controller started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let input = TickInput {
                    hour: wall.hour(),
                    now_ms: wall.tick_ms(),
                    readings: moisture.read_all(),
                };
                let out = engine.tick(&input);

                for cmd in &out.commands {
                    match *cmd {
                        Command::Relay { session, on } => {
                            relays.set_session(session, on);
                            moisture.set_watering(session, on);
                        }
                        Command::Pump(on) => relays.set_pump(on),
                        Command::Light(on) => relays.set_light(on),
                        Command::Backlight(on) => screen.set_backlight(on),
                    }
                }

                // Flow pulses accumulate while the pump runs (synthesised
                // in sim builds); the count is logged, never acted on.
                #[cfg(feature = "sim")]
                if out.frame.pump {
                    flow.add(100 + fastrand::u32(..30));
                }
                flow.tick(input.now_ms);

                let hhmm = wall.hhmm();
                screen.render(render_frame(&out.frame, &summary, &net_label, hhmm.as_deref()));
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down; forcing all relays off");
                relays.all_off();
                break;
            }
        }
    }

    Ok(())
}
