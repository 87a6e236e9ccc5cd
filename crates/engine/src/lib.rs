//! Scheduling core for a multi-zone garden controller.
//!
//! The engine is a synchronous, I/O-free decision machine. Once per control
//! tick the host feeds it the current wall-clock hour, a monotonic
//! millisecond counter, and one raw moisture reading per irrigation session;
//! the engine steps every session state machine, derives the shared pump and
//! grow-light states, updates the display mode and backlight timer, and
//! returns the edge-triggered actuator commands for that tick.
//!
//! All hardware, networking, and persistence concerns live in the host
//! binary. The engine never blocks and never panics on collaborator input:
//! an unavailable clock or an implausible sensor reading fails safe toward
//! "everything off".

mod config;
mod display;
mod engine;
mod light;
mod session;

pub use config::{ControlConfig, DayWindow, Settings, DAY_WINDOW, SENSOR_FULL_SCALE, SESSION_COUNT};
pub use display::{DisplayMode, DisplayState, MODE_ROTATION_MS};
pub use engine::{Command, DisplayFrame, Engine, TickInput, TickOutput};
pub use light::{is_light_period, should_light};
pub use session::{SessionState, Tick};
