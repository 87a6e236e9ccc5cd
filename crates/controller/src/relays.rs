//! Relay board: one relay per irrigation session plus the shared pump and
//! grow-light relays. The `gpio` feature gates the real rppal driver;
//! without it, a mock implementation records state and logs changes.

use anyhow::Result;
use tracing::info;

use garden_engine::SESSION_COUNT;

#[cfg(feature = "gpio")]
use rppal::gpio::{Gpio, OutputPin};

// ---------------------------------------------------------------------------
// Pin assignment
// ---------------------------------------------------------------------------

/// BCM pin numbers for every relay the controller drives.
#[derive(Debug, Clone)]
pub struct RelayPins {
    pub sessions: [u8; SESSION_COUNT],
    pub pump: u8,
    pub light: u8,
}

impl Default for RelayPins {
    fn default() -> Self {
        Self {
            sessions: [14, 15, 16, 17, 18],
            pump: 12,
            light: 13,
        }
    }
}

// ---------------------------------------------------------------------------
// Real GPIO relay board (production — requires rppal + Raspberry Pi hardware)
// ---------------------------------------------------------------------------
#[cfg(feature = "gpio")]
pub struct RelayBoard {
    sessions: Vec<OutputPin>,
    pump: OutputPin,
    light: OutputPin,
    active_low: bool, // many relay boards are active-low
}

#[cfg(feature = "gpio")]
impl RelayBoard {
    pub fn new(pins: &RelayPins, active_low: bool) -> Result<Self> {
        let gpio = Gpio::new()?;

        let take = |pin_num: u8| -> Result<OutputPin> {
            let mut pin = gpio.get(pin_num)?.into_output();
            // Fail-safe: ensure "OFF" at startup
            if active_low {
                pin.set_high();
            } else {
                pin.set_low();
            }
            Ok(pin)
        };

        let mut sessions = Vec::with_capacity(SESSION_COUNT);
        for &p in &pins.sessions {
            sessions.push(take(p)?);
        }
        let pump = take(pins.pump)?;
        let light = take(pins.light)?;

        Ok(Self {
            sessions,
            pump,
            light,
            active_low,
        })
    }

    fn drive(pin: &mut OutputPin, on: bool, active_low: bool) {
        // active-low relay: LOW = ON, HIGH = OFF
        if on != active_low {
            pin.set_high()
        } else {
            pin.set_low()
        }
    }

    pub fn set_session(&mut self, index: usize, on: bool) {
        if let Some(pin) = self.sessions.get_mut(index) {
            Self::drive(pin, on, self.active_low);
            info!(session = index, on, "session relay");
        }
    }

    pub fn set_pump(&mut self, on: bool) {
        Self::drive(&mut self.pump, on, self.active_low);
        info!(on, "pump relay");
    }

    pub fn set_light(&mut self, on: bool) {
        Self::drive(&mut self.light, on, self.active_low);
        info!(on, "light relay");
    }

    pub fn all_off(&mut self) {
        for i in 0..SESSION_COUNT {
            self.set_session(i, false);
        }
        self.set_pump(false);
        self.set_light(false);
    }
}

// ---------------------------------------------------------------------------
// Mock relay board (development — no hardware, records state)
// ---------------------------------------------------------------------------
#[cfg(not(feature = "gpio"))]
pub struct RelayBoard {
    pub(crate) sessions: [bool; SESSION_COUNT],
    pub(crate) pump: bool,
    pub(crate) light: bool,
}

#[cfg(not(feature = "gpio"))]
impl RelayBoard {
    pub fn new(pins: &RelayPins, _active_low: bool) -> Result<Self> {
        info!(
            sessions = ?pins.sessions,
            pump = pins.pump,
            light = pins.light,
            "mock relay board initialised (no hardware)"
        );
        Ok(Self {
            sessions: [false; SESSION_COUNT],
            pump: false,
            light: false,
        })
    }

    pub fn set_session(&mut self, index: usize, on: bool) {
        if let Some(state) = self.sessions.get_mut(index) {
            *state = on;
            info!(session = index, on, "session relay");
        }
    }

    pub fn set_pump(&mut self, on: bool) {
        self.pump = on;
        info!(on, "pump relay");
    }

    pub fn set_light(&mut self, on: bool) {
        self.light = on;
        info!(on, "light relay");
    }

    pub fn all_off(&mut self) {
        for i in 0..SESSION_COUNT {
            self.set_session(i, false);
        }
        self.set_pump(false);
        self.set_light(false);
    }
}

// ===========================================================================
// Tests
// ===========================================================================
