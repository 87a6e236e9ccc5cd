//! Moisture inputs for the five sessions, plus the flow pulse counter.
//!
//! Default build (`sim` feature) runs a stateful soil simulator: random
//! walk with drying drift, per-channel noise, and a closed-loop watering
//! response so a running session visibly re-wets its zone. The `adc`
//! feature replaces it with single-shot I2C reads from two ADS1115-style
//! converters, scaled down to the engine's 12-bit range.
//!
//! The flow counter is telemetry only: pulses are accumulated and logged
//! every 30 s, and deliberately feed no scheduling decision. The control
//! loop synthesises pulses in `sim` builds while the pump runs; hardware
//! pulse capture is not wired up, so `adc` builds report a zero count.

use tracing::debug;

use garden_engine::SESSION_COUNT;

#[cfg(all(feature = "sim", feature = "adc"))]
compile_error!("features `sim` and `adc` are mutually exclusive");
#[cfg(not(any(feature = "sim", feature = "adc")))]
compile_error!("enable either the `sim` or the `adc` feature");

#[cfg(feature = "adc")]
use anyhow::Result;
#[cfg(feature = "adc")]
use rppal::i2c::I2c;

// ---------------------------------------------------------------------------
// Flow pulse counter (telemetry only)
// ---------------------------------------------------------------------------

/// How often the accumulated pulse count is reported.
const FLOW_REPORT_MS: u64 = 30_000;

/// Accumulates water-flow pulses and logs the count every report window.
/// Nothing reads the count back; the scheduler does not act on flow.
pub struct FlowCounter {
    pulses: u32,
    window_started_ms: u64,
}

impl FlowCounter {
    pub fn new(now_ms: u64) -> Self {
        Self {
            pulses: 0,
            window_started_ms: now_ms,
        }
    }

    pub fn add(&mut self, pulses: u32) {
        self.pulses = self.pulses.saturating_add(pulses);
    }

    /// Call once per control tick; flushes the window when it elapses.
    pub fn tick(&mut self, now_ms: u64) {
        if now_ms.wrapping_sub(self.window_started_ms) >= FLOW_REPORT_MS {
            debug!(pulses = self.pulses, window_ms = FLOW_REPORT_MS, "flow");
            self.pulses = 0;
            self.window_started_ms = now_ms;
        }
    }
}

// ---------------------------------------------------------------------------
// Simulated moisture bank (development — no hardware)
// ---------------------------------------------------------------------------

#[cfg(feature = "sim")]
pub use sim::{MoistureBank, Scenario};

#[cfg(feature = "sim")]
mod sim {
    use super::*;
    use garden_engine::SENSOR_FULL_SCALE;
    use std::fmt;

    /// Pre-configured simulation profiles selectable via `SIM_SCENARIO`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Scenario {
        /// Starts mid-range and dries steadily; triggers watering within
        /// minutes. The default.
        Drying,
        /// Hovers below the cutoff; good for exercising the display and
        /// light without any irrigation.
        Stable,
        /// Starts wet and dries very slowly; the scheduler should do
        /// nothing for a long time.
        Wet,
    }

    impl Scenario {
        pub fn from_str_lossy(s: &str) -> Self {
            match s.to_ascii_lowercase().as_str() {
                "stable" => Self::Stable,
                "wet" => Self::Wet,
                _ => Self::Drying, // default
            }
        }
    }

    impl fmt::Display for Scenario {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Drying => write!(f, "drying"),
                Self::Stable => write!(f, "stable"),
                Self::Wet => write!(f, "wet"),
            }
        }
    }

    struct Channel {
        /// Current "true" dryness in raw units (higher = drier).
        base: f64,
        /// Permanent calibration offset so channels diverge naturally.
        offset: f64,
        watering: bool,
    }

    /// Stateful simulator producing raw readings on the 0–4095 scale.
    pub struct MoistureBank {
        channels: Vec<Channel>,
        drift_per_tick: f64,
        noise_sigma: f64,
        wet_rate: f64,
    }

    impl MoistureBank {
        pub fn new(scenario: Scenario) -> Self {
            let full = f64::from(SENSOR_FULL_SCALE);
            let (start_frac, drift, noise_sigma) = match scenario {
                Scenario::Drying => (0.55, 1.5, 25.0),
                Scenario::Stable => (0.50, 0.0, 15.0),
                Scenario::Wet => (0.20, 0.1, 20.0),
            };

            let channels = (0..SESSION_COUNT)
                .map(|_| Channel {
                    base: (start_frac + 0.04 * (fastrand::f64() - 0.5)) * full,
                    offset: full * 0.02 * (fastrand::f64() - 0.5),
                    watering: false,
                })
                .collect();

            tracing::info!(%scenario, "moisture simulator initialised");

            Self {
                channels,
                drift_per_tick: drift,
                noise_sigma,
                wet_rate: -30.0,
            }
        }

        /// Inform the simulator that a session's valve opened or closed, so
        /// its zone re-wets while watering.
        pub fn set_watering(&mut self, index: usize, on: bool) {
            if let Some(ch) = self.channels.get_mut(index) {
                ch.watering = on;
            }
        }

        /// Sample every channel once. Simulated reads never fail.
        pub fn read_all(&mut self) -> [Option<u16>; SESSION_COUNT] {
            let full = f64::from(SENSOR_FULL_SCALE);
            let mut readings = [None; SESSION_COUNT];

            for (i, ch) in self.channels.iter_mut().enumerate() {
                let wet = if ch.watering { self.wet_rate } else { 0.0 };
                ch.base = (ch.base + self.drift_per_tick + wet).clamp(0.0, full);

                let noise = self.noise_sigma * 2.0 * (fastrand::f64() - 0.5);
                let raw = (ch.base + ch.offset + noise).round().clamp(0.0, full);
                readings[i] = Some(raw as u16);
            }

            readings
        }
    }

    // =======================================================================
    // Tests
    // =======================================================================

}

// ---------------------------------------------------------------------------
// Real ADC moisture bank (production — requires rppal + I2C hardware)
// ---------------------------------------------------------------------------

#[cfg(feature = "adc")]
pub use adc::MoistureBank;

#[cfg(feature = "adc")]
mod adc {
    use super::*;
    use std::{thread, time::Duration};
    use tracing::error;

    /// Conversion result register (read-only, 16-bit signed).
    const REG_CONVERSION: u8 = 0x00;
    /// Configuration register (read/write).
    const REG_CONFIG: u8 = 0x01;

    /// OS=1 (start), PGA=001 (±4.096 V), MODE=1 (single-shot),
    /// DR=100 (128 SPS), comparator disabled.
    const CONFIG_BASE: u16 = 0b1_000_001_1_100_0_0_0_11;

    /// MUX values for single-ended reads (AINx vs GND).
    const MUX_SINGLE_ENDED: [u16; 4] = [0b100, 0b101, 0b110, 0b111];
    const MUX_SHIFT: u8 = 12;

    /// Conversion time at 128 SPS is ~7.8 ms; 9 ms leaves margin.
    const CONVERSION_WAIT: Duration = Duration::from_millis(9);

    /// Five sessions span two converters: sessions 0–3 on the first chip,
    /// session 4 on the second.
    const CHIP_ADDRS: [u16; 2] = [0x48, 0x49];

    /// Moisture bank backed by ADS1115 converters on I2C bus 1.
    pub struct MoistureBank {
        i2c: I2c,
    }

    impl MoistureBank {
        pub fn new() -> Result<Self> {
            let i2c = I2c::new()?;
            tracing::info!(addrs = ?CHIP_ADDRS, "adc moisture bank initialised");
            Ok(Self { i2c })
        }

        /// Hardware senses real moisture; the simulator hook is a no-op.
        pub fn set_watering(&mut self, _index: usize, _on: bool) {}

        fn read_session(&mut self, index: usize) -> Result<u16> {
            let addr = CHIP_ADDRS[index / 4];
            let channel = index % 4;
            self.i2c.set_slave_address(addr)?;

            let config = CONFIG_BASE | (MUX_SINGLE_ENDED[channel] << MUX_SHIFT);
            self.i2c.block_write(REG_CONFIG, &config.to_be_bytes())?;
            thread::sleep(CONVERSION_WAIT);

            let mut buf = [0u8; 2];
            self.i2c.block_read(REG_CONVERSION, &mut buf)?;
            let raw = i16::from_be_bytes(buf).max(0) as u16;

            // 15-bit single-ended result, scaled to the engine's 12-bit
            // full scale.
            Ok(raw >> 3)
        }

        /// Read every session channel. A failed channel is logged and
        /// reported as `None`; the engine fails safe for that session.
        pub fn read_all(&mut self) -> [Option<u16>; SESSION_COUNT] {
            let mut readings = [None; SESSION_COUNT];
            for (i, slot) in readings.iter_mut().enumerate() {
                match self.read_session(i) {
                    Ok(v) => *slot = Some(v),
                    Err(e) => error!(session = i, "adc read failed: {e}"),
                }
            }
            readings
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
