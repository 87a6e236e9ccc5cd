//! Two-line 16-column display. Frame text is laid out here from the
//! engine's `DisplayFrame`; the `gpio` feature drives a real HD44780 LCD
//! through a PCF8574 I2C backpack, otherwise frames go to the log.

use anyhow::Result;
#[cfg(feature = "gpio")]
use tracing::error;
#[cfg(not(feature = "gpio"))]
use tracing::info;

use garden_engine::{DisplayFrame, DisplayMode};

/// Character width of the display.
pub const LCD_COLS: usize = 16;

// ---------------------------------------------------------------------------
// Frame layout
// ---------------------------------------------------------------------------

/// Pad or truncate a line to exactly [`LCD_COLS`] characters.
fn fit(line: &str) -> String {
    let mut s: String = line.chars().take(LCD_COLS).collect();
    let used = s.chars().count();
    for _ in used..LCD_COLS {
        s.push(' ');
    }
    s
}

fn digit(on: bool) -> char {
    if on {
        '1'
    } else {
        '0'
    }
}

/// Lay out both lines for the current frame.
///
/// `summary` is a preformatted settings line shown on the status page
/// (e.g. `thr 30% dur 10m`); `net_label` and `clock_hhmm` feed the
/// network/time page. An unsynchronised clock renders as `--:--`.
pub fn render_frame(
    frame: &DisplayFrame,
    summary: &str,
    net_label: &str,
    clock_hhmm: Option<&str>,
) -> [String; 2] {
    match frame.mode {
        DisplayMode::Status => {
            let sessions: String = frame.sessions.iter().map(|&s| digit(s)).collect();
            let line0 = format!(
                "S:{sessions} P:{} L:{}",
                digit(frame.pump),
                digit(frame.light)
            );
            [fit(&line0), fit(summary)]
        }
        DisplayMode::NetworkInfo => {
            let line1 = format!("time {}", clock_hhmm.unwrap_or("--:--"));
            [fit(net_label), fit(&line1)]
        }
    }
}

// ---------------------------------------------------------------------------
// Real LCD (production — PCF8574 backpack on I2C bus 1)
// ---------------------------------------------------------------------------
#[cfg(feature = "gpio")]
mod lcd {
    use anyhow::Result;
    use rppal::i2c::I2c;
    use std::{thread, time::Duration};

    use super::LCD_COLS;

    /// I2C address of the PCF8574 backpack.
    const LCD_I2C_ADDR: u16 = 0x27;

    // ── PCF8574 → HD44780 bit mapping ──────────────────────────────
    //   P0 = RS, P1 = RW (kept low), P2 = EN, P3 = backlight,
    //   P4–P7 = data high nibble.
    const RS: u8 = 0x01;
    const EN: u8 = 0x04;
    const BACKLIGHT: u8 = 0x08;

    // ── HD44780 commands ───────────────────────────────────────────
    const CMD_CLEAR: u8 = 0x01;
    const CMD_ENTRY_MODE: u8 = 0x06; // increment, no shift
    const CMD_DISPLAY_ON: u8 = 0x0C; // display on, cursor off
    const CMD_FUNCTION_SET: u8 = 0x28; // 4-bit, 2 lines, 5x8 font
    const CMD_SET_DDRAM: u8 = 0x80;

    /// DDRAM offset of the second display row.
    const ROW1_OFFSET: u8 = 0x40;

    pub struct Lcd {
        i2c: I2c,
        backlight: bool,
    }

    impl Lcd {
        pub fn new() -> Result<Self> {
            let mut i2c = I2c::new()?;
            i2c.set_slave_address(LCD_I2C_ADDR)?;
            let mut lcd = Self {
                i2c,
                backlight: true,
            };

            // 4-bit init dance per the HD44780 datasheet: three 8-bit
            // function-set nibbles, then switch to 4-bit mode.
            thread::sleep(Duration::from_millis(50));
            for _ in 0..3 {
                lcd.write_nibble(0x30, false)?;
                thread::sleep(Duration::from_millis(5));
            }
            lcd.write_nibble(0x20, false)?;

            lcd.command(CMD_FUNCTION_SET)?;
            lcd.command(CMD_DISPLAY_ON)?;
            lcd.command(CMD_ENTRY_MODE)?;
            lcd.command(CMD_CLEAR)?;
            thread::sleep(Duration::from_millis(2));

            Ok(lcd)
        }

        /// Put the high nibble of `data` on P4–P7 and strobe EN.
        fn write_nibble(&mut self, data: u8, rs: bool) -> Result<()> {
            let byte = (data & 0xF0)
                | if rs { RS } else { 0 }
                | if self.backlight { BACKLIGHT } else { 0 };
            self.i2c.write(&[byte | EN])?;
            self.i2c.write(&[byte])?;
            Ok(())
        }

        fn send(&mut self, value: u8, rs: bool) -> Result<()> {
            self.write_nibble(value, rs)?;
            self.write_nibble(value << 4, rs)?;
            Ok(())
        }

        fn command(&mut self, cmd: u8) -> Result<()> {
            self.send(cmd, false)
        }

        pub fn write_row(&mut self, row: u8, text: &str) -> Result<()> {
            let offset = if row == 0 { 0 } else { ROW1_OFFSET };
            self.command(CMD_SET_DDRAM | offset)?;
            // The character ROM is ASCII; anything outside it becomes '?'.
            for c in text.chars().take(LCD_COLS) {
                let b = if c.is_ascii() { c as u8 } else { b'?' };
                self.send(b, true)?;
            }
            Ok(())
        }

        pub fn set_backlight(&mut self, on: bool) -> Result<()> {
            self.backlight = on;
            // Latch the backlight bit immediately, independent of writes.
            self.i2c
                .write(&[if on { BACKLIGHT } else { 0 }])?;
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Screen front-end
// ---------------------------------------------------------------------------

/// Owns the physical (or mock) display and skips rewrites when the frame
/// text has not changed.
pub struct Screen {
    last: Option<[String; 2]>,
    #[cfg(feature = "gpio")]
    lcd: lcd::Lcd,
}

impl Screen {
    pub fn new() -> Result<Self> {
        Ok(Self {
            last: None,
            #[cfg(feature = "gpio")]
            lcd: lcd::Lcd::new()?,
        })
    }

    /// Write both rows if the frame text changed. The display is not worth
    /// stopping irrigation for: a failed bus write is logged and the frame
    /// is retried on the next tick instead of surfacing an error.
    pub fn render(&mut self, lines: [String; 2]) {
        if self.last.as_ref() == Some(&lines) {
            return;
        }

        #[cfg(feature = "gpio")]
        if let Err(e) = self.write_rows(&lines) {
            error!("lcd write failed: {e:#}");
            return;
        }
        #[cfg(not(feature = "gpio"))]
        info!(line0 = %lines[0], line1 = %lines[1], "lcd");

        self.last = Some(lines);
    }

    #[cfg(feature = "gpio")]
    fn write_rows(&mut self, lines: &[String; 2]) -> Result<()> {
        self.lcd.write_row(0, &lines[0])?;
        self.lcd.write_row(1, &lines[1])?;
        Ok(())
    }

    /// Backlight writes are best-effort for the same reason as [`render`].
    ///
    /// [`render`]: Screen::render
    pub fn set_backlight(&mut self, on: bool) {
        #[cfg(feature = "gpio")]
        if let Err(e) = self.lcd.set_backlight(on) {
            error!(on, "lcd backlight write failed: {e:#}");
        }
        #[cfg(not(feature = "gpio"))]
        info!(on, "lcd backlight");
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use garden_engine::SESSION_COUNT;

    fn frame(mode: DisplayMode) -> DisplayFrame {
        DisplayFrame {
            mode,
            sessions: [false; SESSION_COUNT],
            pump: false,
            light: false,
            backlight_on: true,
        }
    }

    #[test]
    fn lines_are_exactly_display_width() {
        let lines = render_frame(&frame(DisplayMode::Status), "thr 30% dur 10m", "x", None);
        assert_eq!(lines[0].len(), LCD_COLS);
        assert_eq!(lines[1].len(), LCD_COLS);
    }

    #[test]
    fn status_line_shows_session_pump_light_digits() {
        let mut f = frame(DisplayMode::Status);
        f.sessions[0] = true;
        f.sessions[3] = true;
        f.pump = true;
        let lines = render_frame(&f, "", "", None);
        assert_eq!(lines[0].trim_end(), "S:10010 P:1 L:0");
    }

    #[test]
    fn network_page_shows_label_and_time() {
        let lines = render_frame(
            &frame(DisplayMode::NetworkInfo),
            "",
            "net: 10.0.0.12",
            Some("09:41"),
        );
        assert_eq!(lines[0].trim_end(), "net: 10.0.0.12");
        assert_eq!(lines[1].trim_end(), "time 09:41");
    }

    #[test]
    fn missing_clock_renders_placeholder() {
        let lines = render_frame(&frame(DisplayMode::NetworkInfo), "", "net", None);
        assert_eq!(lines[1].trim_end(), "time --:--");
    }

    #[test]
    fn overlong_label_is_truncated() {
        let lines = render_frame(
            &frame(DisplayMode::NetworkInfo),
            "",
            "a very long network label that cannot fit",
            None,
        );
        assert_eq!(lines[0].len(), LCD_COLS);
    }

    #[test]
    fn multibyte_label_still_fills_every_column() {
        let lines = render_frame(&frame(DisplayMode::NetworkInfo), "", "net: café ↑", None);
        assert_eq!(lines[0].chars().count(), LCD_COLS);
        assert_eq!(lines[1].chars().count(), LCD_COLS);
        assert!(lines[0].starts_with("net: café ↑"));
    }

    #[test]
    fn render_skips_identical_frames() {
        let mut screen = Screen::new().unwrap();
        let lines = render_frame(&frame(DisplayMode::Status), "s", "n", None);
        screen.render(lines.clone());
        screen.render(lines.clone());
        assert_eq!(screen.last.as_ref(), Some(&lines));
    }

    // Pins the infallible signatures: a display glitch must never bubble
    // an error into the control loop while relays are energised.
    #[test]
    fn display_writes_never_abort_the_caller() {
        let mut screen = Screen::new().unwrap();
        let lines = render_frame(&frame(DisplayMode::Status), "s", "n", None);
        let () = screen.render(lines);
        let () = screen.set_backlight(false);
    }
}
