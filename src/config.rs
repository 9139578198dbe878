//! Timing constants for the decoder, the interval timer and the relay sequences.
//!
//! Values that differ between camera bodies come from the build environment (see `build.rs`):
//! `SHUTTER_TIMING_MS` holds the three single-frame waits as `"t1,t2,t3"` and `BOOT_WINDOW_MS`
//! the length of the learn trigger window after power-up.

use embassy_time::Duration;

/// Length of one infrared decoder tick.
pub const IR_TICK: Duration = Duration::from_micros(64);

/// Length of one interval compare unit. A step of 11 at postscaler 1 is the shortest period.
pub const INTERVAL_TICK: Duration = Duration::from_micros(16_384);

/// How long after power-up an incoming frame starts a learn session.
pub const BOOT_WINDOW: Duration = Duration::from_millis(parse_u64(env!("BOOT_WINDOW_MS")));

/// Load pulse at the start of a metered run.
pub const LOAD_SETTLE: Duration = Duration::from_millis(250);
/// Gap between releasing one contact and driving the next one.
pub const CONTACT_GAP: Duration = Duration::from_millis(70);
/// Indicator pulse that doubles as the settle time after a stop.
pub const STOP_PULSE: Duration = Duration::from_millis(250);
/// Indicator pulse that doubles as the light metering time.
pub const METER_PULSE: Duration = Duration::from_millis(350);

pub const FLASH_ON: Duration = Duration::from_millis(60);
pub const FLASH_OFF: Duration = Duration::from_millis(90);
pub const DOUBLE_FLASH_GAP: Duration = Duration::from_millis(300);

/// Waits of the single-frame sequence: load pulse, shutter release, pre-charge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ShutterTiming {
    pub load: Duration,
    pub release: Duration,
    pub precharge: Duration,
}

impl ShutterTiming {
    #[must_use]
    pub const fn from_millis(load: u64, release: u64, precharge: u64) -> Self {
        Self {
            load: Duration::from_millis(load),
            release: Duration::from_millis(release),
            precharge: Duration::from_millis(precharge),
        }
    }

    /// Parse `"t1,t2,t3"` (milliseconds) at compile time. Spaces are ignored.
    ///
    /// # Panics
    /// Panics (at compile time in a `const`) unless the text holds exactly three decimal fields.
    #[must_use]
    pub const fn parse(text: &str) -> Self {
        let (load, rest) = parse_field(text.as_bytes());
        let (release, rest) = parse_field(skip_comma(rest));
        let (precharge, rest) = parse_field(skip_comma(rest));
        assert!(rest.is_empty(), "shutter timing needs exactly three fields");
        Self::from_millis(load, release, precharge)
    }
}

impl Default for ShutterTiming {
    fn default() -> Self {
        SHUTTER_TIMING
    }
}

/// Single-frame timing selected at build time.
pub const SHUTTER_TIMING: ShutterTiming = ShutterTiming::parse(env!("SHUTTER_TIMING_MS"));

const fn parse_u64(text: &str) -> u64 {
    let (value, rest) = parse_field(text.as_bytes());
    assert!(rest.is_empty(), "expected a decimal number");
    value
}

/// Read one decimal field, stopping at a comma. Returns the value and the unread bytes.
const fn parse_field(mut bytes: &[u8]) -> (u64, &[u8]) {
    let mut value = 0_u64;
    let mut digits = 0_u32;
    while let [byte, rest @ ..] = bytes {
        match *byte {
            b',' => break,
            b' ' => {}
            b'0'..=b'9' => {
                let Some(shifted) = value.checked_mul(10) else {
                    panic!("decimal field out of range");
                };
                let Some(sum) = shifted.checked_add(byte.wrapping_sub(b'0') as u64) else {
                    panic!("decimal field out of range");
                };
                value = sum;
                digits = digits.saturating_add(1);
            }
            _ => panic!("expected decimal milliseconds"),
        }
        bytes = rest;
    }
    assert!(digits > 0, "empty decimal field");
    (value, bytes)
}

const fn skip_comma(bytes: &[u8]) -> &[u8] {
    match bytes {
        [b',', rest @ ..] => rest,
        _ => panic!("shutter timing needs exactly three fields"),
    }
}
