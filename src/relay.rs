//! Relay sequences that stand in for the camera's two-slider mechanical remote switch.
//!
//! The switch has a light meter slider (off/on) and a release slider that walks through
//! hold, load and start. Each slider position is one relay here. The camera only accepts the
//! positions in the right order and with the right settle times, so every sequence is a fixed,
//! blocking series of pin writes and waits that must never be interleaved with another one.

use embassy_time::Duration;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{OutputPin, PinState, StatefulOutputPin};

use crate::config::{
    CONTACT_GAP, DOUBLE_FLASH_GAP, FLASH_OFF, FLASH_ON, LOAD_SETTLE, METER_PULSE, STOP_PULSE,
    ShutterTiming,
};
use crate::{Error, Result};

/// Whether the next single frame has to take a light reading first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LightmeterMode {
    #[default]
    FirstSingleShot,
    SubsequentSingleShot,
}

/// The four relay lines and the status indicator.
pub struct RelayPins<P> {
    pub lightmeter: P,
    pub hold: P,
    pub load: P,
    pub start: P,
    pub indicator: P,
}

/// Runs the camera start/stop sequences on a set of relay pins.
pub struct RelaySequencer<P, D> {
    pins: RelayPins<P>,
    delay: D,
    timing: ShutterTiming,
    lightmeter_mode: LightmeterMode,
}

impl<P, D> RelaySequencer<P, D>
where
    P: StatefulOutputPin,
    D: DelayNs,
{
    /// Take the pins and release every relay.
    ///
    /// # Errors
    /// Returns an error if a pin cannot be driven.
    pub fn new(pins: RelayPins<P>, delay: D, timing: ShutterTiming) -> Result<Self> {
        let mut relay_sequencer = Self {
            pins,
            delay,
            timing,
            lightmeter_mode: LightmeterMode::default(),
        };
        let RelayPins {
            lightmeter,
            hold,
            load,
            start,
            indicator,
        } = &mut relay_sequencer.pins;
        for pin in [start, load, hold, lightmeter, indicator] {
            set(pin, false)?;
        }
        Ok(relay_sequencer)
    }

    #[must_use]
    pub const fn lightmeter_mode(&self) -> LightmeterMode {
        self.lightmeter_mode
    }

    #[must_use]
    pub const fn timing(&self) -> ShutterTiming {
        self.timing
    }

    /// An exposure run is open exactly while the light meter relay is driven.
    ///
    /// # Errors
    /// Returns an error if the pin state cannot be read back.
    pub fn is_exposure_open(&mut self) -> Result<bool> {
        self.pins
            .lightmeter
            .is_set_high()
            .map_err(|_| Error::CannotSetOutputState)
    }

    /// Meter, then open the shutter and leave it open until [`Self::stop_run`].
    ///
    /// # Errors
    /// Returns an error if a pin cannot be driven.
    pub fn start_run_with_metering(&mut self) -> Result<()> {
        info!("Relay: start run");
        set(&mut self.pins.lightmeter, true)?;
        set(&mut self.pins.hold, true)?;
        set(&mut self.pins.load, true)?;
        self.wait(LOAD_SETTLE);
        set(&mut self.pins.load, false)?;
        self.wait(CONTACT_GAP);
        set(&mut self.pins.start, true)
    }

    /// Close the open run and return the switch to rest.
    ///
    /// # Errors
    /// Returns an error if a pin cannot be driven.
    pub fn stop_run(&mut self) -> Result<()> {
        info!("Relay: stop run");
        set(&mut self.pins.start, false)?;
        self.wait(CONTACT_GAP);
        set(&mut self.pins.hold, false)?;
        set(&mut self.pins.lightmeter, false)?;
        self.pulse_indicator(STOP_PULSE)?;
        self.lightmeter_mode = LightmeterMode::FirstSingleShot;
        Ok(())
    }

    /// Take one light reading for the single frames that follow.
    ///
    /// # Errors
    /// Returns an error if a pin cannot be driven.
    pub fn meter_once(&mut self) -> Result<()> {
        info!("Relay: meter");
        set(&mut self.pins.lightmeter, true)?;
        self.pulse_indicator(METER_PULSE)?;
        set(&mut self.pins.lightmeter, false)?;
        self.lightmeter_mode = LightmeterMode::SubsequentSingleShot;
        Ok(())
    }

    /// Expose one frame, then pre-charge the load contact for the next one.
    ///
    /// # Errors
    /// Returns an error if a pin cannot be driven.
    pub fn single_frame(&mut self) -> Result<()> {
        let ShutterTiming {
            load,
            release,
            precharge,
        } = self.timing;
        set(&mut self.pins.load, true)?;
        self.wait(load);
        set(&mut self.pins.load, false)?;
        set(&mut self.pins.start, true)?;
        self.wait(release);
        set(&mut self.pins.start, false)?;
        set(&mut self.pins.load, true)?;
        self.wait(precharge);
        set(&mut self.pins.load, false)
    }

    /// One short indicator blink: "command accepted".
    ///
    /// # Errors
    /// Returns an error if the indicator cannot be driven.
    pub fn flash(&mut self) -> Result<()> {
        self.pulse_indicator(FLASH_ON)?;
        self.wait(FLASH_OFF);
        Ok(())
    }

    /// Two quick blinks: a learn session started.
    ///
    /// # Errors
    /// Returns an error if the indicator cannot be driven.
    pub fn double_flash(&mut self) -> Result<()> {
        self.flash()?;
        self.flash()
    }

    /// `count` double blinks separated by a pause: a learned profile was stored.
    ///
    /// # Errors
    /// Returns an error if the indicator cannot be driven.
    pub fn double_flashes(&mut self, count: u8) -> Result<()> {
        for index in 0..count {
            if index > 0 {
                self.wait(DOUBLE_FLASH_GAP);
            }
            self.double_flash()?;
        }
        Ok(())
    }

    fn pulse_indicator(&mut self, duration: Duration) -> Result<()> {
        set(&mut self.pins.indicator, true)?;
        self.wait(duration);
        set(&mut self.pins.indicator, false)
    }

    fn wait(&mut self, duration: Duration) {
        self.delay
            .delay_us(u32::try_from(duration.as_micros()).unwrap_or(u32::MAX));
    }
}

#[inline]
fn set<P: OutputPin>(pin: &mut P, high: bool) -> Result<()> {
    pin.set_state(PinState::from(high))
        .map_err(|_| Error::CannotSetOutputState)
}
