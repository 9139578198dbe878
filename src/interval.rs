//! Intervalometer: fires a single frame every `step × INTERVAL_TICK × postscaler`.
//!
//! The compare register is only eight bits wide, so the range is stretched with a software
//! postscaler: the compare interrupt counts a divider modulo the postscaler and the shutter only
//! fires when the divider wraps to zero. That spans roughly 180 ms up to 38 hours.

use embassy_time::Duration;

use crate::config::INTERVAL_TICK;

/// Smallest step allowed while the postscaler is at most [`SHORT_PERIOD_POSTSCALER`].
pub const MIN_SHORT_STEP: u8 = 11;
pub const SHORT_PERIOD_POSTSCALER: u16 = 4;
pub const MAX_POSTSCALER: u16 = 32_768;
const STEP_INCREMENT: u8 = 10;

/// A periodic hardware compare channel.
///
/// The compare value is written only from the channel's own compare handler
/// ([`IntervalScheduler::on_compare_match`]); callers stage a new value in the scheduler instead.
pub trait TimerChannel {
    /// The committed compare value in [`INTERVAL_TICK`] units.
    fn compare(&self) -> u8;
    /// Commit a new compare value. Only called from the compare handler.
    fn set_compare(&mut self, step: u8);
    /// Whether compare interrupts are delivered.
    fn is_enabled(&self) -> bool;
    /// Mask or unmask the compare interrupt. The counter keeps running either way.
    fn set_enabled(&mut self, enabled: bool);
}

/// Step, postscaler and divider of the intervalometer.
///
/// Pausing is not part of this state: the owner masks the channel with
/// [`TimerChannel::set_enabled`], which leaves the divider phase untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IntervalScheduler {
    step: u8,
    committed_step: u8,
    postscaler: u16,
    divider: u16,
}

impl Default for IntervalScheduler {
    fn default() -> Self {
        Self::new(31, 2)
    }
}

impl IntervalScheduler {
    /// Create a scheduler. The step is clamped to the valid range for the postscaler.
    ///
    /// # Panics
    /// Panics if `postscaler` is not a power of two in `1..=32768`.
    #[must_use]
    pub const fn new(step: u8, postscaler: u16) -> Self {
        assert!(
            postscaler.is_power_of_two() && postscaler <= MAX_POSTSCALER,
            "postscaler must be a power of two up to 32768"
        );
        let step = clamp_step(step, postscaler);
        Self {
            step,
            committed_step: step,
            postscaler,
            divider: 0,
        }
    }

    /// The requested step, which may not be committed to the channel yet.
    #[must_use]
    pub const fn step(&self) -> u8 {
        self.step
    }

    #[must_use]
    pub const fn postscaler(&self) -> u16 {
        self.postscaler
    }

    #[must_use]
    pub const fn divider(&self) -> u16 {
        self.divider
    }

    /// Whether a step change is waiting for the next compare interrupt.
    #[must_use]
    pub const fn has_pending_step(&self) -> bool {
        self.step != self.committed_step
    }

    /// Time between two single frames once pending changes are committed.
    #[must_use]
    pub fn period(&self) -> Duration {
        let ticks = u32::from(self.step).saturating_mul(u32::from(self.postscaler));
        INTERVAL_TICK.checked_mul(ticks).unwrap_or(Duration::MAX)
    }

    /// Compare-match handler. Commits a staged step, advances the divider and returns whether a
    /// single frame is due now.
    pub fn on_compare_match<T: TimerChannel>(&mut self, timer: &mut T) -> bool {
        if self.step != self.committed_step {
            timer.set_compare(self.step);
            self.committed_step = self.step;
        }
        // The postscaler is a power of two, so masking wraps the divider.
        self.divider = self.divider.wrapping_add(1) & self.postscaler.wrapping_sub(1);
        self.divider == 0
    }

    pub fn faster(&mut self) {
        self.step = clamp_step(self.step.saturating_sub(STEP_INCREMENT), self.postscaler);
    }

    pub fn slower(&mut self) {
        self.step = clamp_step(self.step.saturating_add(STEP_INCREMENT), self.postscaler);
    }

    /// Halve the postscaler, keeping the short-period floor on the step.
    pub fn double_speed(&mut self) {
        self.postscaler = (self.postscaler / 2).max(1);
        self.step = clamp_step(self.step, self.postscaler);
    }

    pub fn half_speed(&mut self) {
        self.postscaler = self.postscaler.saturating_mul(2).min(MAX_POSTSCALER);
    }
}

const fn clamp_step(step: u8, postscaler: u16) -> u8 {
    let floor = if postscaler <= SHORT_PERIOD_POSTSCALER {
        MIN_SHORT_STEP
    } else {
        1
    };
    if step < floor { floor } else { step }
}
