//! The device as a whole: every piece of state the two interrupt sources share.
//!
//! There is exactly one [`CameraRemote`] per device. Its handlers are meant to be called from
//! run-to-completion contexts that cannot preempt each other (see `crate::pico`), which is what
//! makes the plain `&mut self` access sound without further locking:
//!
//! | State                      | Sole writer                                  |
//! |----------------------------|----------------------------------------------|
//! | decoder buffer / bit index | [`CameraRemote::on_ir_edge`]                 |
//! | learn session, learned key | [`CameraRemote::on_frame`], [`CameraRemote::poll_boot`] |
//! | step / postscaler (staged) | [`CameraRemote::on_frame`]                   |
//! | divider, committed compare | [`CameraRemote::on_interval_compare`]        |
//! | timer enable bit           | [`CameraRemote::on_frame`]                   |
//! | relays, lightmeter mode    | whichever handler runs a sequence            |

use embassy_time::Duration;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::StatefulOutputPin;

use crate::dispatch::{CameraAction, CommandDispatcher, Decision};
use crate::interval::{IntervalScheduler, TimerChannel};
use crate::ir_nec::{EdgeCounter, IrDecoder, IrFrame};
use crate::learn::{LearnModeController, LearnOutcome, LearnState};
use crate::profile::RemoteProfile;
use crate::relay::RelaySequencer;
use crate::store::{ByteStore, ProfileStore};
use crate::Result;

/// Number of double blinks that confirm a stored profile.
const LEARNED_CONFIRM_FLASHES: u8 = 5;

/// Decoder, learn flow, dispatcher, intervalometer and relays of one device.
pub struct CameraRemote<P, D, T, S> {
    decoder: IrDecoder,
    learn: LearnModeController,
    dispatcher: CommandDispatcher,
    scheduler: IntervalScheduler,
    relays: RelaySequencer<P, D>,
    timer: T,
    store: ProfileStore<S>,
    learned: Option<RemoteProfile>,
}

impl<P, D, T, S> CameraRemote<P, D, T, S>
where
    P: StatefulOutputPin,
    D: DelayNs,
    T: TimerChannel,
    S: ByteStore,
{
    /// Assemble the device at power-up and load the learned profile, if any.
    ///
    /// Programs the timer's initial compare value and leaves it disabled; call this before the
    /// compare interrupt can fire.
    pub fn new(
        relays: RelaySequencer<P, D>,
        mut timer: T,
        store: S,
        scheduler: IntervalScheduler,
        boot_window: Duration,
    ) -> Self {
        let mut store = ProfileStore::new(store);
        let learned = store.load().unwrap_or_else(|err| {
            error!("CameraRemote: ignoring stored profile: {}", err);
            None
        });
        timer.set_compare(scheduler.step());
        timer.set_enabled(false);
        Self {
            decoder: IrDecoder::new(),
            learn: LearnModeController::new(boot_window),
            dispatcher: CommandDispatcher::new(),
            scheduler,
            relays,
            timer,
            store,
            learned,
        }
    }

    #[must_use]
    pub const fn decoder(&self) -> &IrDecoder {
        &self.decoder
    }

    #[must_use]
    pub const fn learn_state(&self) -> LearnState {
        self.learn.state()
    }

    #[must_use]
    pub const fn learned_profile(&self) -> Option<&RemoteProfile> {
        self.learned.as_ref()
    }

    #[must_use]
    pub const fn scheduler(&self) -> &IntervalScheduler {
        &self.scheduler
    }

    #[must_use]
    pub const fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    #[must_use]
    pub const fn timer(&self) -> &T {
        &self.timer
    }

    pub fn relays(&mut self) -> &mut RelaySequencer<P, D> {
        &mut self.relays
    }

    /// Power-off: give back the byte store so a new device can boot from it.
    pub fn into_store(self) -> S {
        self.store.into_inner()
    }

    /// Main-loop boot check. Returns `true` while the boot window is still open.
    pub fn poll_boot(&mut self, since_boot: Duration) -> bool {
        self.learn.poll_boot(since_boot)
    }

    /// Infrared edge interrupt.
    pub fn on_ir_edge<C: EdgeCounter>(&mut self, counter: &mut C) {
        if let Some(frame) = self.decoder.on_edge(counter) {
            self.on_frame(frame);
        }
    }

    /// Interval compare interrupt. Masked compare interrupts are never delivered here.
    pub fn on_interval_compare(&mut self) {
        if !self.timer.is_enabled() {
            return;
        }
        if self.scheduler.on_compare_match(&mut self.timer) {
            if let Err(err) = self.relays.single_frame() {
                error!("CameraRemote: interval frame failed: {}", err);
            }
        }
    }

    /// A complete or repeated frame from the decoder.
    pub fn on_frame(&mut self, frame: IrFrame) {
        if let Err(err) = self.handle_frame(frame) {
            error!("CameraRemote: frame handling failed: {}", err);
        }
    }

    fn handle_frame(&mut self, frame: IrFrame) -> Result<()> {
        match self.learn.on_frame(&frame) {
            LearnOutcome::NotLearning => self.dispatch(&frame),
            LearnOutcome::SessionStarted | LearnOutcome::AddressCaptured => {
                self.relays.double_flash()
            }
            LearnOutcome::SlotFilled { .. } => self.relays.flash(),
            LearnOutcome::Completed(profile) => {
                self.learned = Some(profile);
                self.store.save(&profile)?;
                self.relays.double_flashes(LEARNED_CONFIRM_FLASHES)
            }
            LearnOutcome::Ignored => Ok(()),
        }
    }

    fn dispatch(&mut self, frame: &IrFrame) -> Result<()> {
        let exposure_open = self.relays.is_exposure_open()?;
        let Decision { action, flash } = self.dispatcher.decide(
            frame,
            self.learned.as_ref(),
            exposure_open,
            self.relays.lightmeter_mode(),
        );
        let Some(action) = action else {
            return Ok(());
        };
        self.execute(action)?;
        if flash {
            self.relays.flash()?;
        }
        Ok(())
    }

    fn execute(&mut self, action: CameraAction) -> Result<()> {
        match action {
            CameraAction::StartRunWithMetering => return self.relays.start_run_with_metering(),
            CameraAction::StopRun => return self.relays.stop_run(),
            CameraAction::MeterThenSingleFrame => {
                self.relays.meter_once()?;
                return self.relays.single_frame();
            }
            CameraAction::SingleFrame => return self.relays.single_frame(),
            CameraAction::ToggleInterval => {
                // Pause or resume; the counter and divider phase are kept.
                let enabled = !self.timer.is_enabled();
                self.timer.set_enabled(enabled);
                info!("Interval: {}", if enabled { "running" } else { "paused" });
                return Ok(());
            }
            CameraAction::Faster => self.scheduler.faster(),
            CameraAction::Slower => self.scheduler.slower(),
            CameraAction::DoubleSpeed => self.scheduler.double_speed(),
            CameraAction::HalfSpeed => self.scheduler.half_speed(),
        }
        info!(
            "Interval: step={} postscaler={} period={}ms",
            self.scheduler.step(),
            self.scheduler.postscaler(),
            self.scheduler.period().as_millis()
        );
        Ok(())
    }
}
