//! Maps a decoded frame to a camera action.
//!
//! Lookup order for a frame's address: the learned profile, then [`DEFAULT_PROFILE`], then the
//! unknown-remote fallback where any real key toggles a run. Learning is handled before this
//! module sees a frame.

use crate::ir_nec::IrFrame;
use crate::profile::{Command, DEFAULT_PROFILE, RemoteProfile, WHITE_PLAY_KEY};
use crate::relay::LightmeterMode;

/// Key bytes an unknown remote can send that are never treated as a key press.
const SENTINEL_KEYS: [u8; 2] = [0x00, 0xFF];

/// How a frame resolved against the profiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolution {
    Command(Command),
    /// A known remote sent a key with no binding.
    Unmapped,
    /// An unknown remote sent a sentinel key byte.
    Ignored,
}

/// The relay or interval operation to run for a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CameraAction {
    StartRunWithMetering,
    StopRun,
    MeterThenSingleFrame,
    SingleFrame,
    ToggleInterval,
    Faster,
    Slower,
    DoubleSpeed,
    HalfSpeed,
}

/// A camera action plus whether to blink the indicator once it ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Decision {
    pub action: Option<CameraAction>,
    pub flash: bool,
}

impl Decision {
    const NONE: Self = Self {
        action: None,
        flash: false,
    };
}

/// Resolves frames into [`Decision`]s.
///
/// The only state is the extended-remote latch: the older white remote shares its address with
/// the default family and sends [`WHITE_PLAY_KEY`] for play. Once the extended remote has sent
/// its own Play or SingleFrame key, the white play key is no longer honored until power-off.
#[derive(Clone, Debug, Default)]
pub struct CommandDispatcher {
    extended_remote_confirmed: bool,
}

impl CommandDispatcher {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            extended_remote_confirmed: false,
        }
    }

    #[must_use]
    pub const fn extended_remote_confirmed(&self) -> bool {
        self.extended_remote_confirmed
    }

    /// Find the command a frame stands for.
    pub fn resolve(&mut self, frame: &IrFrame, learned: Option<&RemoteProfile>) -> Resolution {
        if let Some(profile) = learned.filter(|profile| profile.matches(frame)) {
            return profile
                .lookup(frame)
                .map_or(Resolution::Unmapped, Resolution::Command);
        }

        if DEFAULT_PROFILE.matches(frame) {
            return match DEFAULT_PROFILE.lookup(frame) {
                Some(command @ (Command::Play | Command::SingleFrame)) => {
                    if !self.extended_remote_confirmed {
                        info!("Dispatch: extended remote confirmed");
                    }
                    self.extended_remote_confirmed = true;
                    Resolution::Command(command)
                }
                Some(command) => Resolution::Command(command),
                None if DEFAULT_PROFILE.key_of(frame) == WHITE_PLAY_KEY
                    && !self.extended_remote_confirmed =>
                {
                    Resolution::Command(Command::Play)
                }
                None => Resolution::Unmapped,
            };
        }

        if SENTINEL_KEYS.contains(&frame.command()) {
            Resolution::Ignored
        } else {
            Resolution::Command(Command::Play)
        }
    }

    /// Decide what to do with a frame given the current relay state.
    pub fn decide(
        &mut self,
        frame: &IrFrame,
        learned: Option<&RemoteProfile>,
        exposure_open: bool,
        lightmeter_mode: LightmeterMode,
    ) -> Decision {
        let command = match self.resolve(frame, learned) {
            Resolution::Command(command) => command,
            resolution => {
                debug!(
                    "Dispatch: no action for addr=0x{:04X} ({})",
                    frame.address(),
                    resolution
                );
                return Decision::NONE;
            }
        };
        if frame.repeat && !command.repeats() {
            return Decision::NONE;
        }

        let action = match command {
            Command::Play if exposure_open => CameraAction::StopRun,
            Command::Play => CameraAction::StartRunWithMetering,
            Command::SingleFrame => match lightmeter_mode {
                LightmeterMode::FirstSingleShot => CameraAction::MeterThenSingleFrame,
                LightmeterMode::SubsequentSingleShot => CameraAction::SingleFrame,
            },
            Command::IntervalToggle => CameraAction::ToggleInterval,
            Command::Faster => CameraAction::Faster,
            Command::Slower => CameraAction::Slower,
            Command::DoubleSpeed => CameraAction::DoubleSpeed,
            Command::HalfSpeed => CameraAction::HalfSpeed,
        };
        Decision {
            action: Some(action),
            flash: !frame.repeat,
        }
    }
}
