//! One-time remote learning after power-up.
//!
//! Pressing any key on a remote while the device boots opens a learn session. The session takes
//! the remote's address, then the next seven key presses from that remote fill the profile slots
//! in [`Command::ALL`] order. The finished profile is handed back to be persisted in one piece;
//! nothing is stored before the last slot is filled.

use embassy_time::Duration;

use crate::ir_nec::IrFrame;
use crate::profile::{Command, KEY_COUNT, RemoteProfile, UNFILLED};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LearnState {
    /// Inside the boot window; the first frame starts learning.
    Booting,
    /// Session open but only a repeat code has been seen, so the address is still unknown.
    AwaitingLearnFrame,
    /// Address known; `slot` is the next slot to fill.
    Collecting { slot: u8 },
    Normal,
}

/// Keys collected so far in an open learn session.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LearnSession {
    captured_address: Option<u16>,
    profile: RemoteProfile,
    filled: u8,
}

impl LearnSession {
    fn new(captured_address: Option<u16>) -> Self {
        Self {
            captured_address,
            profile: RemoteProfile::unfilled(captured_address.unwrap_or_default()),
            filled: 0,
        }
    }

    #[must_use]
    pub const fn captured_address(&self) -> Option<u16> {
        self.captured_address
    }

    #[must_use]
    pub const fn filled_slots(&self) -> u8 {
        self.filled
    }
}

/// What a frame did to the learn flow.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LearnOutcome {
    /// Not learning; the frame is a normal command.
    NotLearning,
    /// The boot-window frame opened a session.
    SessionStarted,
    /// The session learned which remote it is listening to.
    AddressCaptured,
    /// A key was stored in the slot for `command`.
    SlotFilled { command: Command },
    /// The last slot was filled; persist this profile.
    Completed(RemoteProfile),
    /// Frame consumed by the session without effect (other remote, repeat code, sentinel key).
    Ignored,
}

#[derive(Clone, Debug)]
enum Phase {
    Booting,
    Learning(LearnSession),
    Normal,
}

/// Boot window and learn session state machine.
#[derive(Clone, Debug)]
pub struct LearnModeController {
    phase: Phase,
    boot_window: Duration,
}

impl LearnModeController {
    #[must_use]
    pub const fn new(boot_window: Duration) -> Self {
        Self {
            phase: Phase::Booting,
            boot_window,
        }
    }

    #[must_use]
    pub const fn state(&self) -> LearnState {
        match &self.phase {
            Phase::Booting => LearnState::Booting,
            Phase::Learning(LearnSession {
                captured_address: None,
                ..
            }) => LearnState::AwaitingLearnFrame,
            Phase::Learning(session) => LearnState::Collecting {
                slot: session.filled,
            },
            Phase::Normal => LearnState::Normal,
        }
    }

    #[must_use]
    pub const fn session(&self) -> Option<&LearnSession> {
        match &self.phase {
            Phase::Learning(session) => Some(session),
            _ => None,
        }
    }

    /// Main-loop poll. Ends the boot window once `since_boot` passes it with no frame seen.
    ///
    /// Returns `true` while the caller should keep polling.
    pub fn poll_boot(&mut self, since_boot: Duration) -> bool {
        match self.phase {
            Phase::Booting if since_boot >= self.boot_window => {
                info!("Learn: boot window closed, normal operation");
                self.phase = Phase::Normal;
                false
            }
            Phase::Booting => true,
            Phase::Learning(_) | Phase::Normal => false,
        }
    }

    /// Offer a decoded frame to the learn flow.
    pub fn on_frame(&mut self, frame: &IrFrame) -> LearnOutcome {
        match &mut self.phase {
            Phase::Normal => LearnOutcome::NotLearning,
            Phase::Booting => {
                let captured_address = (!frame.repeat).then(|| frame.address());
                info!("Learn: session started");
                self.phase = Phase::Learning(LearnSession::new(captured_address));
                LearnOutcome::SessionStarted
            }
            Phase::Learning(session) => {
                if frame.repeat {
                    return LearnOutcome::Ignored;
                }
                let Some(address) = session.captured_address else {
                    info!("Learn: listening to address 0x{:04X}", frame.address());
                    *session = LearnSession::new(Some(frame.address()));
                    return LearnOutcome::AddressCaptured;
                };
                let key = frame.command();
                if frame.address() != address || key == UNFILLED {
                    return LearnOutcome::Ignored;
                }

                let slot = usize::from(session.filled);
                let (Some(&command), Some(key_slot)) =
                    (Command::ALL.get(slot), session.profile.keys.get_mut(slot))
                else {
                    return LearnOutcome::Ignored;
                };
                *key_slot = key;
                session.filled = session.filled.saturating_add(1);
                info!("Learn: {} = 0x{:02X}", command, key);

                if usize::from(session.filled) == KEY_COUNT {
                    let profile = session.profile;
                    self.phase = Phase::Normal;
                    LearnOutcome::Completed(profile)
                } else {
                    LearnOutcome::SlotFilled { command }
                }
            }
        }
    }
}
