//! Remote profiles: which key on which remote means which camera command.
//!
//! Two profiles exist at run time: [`DEFAULT_PROFILE`], compiled in for the supported remote
//! family, and at most one learned profile loaded from storage. The same [`RemoteProfile`] value
//! is used in memory and on flash.

use serde::{Deserialize, Serialize};

use crate::ir_nec::IrFrame;

/// Number of key slots in a profile.
pub const KEY_COUNT: usize = 7;

/// Marks a key slot that has not been learned yet.
pub const UNFILLED: u8 = 0xFF;

/// Key code of the legacy play button on the older white remote. It shares the address of the
/// default family and is only honored until the extended remote has identified itself.
pub const WHITE_PLAY_KEY: u8 = 0x20;

/// Logical camera commands, in learning order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Play,
    SingleFrame,
    IntervalToggle,
    Faster,
    Slower,
    DoubleSpeed,
    HalfSpeed,
}

impl Command {
    /// Slot order used by profiles and by the learn session.
    pub const ALL: [Self; KEY_COUNT] = [
        Self::Play,
        Self::SingleFrame,
        Self::IntervalToggle,
        Self::Faster,
        Self::Slower,
        Self::DoubleSpeed,
        Self::HalfSpeed,
    ];

    /// Whether a held key (repeat codes) keeps applying the command.
    #[must_use]
    pub const fn repeats(self) -> bool {
        matches!(
            self,
            Self::Faster | Self::Slower | Self::DoubleSpeed | Self::HalfSpeed
        )
    }
}

/// How a key code is taken out of a frame's command byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyEncoding {
    /// The whole command byte.
    Byte,
    /// The top seven bits; bit 0 is a parity bit and is ignored.
    SevenBit,
}

impl KeyEncoding {
    #[must_use]
    pub const fn key(self, frame: &IrFrame) -> u8 {
        match self {
            Self::Byte => frame.command(),
            Self::SevenBit => frame.command7(),
        }
    }
}

/// A remote's address plus the key code for each [`Command`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RemoteProfile {
    pub address: u16,
    pub encoding: KeyEncoding,
    pub keys: [u8; KEY_COUNT],
}

impl RemoteProfile {
    /// A profile for `address` with every slot unfilled.
    #[must_use]
    pub const fn unfilled(address: u16) -> Self {
        Self {
            address,
            encoding: KeyEncoding::Byte,
            keys: [UNFILLED; KEY_COUNT],
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.keys.iter().all(|&key| key != UNFILLED)
    }

    #[must_use]
    pub fn matches(&self, frame: &IrFrame) -> bool {
        self.address == frame.address()
    }

    #[must_use]
    pub const fn key_of(&self, frame: &IrFrame) -> u8 {
        self.encoding.key(frame)
    }

    /// The command bound to this frame's key, if any. The first matching slot wins.
    #[must_use]
    pub fn lookup(&self, frame: &IrFrame) -> Option<Command> {
        let key = self.key_of(frame);
        if key == UNFILLED {
            return None;
        }
        self.keys
            .iter()
            .zip(Command::ALL)
            .find(|(slot, _)| **slot == key)
            .map(|(_, command)| command)
    }
}

/// The compiled-in profile for the supported remote family.
pub const DEFAULT_PROFILE: RemoteProfile = RemoteProfile {
    address: 0xEF10,
    encoding: KeyEncoding::SevenBit,
    keys: [
        0x05, // Play
        0x0A, // SingleFrame
        0x0C, // IntervalToggle
        0x11, // Faster
        0x12, // Slower
        0x15, // DoubleSpeed
        0x16, // HalfSpeed
    ],
};
