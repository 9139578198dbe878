//! NEC infrared decoding from falling-edge timing alone.
//!
//! The receiver only reports falling edges, so every measurement is a full mark+space period:
//! 13.5 ms for a leader, 11.25 ms for a repeat code, 2.25 ms for a one bit and 1.125 ms for a
//! zero bit. Periods are counted in [`IR_TICK`](crate::config::IR_TICK) units on an 8-bit
//! free-running counter that is restarted on every edge.
//!
//! See [`IrDecoder`] for usage examples.

// ===== Public API ===========================================================

/// A decoded 32-bit NEC payload.
///
/// The low 16 bits carry the remote address, the next 8 bits the command byte. `repeat` is set
/// when the frame was produced by a repeat code rather than by a full transmission.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IrFrame {
    pub bits: u32,
    pub repeat: bool,
}

impl IrFrame {
    #[must_use]
    pub const fn new(bits: u32) -> Self {
        Self {
            bits,
            repeat: false,
        }
    }

    /// Build a frame from an address and a command byte (inverted command in the top byte).
    #[must_use]
    pub const fn from_parts(address: u16, command: u8) -> Self {
        let [low, high] = address.to_le_bytes();
        Self::new(u32::from_le_bytes([low, high, command, !command]))
    }

    #[must_use]
    pub const fn address(&self) -> u16 {
        let [low, high, _, _] = self.bits.to_le_bytes();
        u16::from_le_bytes([low, high])
    }

    /// The raw command byte.
    #[must_use]
    pub const fn command(&self) -> u8 {
        let [_, _, command, _] = self.bits.to_le_bytes();
        command
    }

    /// The top seven bits of the command byte, dropping the parity bit some remotes send in bit 0.
    #[must_use]
    pub const fn command7(&self) -> u8 {
        self.command() / 2
    }

    #[must_use]
    pub const fn as_repeat(self) -> Self {
        Self {
            bits: self.bits,
            repeat: true,
        }
    }
}

/// The edge timer as seen by the decoder.
///
/// On the reference hardware this is an 8-bit counter with an overflow flag; the decoder reads it
/// once per edge and always restarts it before returning.
pub trait EdgeCounter {
    /// Ticks since the counter was last restarted.
    fn elapsed_ticks(&self) -> u8;
    /// Whether the counter wrapped since it was last restarted.
    fn overflowed(&self) -> bool;
    /// Zero the counter and clear its overflow and interrupt flags.
    fn restart(&mut self);
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecoderState {
    AwaitingLeader,
    ReceivingBits { bit_index: u8 },
}

/// Turns edge periods into [`IrFrame`]s.
///
/// # Examples
/// ```
/// use camera_remote::ir_nec::{IrDecoder, IrFrame};
///
/// let sent = IrFrame::from_parts(0xEF10, 0x0A);
/// let mut decoder = IrDecoder::new();
/// assert_eq!(decoder.feed(211, false), None); // leader
/// let mut received = None;
/// for bit_index in 0..32 {
///     let ticks = if sent.bits >> bit_index & 1 == 1 { 35 } else { 18 };
///     received = decoder.feed(ticks, false);
/// }
/// assert_eq!(received, Some(sent));
/// assert_eq!(decoder.feed(176, false), Some(sent.as_repeat()));
/// ```
#[derive(Clone, Debug)]
pub struct IrDecoder {
    state: DecoderState,
    buffer: u32,
    last_frame: Option<IrFrame>,
}

impl Default for IrDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl IrDecoder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: DecoderState::AwaitingLeader,
            buffer: 0,
            last_frame: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> DecoderState {
        self.state
    }

    /// Bits collected so far for the frame in flight.
    #[must_use]
    pub const fn buffer(&self) -> u32 {
        self.buffer
    }

    /// Handle one edge: read the counter, classify, then restart the counter whatever happened.
    pub fn on_edge<C: EdgeCounter>(&mut self, counter: &mut C) -> Option<IrFrame> {
        let frame = self.feed(counter.elapsed_ticks(), counter.overflowed());
        counter.restart();
        frame
    }

    /// Classify one edge period. Returns a frame when one completes or a repeat code arrives.
    pub fn feed(&mut self, elapsed: u8, overflow: bool) -> Option<IrFrame> {
        match self.state {
            DecoderState::AwaitingLeader => {
                if overflow {
                    return None;
                }
                if inr(elapsed, LEADER) {
                    self.buffer = 0;
                    self.state = DecoderState::ReceivingBits { bit_index: 0 };
                    None
                } else if inr(elapsed, REPEAT) {
                    self.last_frame.map(IrFrame::as_repeat)
                } else {
                    None
                }
            }
            DecoderState::ReceivingBits { bit_index } => {
                if overflow || elapsed > BIT_TIMEOUT {
                    debug!("IR: frame abandoned at bit {} ({} ticks)", bit_index, elapsed);
                    self.state = DecoderState::AwaitingLeader;
                    return None;
                }

                let mask = 1_u32.wrapping_shl(u32::from(bit_index));
                if elapsed > BIT_ONE_MIN {
                    self.buffer |= mask;
                } else {
                    self.buffer &= !mask;
                }

                let mut frame = None;
                if bit_index == 31 {
                    let completed = IrFrame::new(self.buffer);
                    debug!(
                        "IR: addr=0x{:04X} cmd=0x{:02X}",
                        completed.address(),
                        completed.command()
                    );
                    self.last_frame = Some(completed);
                    frame = Some(completed);
                }

                let next = bit_index.saturating_add(1);
                self.state = if next >= 32 {
                    DecoderState::AwaitingLeader
                } else {
                    DecoderState::ReceivingBits { bit_index: next }
                };
                frame
            }
        }
    }
}

#[inline]
const fn inr(x: u8, r: (u8, u8)) -> bool {
    x >= r.0 && x <= r.1
}

// 64 µs tick windows
const LEADER: (u8, u8) = (194, 228);
const REPEAT: (u8, u8) = (159, 193);
const BIT_TIMEOUT: u8 = 44;
const BIT_ONE_MIN: u8 = 26; // anything longer than this is a one
