//! Host fakes shared by the integration tests: recording pins on a virtual clock, a delay that
//! advances that clock, an in-memory byte store, a compare channel and an edge counter.
#![allow(dead_code, reason = "each test crate uses a different subset of the fakes")]

use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::rc::Rc;

use camera_remote::config::{BOOT_WINDOW, ShutterTiming};
use camera_remote::interval::{IntervalScheduler, TimerChannel};
use camera_remote::ir_nec::{EdgeCounter, IrFrame};
use camera_remote::relay::{RelayPins, RelaySequencer};
use camera_remote::store::{ByteStore, RECORD_SIZE};
use camera_remote::{CameraRemote, Error, Result};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin, StatefulOutputPin};

pub const TEST_TIMING: ShutterTiming = ShutterTiming::from_millis(10, 20, 50);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinEvent {
    pub pin: &'static str,
    pub high: bool,
    pub at_us: u64,
}

/// Virtual clock plus the log of every pin write.
#[derive(Clone, Default)]
pub struct Recorder {
    clock: Rc<Cell<u64>>,
    events: Rc<RefCell<Vec<PinEvent>>>,
    baseline: Rc<RefCell<Vec<(&'static str, bool)>>>,
}

impl Recorder {
    pub fn pin(&self, name: &'static str) -> MockPin {
        MockPin {
            name,
            high: false,
            recorder: self.clone(),
        }
    }

    pub fn delay(&self) -> MockDelay {
        MockDelay {
            clock: Rc::clone(&self.clock),
        }
    }

    pub fn now_us(&self) -> u64 {
        self.clock.get()
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.get() / 1_000
    }

    pub fn events(&self) -> Vec<PinEvent> {
        self.events.borrow().clone()
    }

    /// Writes that changed a pin's level, ignoring redundant writes.
    pub fn transitions(&self) -> Vec<(&'static str, bool, u64)> {
        let mut levels = self.baseline.borrow().clone();
        let mut transitions = Vec::new();
        for event in self.events.borrow().iter() {
            let previous = levels
                .iter_mut()
                .find(|(pin, _)| *pin == event.pin)
                .map(|(_, level)| level);
            let changed = match previous {
                Some(level) if *level == event.high => false,
                Some(level) => {
                    *level = event.high;
                    true
                }
                None => {
                    levels.push((event.pin, event.high));
                    event.high
                }
            };
            if changed {
                transitions.push((event.pin, event.high, event.at_us / 1_000));
            }
        }
        transitions
    }

    /// Transitions of one pin as `(level, ms)` pairs.
    pub fn pin_transitions(&self, pin: &str) -> Vec<(bool, u64)> {
        self.transitions()
            .into_iter()
            .filter(|(name, _, _)| *name == pin)
            .map(|(_, high, at_ms)| (high, at_ms))
            .collect()
    }

    /// Current level of a pin according to the log.
    pub fn level(&self, pin: &str) -> bool {
        self.events
            .borrow()
            .iter()
            .rev()
            .find(|event| event.pin == pin)
            .map(|event| event.high)
            .or_else(|| {
                self.baseline
                    .borrow()
                    .iter()
                    .find(|(name, _)| *name == pin)
                    .map(|(_, high)| *high)
            })
            .unwrap_or(false)
    }

    pub fn rising_edges(&self, pin: &str) -> usize {
        self.pin_transitions(pin)
            .iter()
            .filter(|(high, _)| *high)
            .count()
    }

    /// Drop the log, remembering each pin's level so later transitions stay accurate.
    pub fn clear(&self) {
        let levels: Vec<(&'static str, bool)> = ["lightmeter", "hold", "load", "start", "indicator"]
            .into_iter()
            .map(|pin| (pin, self.level(pin)))
            .collect();
        *self.baseline.borrow_mut() = levels;
        self.events.borrow_mut().clear();
    }
}

pub struct MockPin {
    name: &'static str,
    high: bool,
    recorder: Recorder,
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> core::result::Result<(), Self::Error> {
        self.write(false);
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), Self::Error> {
        self.write(true);
        Ok(())
    }
}

impl StatefulOutputPin for MockPin {
    fn is_set_high(&mut self) -> core::result::Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_set_low(&mut self) -> core::result::Result<bool, Self::Error> {
        Ok(!self.high)
    }
}

impl MockPin {
    fn write(&mut self, high: bool) {
        self.high = high;
        self.recorder.events.borrow_mut().push(PinEvent {
            pin: self.name,
            high,
            at_us: self.recorder.clock.get(),
        });
    }
}

pub struct MockDelay {
    clock: Rc<Cell<u64>>,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.clock.set(self.clock.get() + u64::from(ns) / 1_000);
    }

    fn delay_us(&mut self, us: u32) {
        self.clock.set(self.clock.get() + u64::from(us));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.clock.set(self.clock.get() + u64::from(ms) * 1_000);
    }
}

pub fn relay_pins(recorder: &Recorder) -> RelayPins<MockPin> {
    RelayPins {
        lightmeter: recorder.pin("lightmeter"),
        hold: recorder.pin("hold"),
        load: recorder.pin("load"),
        start: recorder.pin("start"),
        indicator: recorder.pin("indicator"),
    }
}

/// A relay sequencer on recording pins, with the power-up writes already cleared from the log.
pub fn relay_sequencer(recorder: &Recorder) -> RelaySequencer<MockPin, MockDelay> {
    let relay_sequencer = RelaySequencer::new(relay_pins(recorder), recorder.delay(), TEST_TIMING)
        .expect("mock pins are infallible");
    recorder.clear();
    relay_sequencer
}

/// Byte store backed by a vector, initialised like erased flash.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    pub bytes: Vec<u8>,
    pub puts: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            bytes: vec![0xFF; RECORD_SIZE * 2],
            puts: 0,
        }
    }
}

impl ByteStore for MemoryStore {
    fn get(&mut self, offset: u32, buffer: &mut [u8]) -> Result<()> {
        let start = offset as usize;
        let bytes = self
            .bytes
            .get(start..start + buffer.len())
            .ok_or(Error::StorageOutOfBounds)?;
        buffer.copy_from_slice(bytes);
        Ok(())
    }

    fn put(&mut self, offset: u32, bytes: &[u8]) -> Result<()> {
        let start = offset as usize;
        let target = self
            .bytes
            .get_mut(start..start + bytes.len())
            .ok_or(Error::StorageOutOfBounds)?;
        target.copy_from_slice(bytes);
        self.puts += 1;
        Ok(())
    }
}

/// Compare channel that remembers every committed compare value.
#[derive(Debug, Default)]
pub struct FakeTimer {
    pub compare: u8,
    pub enabled: bool,
    pub compare_writes: Vec<u8>,
}

impl TimerChannel for FakeTimer {
    fn compare(&self) -> u8 {
        self.compare
    }

    fn set_compare(&mut self, step: u8) {
        self.compare = step;
        self.compare_writes.push(step);
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

/// Edge counter that reports preset values and counts restarts.
#[derive(Debug, Default)]
pub struct StubCounter {
    pub ticks: u8,
    pub overflow: bool,
    pub restarts: usize,
}

impl StubCounter {
    pub fn set(&mut self, ticks: u8, overflow: bool) -> &mut Self {
        self.ticks = ticks;
        self.overflow = overflow;
        self
    }
}

impl EdgeCounter for StubCounter {
    fn elapsed_ticks(&self) -> u8 {
        self.ticks
    }

    fn overflowed(&self) -> bool {
        self.overflow
    }

    fn restart(&mut self) {
        self.ticks = 0;
        self.overflow = false;
        self.restarts += 1;
    }
}

pub const LEADER_TICKS: u8 = 211;
pub const REPEAT_TICKS: u8 = 176;
pub const ONE_TICKS: u8 = 35;
pub const ZERO_TICKS: u8 = 18;

/// Edge periods for a full transmission of `bits`: leader then 32 data bits, LSB first.
pub fn edge_periods(bits: u32) -> Vec<u8> {
    let mut periods = vec![LEADER_TICKS];
    periods.extend((0..32).map(|bit_index| {
        if bits >> bit_index & 1 == 1 {
            ONE_TICKS
        } else {
            ZERO_TICKS
        }
    }));
    periods
}

pub type TestRemote = CameraRemote<MockPin, MockDelay, FakeTimer, MemoryStore>;

/// A freshly powered-up device on the given store.
pub fn boot(recorder: &Recorder, store: MemoryStore) -> TestRemote {
    CameraRemote::new(
        relay_sequencer(recorder),
        FakeTimer::default(),
        store,
        IntervalScheduler::default(),
        BOOT_WINDOW,
    )
}

/// A device that has already left the boot window.
pub fn boot_to_normal(recorder: &Recorder, store: MemoryStore) -> TestRemote {
    let mut remote = boot(recorder, store);
    assert!(!remote.poll_boot(BOOT_WINDOW));
    remote
}

/// Send a full frame edge by edge.
pub fn send(remote: &mut TestRemote, frame: IrFrame) {
    let mut counter = StubCounter::default();
    for ticks in edge_periods(frame.bits) {
        remote.on_ir_edge(counter.set(ticks, false));
    }
}

/// Send a repeat code for the last frame.
pub fn send_repeat(remote: &mut TestRemote) {
    let mut counter = StubCounter::default();
    remote.on_ir_edge(counter.set(REPEAT_TICKS, false));
}
