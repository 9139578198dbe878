//! Raspberry Pi Pico binding: pins, flash, the edge and interval tasks.
//!
//! Both tasks enter the same critical section for the whole of their handler, so a relay
//! sequence started from one of them blocks the other until it is done, and edges that arrive
//! meanwhile are lost. That is the run-to-completion model the core is written against.
//!
//! See [`CameraRemoteDevice`] for usage examples.
#![cfg(any(feature = "pico1", feature = "pico2"))]

use core::cell::RefCell;

use embassy_executor::Spawner;
use embassy_rp::Peri;
use embassy_rp::flash::{Blocking, ERASE_SIZE, Flash as EmbassyFlash};
use embassy_rp::gpio::{AnyPin, Input, Level, Output, Pull};
use embassy_rp::peripherals::FLASH;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Delay, Duration, Instant, Timer};

use crate::camera_remote::CameraRemote;
use crate::config::{BOOT_WINDOW, INTERVAL_TICK, IR_TICK, SHUTTER_TIMING};
use crate::interval::{IntervalScheduler, TimerChannel};
use crate::ir_nec::EdgeCounter;
use crate::relay::{RelayPins, RelaySequencer};
use crate::store::ByteStore;
use crate::{Error, Result};

// Internal flash size for Raspberry Pi Pico 2 (4 MB).
#[cfg(feature = "pico2")]
const FLASH_SIZE: u32 = 4 * 1024 * 1024;

// Internal flash size for Raspberry Pi Pico 1 (2 MB).
#[cfg(all(not(feature = "pico2"), feature = "pico1"))]
const FLASH_SIZE: u32 = 2 * 1024 * 1024;

const INTERNAL_FLASH_SIZE: usize = FLASH_SIZE as usize;

const BLOCK_SIZE: u32 = 4096;
const _: () = assert!(BLOCK_SIZE as usize == ERASE_SIZE);

/// The profile record lives in the last erase block of flash.
const STORE_OFFSET: u32 = FLASH_SIZE - BLOCK_SIZE;

const BOOT_POLL: Duration = Duration::from_millis(5);

/// The camera remote as wired on a Pico.
pub type PicoCameraRemote = CameraRemote<Output<'static>, Delay, PicoIntervalTimer, FlashByteStore>;

/// GPIO assignment. The indicator may share its drive line with one of the relays.
pub struct CameraRemotePins {
    pub lightmeter: Peri<'static, AnyPin>,
    pub hold: Peri<'static, AnyPin>,
    pub load: Peri<'static, AnyPin>,
    pub start: Peri<'static, AnyPin>,
    pub indicator: Peri<'static, AnyPin>,
    pub ir_receiver: Peri<'static, AnyPin>,
}

/// Static resources for [`CameraRemoteDevice`].
pub struct CameraRemoteStatic {
    remote: Mutex<CriticalSectionRawMutex, RefCell<Option<PicoCameraRemote>>>,
}

impl CameraRemoteStatic {
    /// Run `f` on the device inside the critical section.
    fn with<R>(&'static self, f: impl FnOnce(&mut PicoCameraRemote) -> R) -> Option<R> {
        self.remote.lock(|cell| cell.borrow_mut().as_mut().map(f))
    }
}

/// A device abstraction for the whole camera remote.
///
/// # Examples
/// ```no_run
/// # #![no_std]
/// # #![no_main]
/// # use panic_probe as _;
/// # use embassy_executor::Spawner;
/// use camera_remote::pico::{CameraRemoteDevice, CameraRemotePins, CameraRemoteStatic};
///
/// # async fn example(p: embassy_rp::Peripherals, spawner: Spawner) -> camera_remote::Result<()> {
/// static CAMERA_REMOTE_STATIC: CameraRemoteStatic = CameraRemoteDevice::new_static();
/// let pins = CameraRemotePins {
///     lightmeter: p.PIN_2.into(),
///     hold: p.PIN_3.into(),
///     load: p.PIN_4.into(),
///     start: p.PIN_5.into(),
///     indicator: p.PIN_25.into(),
///     ir_receiver: p.PIN_28.into(),
/// };
/// let device = CameraRemoteDevice::new(pins, p.FLASH, &CAMERA_REMOTE_STATIC, spawner)?;
/// device.run_boot_window().await;
/// # Ok(())
/// # }
/// ```
pub struct CameraRemoteDevice {
    remote_static: &'static CameraRemoteStatic,
    boot: Instant,
}

impl CameraRemoteDevice {
    /// Create static resources for the device.
    ///
    /// See [`CameraRemoteDevice`] for usage examples.
    #[must_use]
    pub const fn new_static() -> CameraRemoteStatic {
        CameraRemoteStatic {
            remote: Mutex::new(RefCell::new(None)),
        }
    }

    /// Drive every relay to rest, load the stored profile and start the edge and interval tasks.
    ///
    /// See [`CameraRemoteDevice`] for usage examples.
    ///
    /// # Errors
    /// Returns an error if a pin cannot be driven or a task cannot be spawned.
    pub fn new(
        pins: CameraRemotePins,
        flash: Peri<'static, FLASH>,
        remote_static: &'static CameraRemoteStatic,
        spawner: Spawner,
    ) -> Result<Self> {
        let boot = Instant::now();
        let relay_pins = RelayPins {
            lightmeter: Output::new(pins.lightmeter, Level::Low),
            hold: Output::new(pins.hold, Level::Low),
            load: Output::new(pins.load, Level::Low),
            start: Output::new(pins.start, Level::Low),
            indicator: Output::new(pins.indicator, Level::Low),
        };
        let relays = RelaySequencer::new(relay_pins, Delay, SHUTTER_TIMING)?;
        let store = FlashByteStore {
            flash: EmbassyFlash::new_blocking(flash),
        };
        let remote = CameraRemote::new(
            relays,
            PicoIntervalTimer::default(),
            store,
            IntervalScheduler::default(),
            BOOT_WINDOW,
        );
        remote_static.remote.lock(|cell| {
            *cell.borrow_mut() = Some(remote);
        });

        // Use Pull::Up for typical IR receivers (they idle HIGH with active-low modules)
        let ir_receiver = Input::new(pins.ir_receiver, Pull::Up);
        let token = ir_edge_task(ir_receiver, remote_static).map_err(Error::TaskSpawn)?;
        spawner.spawn(token);
        let token = interval_task(remote_static).map_err(Error::TaskSpawn)?;
        spawner.spawn(token);

        info!("CameraRemote: started");
        Ok(Self {
            remote_static,
            boot,
        })
    }

    /// Poll the boot window until it closes or a learn session takes over.
    ///
    /// See [`CameraRemoteDevice`] for usage examples.
    pub async fn run_boot_window(&self) {
        while self
            .remote_static
            .with(|remote| remote.poll_boot(self.boot.elapsed()))
            .unwrap_or(false)
        {
            Timer::after(BOOT_POLL).await;
        }
    }
}

/// Compare channel emulated on top of the embassy time driver.
#[derive(Debug, Default)]
pub struct PicoIntervalTimer {
    compare: u8,
    enabled: bool,
}

impl TimerChannel for PicoIntervalTimer {
    fn compare(&self) -> u8 {
        self.compare
    }

    fn set_compare(&mut self, step: u8) {
        self.compare = step;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

/// Byte store on the last erase block of the internal flash.
pub struct FlashByteStore {
    flash: EmbassyFlash<'static, FLASH, Blocking, INTERNAL_FLASH_SIZE>,
}

impl ByteStore for FlashByteStore {
    fn get(&mut self, offset: u32, buffer: &mut [u8]) -> Result<()> {
        check_range(offset, buffer.len())?;
        let address = STORE_OFFSET
            .checked_add(offset)
            .ok_or(Error::StorageOutOfBounds)?;
        self.flash
            .blocking_read(address, buffer)
            .map_err(Error::Flash)
    }

    fn put(&mut self, offset: u32, bytes: &[u8]) -> Result<()> {
        let range = check_range(offset, bytes.len())?;
        let mut block = [0xFFu8; ERASE_SIZE];
        self.flash
            .blocking_read(STORE_OFFSET, &mut block)
            .map_err(Error::Flash)?;
        block
            .get_mut(range)
            .ok_or(Error::StorageOutOfBounds)?
            .copy_from_slice(bytes);
        self.flash
            .blocking_erase(STORE_OFFSET, FLASH_SIZE)
            .map_err(Error::Flash)?;
        self.flash
            .blocking_write(STORE_OFFSET, &block)
            .map_err(Error::Flash)
    }
}

/// Byte range of `len` bytes at `offset` within the store block.
fn check_range(offset: u32, len: usize) -> Result<core::ops::Range<usize>> {
    let start = usize::try_from(offset).map_err(|_| Error::StorageOutOfBounds)?;
    let end = start.checked_add(len).ok_or(Error::StorageOutOfBounds)?;
    if end > ERASE_SIZE {
        return Err(Error::StorageOutOfBounds);
    }
    Ok(start..end)
}

/// 8-bit edge counter in [`IR_TICK`] units, latched at each falling edge.
struct PicoEdgeCounter {
    last_edge: Instant,
    edge: Instant,
}

impl PicoEdgeCounter {
    fn ticks(&self) -> u64 {
        self.edge
            .duration_since(self.last_edge)
            .as_micros()
            .checked_div(IR_TICK.as_micros())
            .unwrap_or(0)
    }
}

impl EdgeCounter for PicoEdgeCounter {
    fn elapsed_ticks(&self) -> u8 {
        // The hardware counter is 8 bits wide and wraps.
        let [low, ..] = self.ticks().to_le_bytes();
        low
    }

    fn overflowed(&self) -> bool {
        self.ticks() > u64::from(u8::MAX)
    }

    fn restart(&mut self) {
        self.last_edge = self.edge;
    }
}

#[embassy_executor::task]
async fn ir_edge_task(mut pin: Input<'static>, remote_static: &'static CameraRemoteStatic) -> ! {
    let now = Instant::now();
    let mut counter = PicoEdgeCounter {
        last_edge: now,
        edge: now,
    };

    info!("IR edge task started");
    loop {
        pin.wait_for_falling_edge().await;
        counter.edge = Instant::now();
        remote_static.with(|remote| remote.on_ir_edge(&mut counter));
    }
}

#[embassy_executor::task]
async fn interval_task(remote_static: &'static CameraRemoteStatic) -> ! {
    let mut next = Instant::now();

    info!("Interval task started");
    loop {
        let compare = remote_static
            .with(|remote| remote.timer().compare())
            .unwrap_or(1);
        let period = INTERVAL_TICK
            .checked_mul(u32::from(compare.max(1)))
            .unwrap_or(Duration::MAX);
        next = next.checked_add(period).unwrap_or(Instant::MAX);
        Timer::at(next).await;
        remote_static.with(PicoCameraRemote::on_interval_compare);

        // A relay sequence defers the compare interrupt; missed matches are not queued.
        let now = Instant::now();
        while let Some(later) = next.checked_add(period).filter(|later| *later <= now) {
            next = later;
        }
    }
}
