//! Camera remote firmware for a Raspberry Pi Pico 2.
//!
//! Same wiring as the Pico 1 build: relays on GP2..GP5 (lightmeter, hold, load, start), status
//! LED on GP25, IR receiver on GP28.
#![no_std]
#![no_main]

use camera_remote::pico::{CameraRemoteDevice, CameraRemotePins, CameraRemoteStatic};
use camera_remote::Result;
use core::convert::Infallible;
use defmt::info;
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_rp::block::ImageDef;
use panic_probe as _;

/// Tells the RP2350 boot ROM how to start the image.
#[expect(unsafe_code, reason = "the boot ROM looks for the image definition in .start_block")]
#[unsafe(link_section = ".start_block")]
#[used]
pub static IMAGE_DEF: ImageDef = ImageDef::secure_exe();

#[embassy_executor::main]
pub async fn main(spawner: Spawner) -> ! {
    // If it returns, something went wrong.
    let Err(err) = inner_main(spawner).await;
    panic!("{err}");
}

async fn inner_main(spawner: Spawner) -> Result<Infallible> {
    let p = embassy_rp::init(Default::default());

    static CAMERA_REMOTE_STATIC: CameraRemoteStatic = CameraRemoteDevice::new_static();
    let pins = CameraRemotePins {
        lightmeter: p.PIN_2.into(),
        hold: p.PIN_3.into(),
        load: p.PIN_4.into(),
        start: p.PIN_5.into(),
        indicator: p.PIN_25.into(),
        ir_receiver: p.PIN_28.into(),
    };
    let device = CameraRemoteDevice::new(pins, p.FLASH, &CAMERA_REMOTE_STATIC, spawner)?;

    device.run_boot_window().await;
    info!("Boot window closed");

    core::future::pending().await
}
