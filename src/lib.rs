//! Infrared remote and intervalometer for cameras driven by a mechanical remote switch.
//!
//! The core is hardware independent and runs in two interrupt contexts: the infrared edge
//! handler ([`ir_nec`] → [`learn`] / [`dispatch`] → [`relay`]) and the interval compare handler
//! ([`interval`] → [`relay`]). [`camera_remote::CameraRemote`] owns all of it; [`pico`] wires it
//! to a Raspberry Pi Pico.
#![no_std]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod camera_remote;
pub mod config;
pub mod dispatch;
mod error;
pub mod interval;
pub mod ir_nec;
pub mod learn;
pub mod pico;
pub mod profile;
pub mod relay;
pub mod store;

// Re-export commonly used items
pub use camera_remote::CameraRemote;
pub use error::{Error, Result};
