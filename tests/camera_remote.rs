#![cfg(feature = "host")]
//! The whole device driven through its interrupt entry points.

mod common;

use camera_remote::config::BOOT_WINDOW;
use camera_remote::interval::TimerChannel;
use camera_remote::ir_nec::IrFrame;
use camera_remote::learn::LearnState;
use camera_remote::profile::{DEFAULT_PROFILE, KeyEncoding, RemoteProfile};
use camera_remote::relay::LightmeterMode;
use common::{MemoryStore, Recorder, boot, boot_to_normal, send, send_repeat};
use embassy_time::Duration;

const LEARN_ADDRESS: u16 = 0x5A5A;
const LEARN_KEYS: [u8; 7] = [0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27];

fn default_key(slot: usize) -> IrFrame {
    IrFrame::from_parts(DEFAULT_PROFILE.address, DEFAULT_PROFILE.keys[slot] << 1)
}

/// Power up, learn a remote and power down, returning the store as left on flash.
fn learn_remote(recorder: &Recorder) -> MemoryStore {
    let mut remote = boot(recorder, MemoryStore::default());
    assert!(remote.poll_boot(Duration::from_millis(20)));
    send(&mut remote, IrFrame::from_parts(LEARN_ADDRESS, 0x99));
    for key in LEARN_KEYS {
        send(&mut remote, IrFrame::from_parts(LEARN_ADDRESS, key));
    }
    assert_eq!(remote.learn_state(), LearnState::Normal);
    remote.into_store()
}

#[test]
fn power_up_leaves_relays_at_rest_and_interval_paused() {
    let recorder = Recorder::default();
    let remote = boot(&recorder, MemoryStore::default());

    assert_eq!(remote.learn_state(), LearnState::Booting);
    assert_eq!(remote.learned_profile(), None);
    assert_eq!(remote.timer().compare(), 31);
    assert!(!remote.timer().is_enabled());
    assert!(recorder.events().is_empty());
}

#[test]
fn unknown_remote_starts_and_stops_a_run() {
    let recorder = Recorder::default();
    let mut remote = boot_to_normal(&recorder, MemoryStore::default());
    let frame = IrFrame::from_parts(0x3C3C, 0x5E);

    send(&mut remote, frame);

    assert_eq!(recorder.pin_transitions("lightmeter"), vec![(true, 0)]);
    assert_eq!(recorder.pin_transitions("hold"), vec![(true, 0)]);
    assert_eq!(
        recorder.pin_transitions("load"),
        vec![(true, 0), (false, 250)]
    );
    assert_eq!(recorder.pin_transitions("start"), vec![(true, 320)]);
    assert_eq!(
        recorder.pin_transitions("indicator"),
        vec![(true, 320), (false, 380)]
    );

    recorder.clear();
    send(&mut remote, frame);
    assert!(!recorder.level("start"));
    assert!(!recorder.level("lightmeter"));
    assert!(!recorder.level("hold"));
    assert!(!remote.relays().is_exposure_open().expect("read back"));
}

#[test]
fn unknown_remote_sentinel_keys_do_nothing() {
    let recorder = Recorder::default();
    let mut remote = boot_to_normal(&recorder, MemoryStore::default());

    send(&mut remote, IrFrame::from_parts(0x3C3C, 0x00));
    send(&mut remote, IrFrame::from_parts(0x3C3C, 0xFF));

    assert!(recorder.transitions().is_empty());
}

#[test]
fn default_single_frame_meters_once() {
    let recorder = Recorder::default();
    let mut remote = boot_to_normal(&recorder, MemoryStore::default());

    send(&mut remote, default_key(1));
    assert_eq!(
        recorder.pin_transitions("lightmeter"),
        vec![(true, 0), (false, 350)]
    );
    assert_eq!(recorder.rising_edges("start"), 1);
    assert_eq!(
        remote.relays().lightmeter_mode(),
        LightmeterMode::SubsequentSingleShot
    );

    recorder.clear();
    send(&mut remote, default_key(1));
    assert!(recorder.pin_transitions("lightmeter").is_empty());
    assert_eq!(recorder.rising_edges("start"), 1);
    assert_eq!(recorder.rising_edges("indicator"), 1);
}

#[test]
fn learn_session_flashes_and_stores_profile_once() {
    let recorder = Recorder::default();
    let mut remote = boot(&recorder, MemoryStore::default());
    assert!(remote.poll_boot(Duration::from_millis(20)));

    send(&mut remote, IrFrame::from_parts(LEARN_ADDRESS, 0x99));
    assert_eq!(remote.learn_state(), LearnState::Collecting { slot: 0 });
    assert_eq!(recorder.rising_edges("indicator"), 2);
    assert!(!remote.poll_boot(BOOT_WINDOW * 3));

    // A default-remote key during learning is not dispatched.
    send(&mut remote, default_key(0));
    assert!(!recorder.level("lightmeter"));
    assert_eq!(remote.learn_state(), LearnState::Collecting { slot: 0 });

    for key in LEARN_KEYS {
        send(&mut remote, IrFrame::from_parts(LEARN_ADDRESS, key));
    }

    assert_eq!(recorder.rising_edges("indicator"), 2 + 6 + 10);
    assert_eq!(remote.learn_state(), LearnState::Normal);
    let expected = RemoteProfile {
        address: LEARN_ADDRESS,
        encoding: KeyEncoding::Byte,
        keys: LEARN_KEYS,
    };
    assert_eq!(remote.learned_profile(), Some(&expected));
    assert_eq!(remote.into_store().puts, 1);
}

#[test]
fn learned_profile_survives_power_cycle() {
    let recorder = Recorder::default();
    let store = learn_remote(&recorder);

    let recorder = Recorder::default();
    let mut remote = boot_to_normal(&recorder, store);
    assert_eq!(
        remote.learned_profile().map(|profile| profile.address),
        Some(LEARN_ADDRESS)
    );

    send(&mut remote, IrFrame::from_parts(LEARN_ADDRESS, LEARN_KEYS[0]));
    assert!(remote.relays().is_exposure_open().expect("read back"));

    // Play again on the learned remote stops the run: start first, then hold and lightmeter.
    recorder.clear();
    let stop_at = recorder.now_ms();
    send(&mut remote, IrFrame::from_parts(LEARN_ADDRESS, LEARN_KEYS[0]));
    assert_eq!(recorder.pin_transitions("start"), vec![(false, stop_at)]);
    assert_eq!(recorder.pin_transitions("hold"), vec![(false, stop_at + 70)]);
    assert_eq!(
        recorder.pin_transitions("lightmeter"),
        vec![(false, stop_at + 70)]
    );
    assert_eq!(
        remote.relays().lightmeter_mode(),
        LightmeterMode::FirstSingleShot
    );
    assert!(!remote.relays().is_exposure_open().expect("read back"));

    // Unbound key on the learned remote is ignored rather than treated as unknown.
    recorder.clear();
    send(&mut remote, IrFrame::from_parts(LEARN_ADDRESS, 0x70));
    assert!(recorder.transitions().is_empty());
}

#[test]
fn corrupted_store_boots_without_profile() {
    let recorder = Recorder::default();
    let mut store = learn_remote(&recorder);
    store.bytes[10] ^= 0x55;

    let recorder = Recorder::default();
    let mut remote = boot_to_normal(&recorder, store);
    assert_eq!(remote.learned_profile(), None);

    // The formerly learned remote is now an unknown one.
    send(&mut remote, IrFrame::from_parts(LEARN_ADDRESS, LEARN_KEYS[3]));
    assert!(remote.relays().is_exposure_open().expect("read back"));
}

#[test]
fn interval_toggle_fires_every_postscaler_matches() {
    let recorder = Recorder::default();
    let mut remote = boot_to_normal(&recorder, MemoryStore::default());

    remote.on_interval_compare();
    assert_eq!(remote.scheduler().divider(), 0);

    send(&mut remote, default_key(2));
    assert!(remote.timer().is_enabled());
    recorder.clear();

    remote.on_interval_compare();
    assert_eq!(recorder.rising_edges("start"), 0);
    remote.on_interval_compare();
    assert_eq!(recorder.rising_edges("start"), 1);
    remote.on_interval_compare();
    remote.on_interval_compare();
    assert_eq!(recorder.rising_edges("start"), 2);
    assert!(recorder.pin_transitions("lightmeter").is_empty());
}

#[test]
fn interval_toggle_only_masks_the_timer() {
    let recorder = Recorder::default();
    let mut remote = boot_to_normal(&recorder, MemoryStore::default());
    send(&mut remote, default_key(4));
    let scheduler = remote.scheduler().clone();

    send(&mut remote, default_key(2));
    assert!(remote.timer().is_enabled());
    assert_eq!(remote.scheduler(), &scheduler);
    assert_eq!(remote.timer().compare(), 31);

    send(&mut remote, default_key(2));
    assert!(!remote.timer().is_enabled());
    assert_eq!(remote.scheduler(), &scheduler);
    assert!(remote.timer().compare_writes.is_empty());
}

#[test]
fn pausing_keeps_divider_phase() {
    let recorder = Recorder::default();
    let mut remote = boot_to_normal(&recorder, MemoryStore::default());
    send(&mut remote, default_key(2));
    remote.on_interval_compare();
    assert_eq!(remote.scheduler().divider(), 1);

    send(&mut remote, default_key(2));
    assert!(!remote.timer().is_enabled());
    remote.on_interval_compare();
    assert_eq!(remote.scheduler().divider(), 1);

    send(&mut remote, default_key(2));
    recorder.clear();
    remote.on_interval_compare();
    assert_eq!(recorder.rising_edges("start"), 1);
}

#[test]
fn speed_change_is_staged_until_compare() {
    let recorder = Recorder::default();
    let mut remote = boot_to_normal(&recorder, MemoryStore::default());
    send(&mut remote, default_key(2));

    send(&mut remote, default_key(4));
    assert_eq!(remote.scheduler().step(), 41);
    assert_eq!(remote.timer().compare(), 31);

    remote.on_interval_compare();
    assert_eq!(remote.timer().compare(), 41);
    assert_eq!(remote.timer().compare_writes.last(), Some(&41));
}

#[test]
fn held_speed_key_keeps_applying() {
    let recorder = Recorder::default();
    let mut remote = boot_to_normal(&recorder, MemoryStore::default());

    send(&mut remote, default_key(4));
    send_repeat(&mut remote);
    send_repeat(&mut remote);
    assert_eq!(remote.scheduler().step(), 61);

    send(&mut remote, default_key(6));
    send_repeat(&mut remote);
    assert_eq!(remote.scheduler().postscaler(), 8);

    // Only the initial presses flash.
    assert_eq!(recorder.rising_edges("indicator"), 2);
}

#[test]
fn held_play_key_does_not_toggle_again() {
    let recorder = Recorder::default();
    let mut remote = boot_to_normal(&recorder, MemoryStore::default());

    send(&mut remote, default_key(0));
    send_repeat(&mut remote);
    send_repeat(&mut remote);

    assert!(remote.relays().is_exposure_open().expect("read back"));
    assert_eq!(recorder.rising_edges("start"), 1);
}
