use std::path::{Path, PathBuf};
use std::{env, fs};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1) Handle memory.x based on target
    let target = env::var("TARGET")?;
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);

    if target.starts_with("thumbv8m") {
        // Pico 2 ARM: the RP2350 layout carries the boot block sections
        place_memory_x("memory-pico2.x", &out_dir)?;
    } else if target.starts_with("thumbv6m") {
        place_memory_x("memory.x", &out_dir)?;
    }

    // 2) Load optional env files (still supported for convenience)
    let _ = dotenvy::from_filename(".env");
    load_home_env(".camera-remote.env");

    // 3) Provide fallbacks so the crate always builds without .env
    let shutter_timing = env_or_default("SHUTTER_TIMING_MS", "10,20,50");
    let boot_window = env_or_default("BOOT_WINDOW_MS", "200");

    if shutter_timing.split(',').count() != 3 {
        println!(
            "cargo:warning=SHUTTER_TIMING_MS should look like \"10,20,50\"; got \"{shutter_timing}\""
        );
    }

    // 4) Expose as compile-time constants
    println!("cargo:rustc-env=SHUTTER_TIMING_MS={shutter_timing}");
    println!("cargo:rustc-env=BOOT_WINDOW_MS={boot_window}");

    // Optional: don't rebuild unless these change
    println!("cargo:rerun-if-env-changed=SHUTTER_TIMING_MS");
    println!("cargo:rerun-if-env-changed=BOOT_WINDOW_MS");
    println!("cargo:rerun-if-changed=.env");
    Ok(())
}

/// Copy a linker memory layout to `OUT_DIR` as `memory.x`, where cortex-m-rt's `link.x` finds it.
fn place_memory_x(source: &str, out_dir: &Path) -> std::io::Result<()> {
    let memory_x = fs::read_to_string(source)?;
    fs::write(out_dir.join("memory.x"), memory_x)?;
    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rerun-if-changed={source}");
    Ok(())
}

fn load_home_env(file: &str) {
    let home = match env::var_os("USERPROFILE").or_else(|| env::var_os("HOME")) {
        Some(path) => PathBuf::from(path),
        None => return,
    };
    let path = home.join(file);
    let _ = dotenvy::from_path(&path);
}

fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}
