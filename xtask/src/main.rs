//! Build automation tasks for the camera remote firmware.
//!
//! Run with: `cargo xtask <command>`

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::process::{Command, ExitCode};


#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation for the camera remote", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all checks: build lib and firmware, run host tests, generate docs
    CheckAll,
    /// Build library for a board
    Build {
        #[arg(long, default_value = "pico1")]
        board: Board,
    },
    /// Build the firmware
    Firmware {
        #[arg(long, default_value = "pico1")]
        board: Board,
    },
    /// Run the host test suite (unit, integration and doc tests)
    Test,
    /// Build UF2 firmware file for flashing to Pico
    Uf2 {
        #[arg(long, default_value = "pico1")]
        board: Board,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Board {
    Pico1,
    Pico2,
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Board::Pico1 => write!(f, "pico1"),
            Board::Pico2 => write!(f, "pico2"),
        }
    }
}

impl Board {
    fn target(self) -> &'static str {
        match self {
            Board::Pico1 => "thumbv6m-none-eabi",
            Board::Pico2 => "thumbv8m.main-none-eabihf",
        }
    }

    fn firmware(self) -> &'static str {
        match self {
            Board::Pico1 => "camera_remote",
            Board::Pico2 => "camera_remote_pico2",
        }
    }

    fn features(self) -> String {
        format!("{self},arm,defmt")
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::CheckAll => check_all(),
        Commands::Build { board } => build_lib(board),
        Commands::Firmware { board } => build_firmware(board),
        Commands::Test => {
            if run_host_tests() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Commands::Uf2 { board } => build_uf2(board),
    }
}

fn check_all() -> ExitCode {
    for board in [Board::Pico1, Board::Pico2] {
        println!("{}", format!("==> Building library ({board})...").cyan());
        if !cargo_for_board(board, &["build", "--lib"]) {
            return ExitCode::FAILURE;
        }

        println!("\n{}", format!("==> Building firmware ({board})...").cyan());
        if !cargo_for_board(board, &["build", "--example", board.firmware()]) {
            return ExitCode::FAILURE;
        }
    }

    if !run_host_tests() {
        return ExitCode::FAILURE;
    }

    println!("\n{}", "==> Building documentation...".cyan());
    if !cargo_for_board(Board::Pico1, &["doc", "--no-deps"]) {
        return ExitCode::FAILURE;
    }

    println!("\n{}", "==> All checks passed!".green().bold());
    ExitCode::SUCCESS
}

fn run_host_tests() -> bool {
    println!("\n{}", "==> Running host tests...".cyan());
    let host_target = host_target();
    match host_target.as_deref() {
        Some(target) => {
            println!(
                "  {}",
                format!("Using host target: {target}").bright_black()
            );
        }
        None => {
            println!(
                "{}",
                "  Unable to detect host target; relying on cargo default.".bright_black()
            );
        }
    }

    let mut test_cmd = Command::new("cargo");
    test_cmd.current_dir(workspace_root()).arg("test");

    if let Some(target) = host_target {
        test_cmd.arg("--target").arg(target);
    }

    test_cmd.args(["--no-default-features", "--features", "host"]);

    run_command(&mut test_cmd)
}

fn build_lib(board: Board) -> ExitCode {
    println!(
        "{}",
        format!("Building library with features: {}", board.features()).cyan()
    );

    if cargo_for_board(board, &["build", "--lib"]) {
        println!("{}", "Build successful!".green());
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn build_firmware(board: Board) -> ExitCode {
    println!(
        "{}",
        format!("Building firmware with features: {}", board.features()).cyan()
    );

    if cargo_for_board(board, &["build", "--example", board.firmware()]) {
        println!("{}", "Build successful!".green());
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn build_uf2(board: Board) -> ExitCode {
    let target = board.target();
    let firmware = board.firmware();

    println!("{}", format!("Building UF2 firmware ({board})").cyan());
    println!("  Features: {}", board.features().bright_black());
    println!("  Target: {}", target.bright_black());

    // Build in release mode for UF2
    if !cargo_for_board(board, &["build", "--example", board.firmware(), "--release"]) {
        return ExitCode::FAILURE;
    }

    // Convert to UF2 using elf2uf2-rs
    let elf_path = format!("target/{target}/release/examples/{firmware}");
    let uf2_path = format!("{firmware}.uf2");

    println!("\n{}", "Converting to UF2 format...".cyan());

    if run_command(
        Command::new("elf2uf2-rs")
            .current_dir(workspace_root())
            .args([&elf_path, &uf2_path]),
    ) {
        println!("{}", format!("UF2 created: {uf2_path}").green().bold());
        println!("{}", "Ready to drag-and-drop to your Pico!".bright_black());
        ExitCode::SUCCESS
    } else {
        println!(
            "{}",
            "Note: Install elf2uf2-rs with: cargo install elf2uf2-rs".yellow()
        );
        ExitCode::FAILURE
    }
}

/// Run `cargo <args>` for a board's target with only that board's features.
fn cargo_for_board(board: Board, args: &[&str]) -> bool {
    let features = board.features();
    run_command(
        Command::new("cargo")
            .current_dir(workspace_root())
            .args(args)
            .args([
                "--target",
                board.target(),
                "--features",
                features.as_str(),
                "--no-default-features",
            ]),
    )
}

fn workspace_root() -> std::path::PathBuf {
    // xtask is run from the workspace root
    std::env::current_dir().expect("Failed to get current directory")
}

fn host_target() -> Option<String> {
    let output = Command::new("rustc").arg("-vV").output().ok()?;
    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in stdout.lines() {
        if let Some(host) = line.strip_prefix("host: ") {
            return Some(host.trim().to_string());
        }
    }
    None
}

fn run_command(cmd: &mut Command) -> bool {
    match cmd.status() {
        Ok(status) => status.success(),
        Err(e) => {
            eprintln!("{}", format!("Failed to execute command: {e}").red());
            false
        }
    }
}
