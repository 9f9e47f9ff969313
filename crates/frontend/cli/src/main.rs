use anyhow::{Context, Result};
use clap::Parser;
use emu_core::logging::{LogConfig, LogLevel};
use emu_core::System;
use emu_psx::PsxSystem;
use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(about = "Headless PSX emulator driver")]
struct Args {
    /// Path to a 512KB BIOS ROM image
    bios: PathBuf,

    /// Number of frames to run
    #[arg(long, default_value_t = 1)]
    frames: u32,

    /// Dump a save-state to this file as JSON after the run
    #[arg(long)]
    save: Option<PathBuf>,

    /// Sideload a raw binary into RAM before running (requires --sideload-addr)
    #[arg(long)]
    sideload: Option<PathBuf>,

    /// Destination address for --sideload, e.g. 0x80010000
    #[arg(long, value_parser = parse_hex, default_value = "0x80010000")]
    sideload_addr: u32,

    /// Jump to the sideloaded binary instead of booting the BIOS
    #[arg(long, default_value_t = false)]
    run_sideload: bool,

    /// Core log verbosity: off, error, warn, info, debug or trace
    #[arg(long, default_value = "off")]
    log_level: String,

    /// Write core logs to this file instead of stdout
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print per-frame dimensions and cumulative TTY output
    #[arg(long, default_value_t = false)]
    debug: bool,
}

fn parse_hex(s: &str) -> Result<u32, String> {
    let s = s.trim_start_matches("0x");
    u32::from_str_radix(s, 16).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let level = LogLevel::from_str(&args.log_level)
        .with_context(|| format!("invalid log level: {}", args.log_level))?;
    LogConfig::global().set_global_level(level);
    if let Some(path) = &args.log_file {
        LogConfig::global()
            .set_log_file(path.clone())
            .with_context(|| format!("cannot open log file {}", path.display()))?;
    }

    let bios = fs::read(&args.bios)
        .with_context(|| format!("cannot read BIOS image {}", args.bios.display()))?;

    let mut sys = PsxSystem::new();
    sys.mount("BIOS", &bios)
        .context("failed to mount BIOS image")?;

    if let Some(path) = &args.sideload {
        let blob = fs::read(path)
            .with_context(|| format!("cannot read sideload binary {}", path.display()))?;
        let size = blob.len() as u32;
        sys.transfer_to_ram(&blob, 0, size, args.sideload_addr)
            .context("sideload does not fit in RAM")?;
        log::info!(
            "sideloaded {} bytes at 0x{:08x}",
            size,
            args.sideload_addr
        );
        if args.run_sideload {
            sys.set_pc(args.sideload_addr);
        }
    }

    for fnum in 1..=args.frames {
        let frame = sys
            .step_frame()
            .with_context(|| format!("emulation stopped during frame {}", fnum))?;
        if args.debug {
            println!("Frame {}: {}x{}", fnum, frame.width, frame.height);
        }

        let tty = sys.take_tty_output();
        if !tty.is_empty() {
            print!("{}", tty);
        }
    }

    if let Some(path) = &args.save {
        let state = sys.save_state();
        let mut f = File::create(path)
            .with_context(|| format!("cannot create save-state file {}", path.display()))?;
        write!(f, "{}", serde_json::to_string_pretty(&state)?)?;
        log::info!("save-state written to {}", path.display());
    }

    Ok(())
}
