use anyhow::{Context, Result};
use clap::Parser;
use emu_core::graphics::{scale_nearest, ColorOps};
use emu_core::logging::LogConfig;
use emu_core::types::Frame;
use emu_core::System;
use emu_gb::{GbSystem, HardwareModel, PpuConfig};
use log::{debug, info};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Headless Game Boy PPU driver: run frames from a save state and dump
/// the picture.
#[derive(Parser)]
struct Args {
    /// Save state to start from (GB system state or bare PPU state)
    state: Option<PathBuf>,

    /// Number of frames to run
    #[arg(long, default_value_t = 1)]
    frames: u32,

    /// Integer scale factor for the written image (1-4)
    #[arg(long, default_value_t = 1)]
    scale: u32,

    /// Write the last frame here as a binary PPM
    #[arg(long, default_value = "frame.ppm")]
    out: PathBuf,

    /// Dump the final save state to this file as JSON
    #[arg(long)]
    save: Option<PathBuf>,

    /// PPU configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run as a Game Boy Color
    #[arg(long, default_value_t = false)]
    cgb: bool,

    /// Core log filter, e.g. "ppu=debug,dma=trace" or "info"
    #[arg(long)]
    log: Option<String>,

    /// Send core log output to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print the PPU debug state after every frame
    #[arg(long, default_value_t = false)]
    debug: bool,
}

fn load_state(sys: &mut GbSystem, path: &Path) -> Result<()> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading save state {}", path.display()))?;
    let state: serde_json::Value = serde_json::from_str(&text)?;

    if state.get("system").is_some() {
        sys.load_state(&state)?;
    } else {
        // A bare PPU snapshot
        sys.bus_mut().ppu.load_state(&state)?;
    }
    info!("Loaded {}", path.display());
    Ok(())
}

fn write_ppm(frame: &Frame, path: &Path) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write!(out, "P6\n{} {}\n255\n", frame.width, frame.height)?;
    for &pixel in &frame.pixels {
        out.write_all(&[
            ColorOps::red(pixel),
            ColorOps::green(pixel),
            ColorOps::blue(pixel),
        ])?;
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let core_log = LogConfig::global();
    if let Some(filter) = args.log.as_deref() {
        core_log.apply_filter(filter)?;
    }
    if let Some(path) = args.log_file.clone() {
        core_log
            .set_log_file(path)
            .context("opening core log file")?;
    }

    let mut config = match args.config.as_deref() {
        Some(path) => PpuConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PpuConfig::default(),
    };
    if args.cgb {
        config.model = HardwareModel::Cgb;
    }
    debug!("PPU config: {:?}", config);

    let mut sys = GbSystem::new(config);
    if let Some(path) = args.state.as_deref() {
        load_state(&mut sys, path)?;
    }

    let mut frame = None;
    for fnum in 1..=args.frames {
        frame = Some(sys.step_frame()?);
        if args.debug {
            println!(
                "DEBUG STATE (frame {}):\n{}",
                fnum,
                serde_json::to_string_pretty(&sys.bus().ppu.debug_state())?
            );
        }
    }

    if let Some(frame) = frame {
        let scaled = scale_nearest(&frame, args.scale);
        write_ppm(&scaled, &args.out)
            .with_context(|| format!("writing {}", args.out.display()))?;
        info!(
            "Wrote {}x{} frame to {}",
            scaled.width,
            scaled.height,
            args.out.display()
        );
    }

    if let Some(path) = args.save.as_ref() {
        let state = sys.save_state();
        let mut f = File::create(path)?;
        write!(f, "{}", serde_json::to_string_pretty(&state)?)?;
        info!("Saved state to {}", path.display());
    }

    core_log.clear_log_file();
    Ok(())
}
