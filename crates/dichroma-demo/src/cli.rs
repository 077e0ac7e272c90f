//! Command-line interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use dichroma_core::LutResolution;

/// Default synthetic camera width.
const DEFAULT_CAPTURE_WIDTH: u32 = 640;
/// Default synthetic camera height.
const DEFAULT_CAPTURE_HEIGHT: u32 = 480;
/// Default surface width.
const DEFAULT_SURFACE_WIDTH: u32 = 800;
/// Default surface height.
const DEFAULT_SURFACE_HEIGHT: u32 = 800;

#[derive(Debug, Parser)]
#[command(name = "dichroma", version, about = "Live color-vision simulation, headless")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write 512×512 reference LUT images for the simulation models.
    Generate(GenerateArgs),
    /// Drive a frame processor with a synthetic camera.
    Run(RunArgs),
}

#[derive(Debug, Clone, Args)]
pub struct GenerateArgs {
    /// Output directory.
    #[arg(short, long, default_value = "LUTs")]
    pub out: PathBuf,

    /// Model ids to generate (default: all).
    #[arg(short, long = "mode", value_name = "ID")]
    pub modes: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Directory LUT locators resolve against.
    #[arg(short, long, default_value = ".")]
    pub luts: PathBuf,

    /// JSON vision-mode catalog (default: built-in catalog).
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Mode to select once capture starts.
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Request every catalog mode back to back, then settle on the last.
    #[arg(long)]
    pub cycle: bool,

    /// Frames to present before exiting.
    #[arg(short, long, default_value_t = 120)]
    pub frames: u64,

    /// Override the frame rate from the environment.
    #[arg(long)]
    pub fps: Option<u32>,

    /// Override the LUT resolution from the environment.
    #[arg(long)]
    pub resolution: Option<LutResolution>,

    #[arg(long, default_value_t = DEFAULT_CAPTURE_WIDTH)]
    pub capture_width: u32,

    #[arg(long, default_value_t = DEFAULT_CAPTURE_HEIGHT)]
    pub capture_height: u32,

    #[arg(long, default_value_t = DEFAULT_SURFACE_WIDTH)]
    pub surface_width: u32,

    #[arg(long, default_value_t = DEFAULT_SURFACE_HEIGHT)]
    pub surface_height: u32,

    /// Save the surface as a PNG each time the readout is logged.
    #[arg(long, value_name = "PATH")]
    pub snapshot: Option<PathBuf>,

    /// Log the FPS readout every N frames.
    #[arg(long, default_value_t = 30)]
    pub log_every: u64,
}
