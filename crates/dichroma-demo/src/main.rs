//! Dichroma Demo: headless host for the live color-vision processor.
//!
//! `generate` writes reference LUT images for the built-in simulation models.
//! `run` drives a frame processor with a synthetic camera and logs what it
//! presents, optionally cycling through every vision mode.

mod assets;
mod cli;
mod error;
mod generate;
mod run;
mod synthetic;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Generate(args) => generate::generate_async(args).await,
        Command::Run(args) => run::run(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
