//! # Tuner - Command-Line Front End
//!
//! Headless front end for the tuner core.
//!
//! ## Commands
//! - **live**: tune from the default input device until Ctrl-C
//! - **analyze**: run a WAV file through the tuner frame by frame
//!
//! Configuration comes from an optional JSON file; command-line flags
//! override individual fields.

mod analyze;
mod config_loader;
mod live;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tuner_core::Algorithm;

/// Real-time monophonic instrument tuner
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file (missing fields use the defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Pitch algorithm: normalized-autocorrelation, difference-autocorrelation, amdf or yin
    #[arg(long, short, global = true)]
    algorithm: Option<Algorithm>,
    /// Samples per analysis frame
    #[arg(long, global = true)]
    frame_size: Option<usize>,
    /// Log per-frame estimator decisions
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Tune live from the default audio input
    Live,
    /// Analyse a WAV file and print one reading per frame
    Analyze {
        /// WAV file to analyse (integer or float samples, any channel count)
        path: PathBuf,
        /// Samples between frame starts (default: the frame size)
        #[arg(long)]
        hop: Option<usize>,
        /// Also report the strongest spectral peak of every frame
        #[arg(long, default_value_t = false)]
        spectrum: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let mut config = config_loader::load_config(args.config.as_deref())?;
    config_loader::apply_overrides(&mut config, args.algorithm, args.frame_size);

    match args.command {
        Command::Live => live::run(config),
        Command::Analyze {
            path,
            hop,
            spectrum,
        } => analyze::run(&path, config, hop, spectrum),
    }
}
