//! Cinder2D sandbox runner.
//!
//! Runs the headless demo world from [`cinder2d::sandbox`] for a fixed
//! number of frames and reports what happened. Settings come from an INI
//! file (`./cinder2d.ini` by default) and can be overridden per run on the
//! command line.
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- --frames 1200 --entities 64 --json
//! RUST_LOG=debug cargo run -- --seed 3
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use cinder2d::resources::gameconfig::{DEFAULT_CONFIG_PATH, GameConfig};
use cinder2d::sandbox::Sandbox;

/// Cinder2D headless sandbox
#[derive(Parser)]
#[command(version, about = "Runs the Cinder2D sandbox world without a window.")]
struct Cli {
    /// INI file to read settings from.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Frames to simulate.
    #[arg(long)]
    frames: Option<u32>,

    /// Enemies to place at startup.
    #[arg(long)]
    entities: Option<u32>,

    /// Seed for the world layout and enemy behaviour.
    #[arg(long)]
    seed: Option<u64>,

    /// Print the final report as JSON.
    #[arg(long)]
    json: bool,

    /// Write the effective settings back to the config file and exit.
    #[arg(long)]
    write_config: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = GameConfig::with_path(&cli.config);
    if cli.config.exists() {
        if let Err(err) = config.load_from_file() {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    } else {
        info!("No config at {:?}, using defaults", cli.config);
    }
    if let Some(frames) = cli.frames {
        config.frames = frames;
    }
    if let Some(entities) = cli.entities {
        config.entities = entities;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    if cli.write_config {
        return match config.save_to_file() {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                error!("{err}");
                ExitCode::FAILURE
            }
        };
    }

    let report = Sandbox::new(&config).and_then(|mut sandbox| sandbox.run(config.frames));
    let report = match report {
        Ok(report) => report,
        Err(err) => {
            error!("simulation failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        "Simulated {} frames ({:.2}s): {} entities, player hit {} times",
        report.frames, report.elapsed, report.live_entities, report.player_hits
    );
    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                error!("cannot encode report: {err}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{report:#?}");
    }
    ExitCode::SUCCESS
}
