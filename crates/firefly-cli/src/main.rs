//! Firefly CLI - Run particle scenes headless

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{check, run};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "firefly")]
#[command(about = "Mesh-reconstructing particle effects, driven from TOML scenes", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a scene for a number of frames and report statistics
    Run {
        /// Path to scene file
        scene: String,

        /// Number of frames to simulate
        #[arg(long, default_value = "300")]
        frames: u64,

        /// Seconds per frame
        #[arg(long, default_value = "0.016666668", value_parser = parse_dt)]
        dt: f64,

        /// Print a line every N frames (0 prints only the summary)
        #[arg(long, default_value = "30")]
        every: u64,

        /// Write sampled statistics to a TOML file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Validate a scene file without running it
    Check {
        /// Path to scene file
        scene: String,
    },
}

fn parse_dt(s: &str) -> Result<f64, String> {
    let dt: f64 = s.trim().parse().map_err(|e| format!("invalid dt: {}", e))?;
    if dt.is_finite() && dt >= 0.0 {
        Ok(dt)
    } else {
        Err(format!("dt must be a non-negative number, got {}", s))
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            scene,
            frames,
            dt,
            every,
            report,
        } => run::run(run::RunArgs {
            scene,
            frames,
            dt,
            every,
            report,
        }),
        Commands::Check { scene } => check::run(&scene),
    }
}
