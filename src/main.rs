// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use gallery_camera::backends::camera::{Facing, Resolution};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "gallery-camera")]
#[command(about = "Capture, save and publish event photos")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List {
        /// Use the synthetic test camera
        #[arg(long)]
        synthetic: bool,
    },

    /// Take a photo and save it
    Photo {
        /// Which camera to use: environment (back) or user (front)
        #[arg(short, long, default_value = "environment")]
        facing: Facing,

        /// Ideal capture resolution, e.g. 1920x1080
        #[arg(short, long, default_value = "1920x1080")]
        resolution: Resolution,

        /// Use the synthetic test camera instead of a real device
        #[arg(long)]
        synthetic: bool,

        /// Capture device path (e.g. /dev/video0)
        #[arg(short, long)]
        device: Option<String>,

        /// Directory the download fallback writes into (default: ~/Downloads)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Never open save or share dialogs
        #[arg(long)]
        no_dialogs: bool,

        /// Caption used when publishing
        #[arg(short, long)]
        caption: Option<String>,

        /// Publish the photo to the gallery as this user
        #[arg(short, long)]
        user: Option<String>,

        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=gallery_camera=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List { synthetic } => cli::list_cameras(synthetic),
        Commands::Photo {
            facing,
            resolution,
            synthetic,
            device,
            output,
            no_dialogs,
            caption,
            user,
            json,
        } => cli::take_photo(cli::PhotoOptions {
            facing,
            resolution,
            synthetic,
            device,
            output,
            no_dialogs,
            caption,
            user,
            json,
        }),
    }
}
