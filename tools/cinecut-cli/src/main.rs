//! Cinecut CLI: compile, validate, and render edit timelines.
//!
//! Usage:
//!   cinecut compile <TIMELINE>   Compile a timeline to an MLT program
//!   cinecut render <TIMELINE>    Render a timeline to a video file
//!   cinecut presets              Show the render preset table
//!   cinecut check                Check render engine availability

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "cinecut",
    about = "Timeline compilation and rendering for non-destructive edits",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a timeline to an MLT composition program
    Compile {
        /// Path to the timeline JSON file
        timeline: PathBuf,

        /// Render preset selecting the compile profile
        #[arg(long, default_value = "high")]
        preset: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Validate the compiled program with the render engine
        #[arg(long)]
        validate: bool,
    },

    /// Render a timeline to a video file
    Render {
        /// Path to the timeline JSON file
        timeline: PathBuf,

        /// Render preset
        #[arg(long, default_value = "high")]
        preset: String,

        /// Output file path (generated under the renders directory when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Constant rate factor override
        #[arg(long)]
        crf: Option<u32>,
    },

    /// Show the render preset table
    Presets,

    /// Check render engine availability
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    cinecut_common::logging::init_logging(&cinecut_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: false,
        file: None,
    });

    match cli.command {
        Commands::Compile {
            timeline,
            preset,
            output,
            validate,
        } => commands::compile::run(timeline, preset, output, validate).await,
        Commands::Render {
            timeline,
            preset,
            output,
            crf,
        } => commands::render::run(timeline, preset, output, crf).await,
        Commands::Presets => commands::presets::run(),
        Commands::Check => commands::check::run().await,
    }
}
