use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vodplay")]
#[command(author, version, about = "Headless player for an HLS video catalog")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the videos in the catalog
    List,

    /// Play a video headlessly and report the session outcome
    Play {
        /// Video to play (defaults to the first catalog entry)
        id: Option<String>,

        /// Quality to select once the ladder is known (auto, level-N, N or e.g. 720p)
        #[arg(short, long)]
        quality: Option<String>,
    },

    /// Delete a video from the catalog
    Delete {
        /// Video to delete
        #[arg(required = true)]
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Upload a video file
    Upload {
        /// File to upload
        #[arg(required = true)]
        file: PathBuf,

        /// Title shown in the catalog
        #[arg(short, long)]
        title: String,

        /// Longer description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
