//! CLI command definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Daguerre - content-addressable media store
#[derive(Parser, Debug)]
#[command(name = "daguerre")]
#[command(about = "Content-addressable media store with on-read image transforms", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file overriding the standard locations
    #[arg(short, long, global = true, env = "DAGUERRE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store a file and print its identifier
    Ingest {
        /// File to upload
        file: PathBuf,
    },

    /// Fetch an asset, optionally transformed, into a file
    Read {
        /// Asset identifier (64 hex characters)
        id: String,

        /// Transform parameters
        #[command(flatten)]
        transform: TransformArgs,

        /// Where to write the result
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print runtime statistics as JSON
    Stats,
}

/// Transform parameters, validated exactly as query parameters are.
#[derive(Args, Debug, Default)]
pub struct TransformArgs {
    /// Output width in pixels
    #[arg(long)]
    pub width: Option<String>,

    /// Output height in pixels
    #[arg(long)]
    pub height: Option<String>,

    /// `<W>x<H>` or `<W>`; overrides --width and --height
    #[arg(long)]
    pub size: Option<String>,

    /// Encoder quality, 1-100
    #[arg(long)]
    pub quality: Option<String>,

    /// Output format: jpeg, png or webp
    #[arg(long)]
    pub format: Option<String>,

    /// Crop strategy: none, centre, entropy, attention, low, high or all
    #[arg(long)]
    pub crop: Option<String>,
}

impl TransformArgs {
    /// The supplied parameters as `(name, value)` pairs.
    pub fn params(&self) -> Vec<(&'static str, &str)> {
        [
            ("width", &self.width),
            ("height", &self.height),
            ("size", &self.size),
            ("quality", &self.quality),
            ("format", &self.format),
            ("crop", &self.crop),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|value| (name, value)))
        .collect()
    }
}
