//! CLI argument parsing for Sehat.

use clap::{Parser, Subcommand};
use sehat_config::EngineKind;
use std::path::PathBuf;

#[derive(Parser, Clone)]
#[command(name = "sehat")]
#[command(about = "Host-side OCR bridge: extract text from document images")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override the configured recognition engine (auto, vision, tesseract, unsupported)
    #[arg(long, value_name = "ENGINE", global = true)]
    pub engine: Option<EngineKind>,

    /// Trade accuracy for latency
    #[arg(long, global = true)]
    pub fast: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Extract text from a single image and print it
    Extract {
        /// Path to the image file
        image_path: PathBuf,

        /// Print the reply as a channel JSON envelope instead of plain text
        #[arg(long)]
        json: bool,
    },

    /// Serve the OCR method channel as newline-delimited JSON on stdin/stdout
    Serve,

    /// Show the resolved channel, engine and recognition settings
    Info,
}
