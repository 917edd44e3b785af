//! CLI interface for keysynth

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Polyphonic terminal synthesizer
#[derive(Parser)]
#[command(name = "keysynth")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play from the computer keyboard
    Play {
        /// Configuration file path (defaults when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Render a score to a WAV file
    Record {
        /// Configuration file path (defaults when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Score file (YAML, or JSON by extension); built-in demo when omitted
        #[arg(short, long)]
        score: Option<PathBuf>,
    },

    /// List available audio output devices
    Devices,

    /// Validate a configuration file
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "keysynth.yaml")]
        config: PathBuf,
    },

    /// Generate an example configuration file
    Init,
}
