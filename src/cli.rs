//! Command-line interface for clonectl
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Voice-clone workflow control panel
#[derive(Parser, Debug)]
#[command(
    name = "clonectl",
    version,
    about = "Drive a voice-cloning service: upload, preprocess, train, speak"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Inference service base URL (overrides config for this invocation)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Suppress progress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: per-chunk timing, -vv: full diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Audio output device name (see `clonectl devices`)
    #[arg(long, global = true, value_name = "DEVICE")]
    pub device: Option<String>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check the service and local audio setup
    Check,

    /// List profiles known to the service
    Profiles,

    /// List available audio output devices
    Devices,

    /// Upload a voice recording for a profile
    Upload {
        /// Profile the recording belongs to
        #[arg(long, value_name = "NAME")]
        profile: String,

        /// WAV file to upload
        file: PathBuf,
    },

    /// Segment and normalize a profile's uploaded audio
    Preprocess {
        /// Profile to preprocess
        #[arg(long, value_name = "NAME")]
        profile: String,

        /// Uploaded file to process
        #[arg(long, value_name = "FILE")]
        filename: String,
    },

    /// Train the voice model for a profile
    Train {
        /// Profile to train
        #[arg(long, value_name = "NAME")]
        profile: String,

        /// Training batch size
        #[arg(long, value_name = "N", default_value_t = crate::defaults::TRAIN_BATCH_SIZE)]
        batch_size: u32,

        /// Number of training epochs
        #[arg(long, value_name = "N", default_value_t = crate::defaults::TRAIN_EPOCHS)]
        epochs: u32,

        /// Maximum utterance length in frames
        #[arg(long, value_name = "N", default_value_t = crate::defaults::TRAIN_MAX_LEN)]
        max_len: u32,

        /// Keep the final epoch instead of auto-selecting the best one
        #[arg(long)]
        no_auto_select: bool,

        /// Skip automatic speaker-profile tuning
        #[arg(long)]
        no_auto_tune: bool,

        /// Skip automatic lexicon building
        #[arg(long)]
        no_lexicon: bool,

        /// Thorough (slower) checkpoint selection
        #[arg(long)]
        thorough: bool,

        /// Rank checkpoints without word-error-rate scoring
        #[arg(long)]
        no_wer: bool,

        /// Always run every epoch, even when loss has plateaued
        #[arg(long)]
        no_early_stop: bool,
    },

    /// Synthesize speech and play it as it streams in
    Speak {
        /// Trained speaker profile to synthesize with
        #[arg(long, value_name = "NAME")]
        speaker: String,

        /// Text to synthesize
        text: String,

        /// Explicit model checkpoint path on the server
        #[arg(long, value_name = "PATH")]
        model_path: Option<String>,

        /// Reference WAV path on the server for voice conditioning
        #[arg(long, value_name = "PATH")]
        ref_wav: Option<String>,

        /// Render to a WAV file instead of playing
        #[arg(long, value_name = "FILE")]
        save: Option<PathBuf>,
    },

    /// Run the full workflow: upload, preprocess, train, speak
    Run {
        /// Profile to create or resume
        #[arg(long, value_name = "NAME")]
        profile: String,

        /// WAV recording to upload
        file: PathBuf,

        /// Text to synthesize once training finishes
        text: String,
    },

    /// Read or write persistent settings
    Config {
        /// Action to perform
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Config subcommand actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print a configuration value
    Get {
        /// Dotted key, e.g. api.base_url
        key: String,
    },

    /// Set and persist a configuration value
    Set {
        /// Dotted key, e.g. api.base_url
        key: String,

        /// New value
        value: String,
    },

    /// Print the configuration file path
    Path,
}
