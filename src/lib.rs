//! clonectl - terminal control panel for voice cloning
//!
//! Drives a remote inference service through a staged workflow
//! (upload → preprocess → train → generate) with real-time streamed playback.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod api;
pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
#[cfg(feature = "cli")]
pub mod diagnostics;
pub mod error;
pub mod sink;
pub mod stream;
pub mod workflow;

// Service boundary
pub use api::client::ApiClient;
pub use api::types::{SynthesisRequest, TrainRequest};

// Streaming core (reader → parser → scheduler → session)
pub use audio::mixer::Mixer;
pub use audio::scheduler::{ChunkScheduler, SchedulerConfig};
pub use stream::reader::LineStreamReader;
pub use stream::record::{StreamRecord, parse_record};
pub use stream::session::{CancelHandle, SessionState, StreamSession};

// Workflow state machine
pub use workflow::{Stage, WorkflowController, WorkflowState};

// Error handling
pub use error::{CloneCtlError, Result};

// Config
pub use config::Config;

// Log routing
pub use sink::{CollectorSink, ConsoleSink, LogSink};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }

    #[test]
    fn version_string_contains_plus_when_git_hash_present() {
        let ver = version_string();
        // In a git repo build, GIT_HASH is set → expect "0.1.0+<hash>"
        // In CI without git, expect plain "0.1.0"
        if option_env!("GIT_HASH").is_some_and(|h| !h.is_empty()) {
            assert!(
                ver.contains('+'),
                "With GIT_HASH set, version should contain '+', got: {}",
                ver
            );
        } else {
            assert_eq!(ver, env!("CARGO_PKG_VERSION"));
        }
    }
}
