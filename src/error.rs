//! Error types for clonectl.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloneCtlError {
    // Configuration errors
    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Request validation (checked before any network call)
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    // Transport errors
    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Server returned HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    // Streaming audio errors
    #[error("Failed to decode audio chunk {index}: {message}")]
    ChunkDecode { index: u64, message: String },

    #[error("Audio chunk arrived out of order: expected index > {last}, got {got}")]
    ChunkOrdering { last: u64, got: u64 },

    // Audio output errors
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio output failed: {message}")]
    AudioOutput { message: String },

    // Workflow gating
    #[error("Stage '{stage}' is not reachable yet: {message}")]
    StageNotReady { stage: String, message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, CloneCtlError>;
