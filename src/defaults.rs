//! Default configuration constants for clonectl.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

/// Default base URL of the inference service.
pub const API_BASE_URL: &str = "http://127.0.0.1:8000";

/// Safety margin in milliseconds when scheduling a chunk against the audio clock.
///
/// Absorbs scheduling jitter between the decode step and the audio callback so
/// a chunk is never placed in the past. 50ms is generous enough for a loaded
/// machine while staying inaudible at stream start.
pub const SAFETY_MARGIN_MS: u32 = 50;

/// Linear fade-in/fade-out duration in milliseconds applied to each chunk.
///
/// Masks waveform discontinuities at chunk boundaries. Each fade is capped at
/// one quarter of the chunk duration so short chunks keep a full-volume middle.
pub const FADE_MS: u32 = 10;

/// Crossfade overlap in milliseconds between consecutive chunks.
///
/// The next chunk starts this much before the previous one ends, so the
/// fade-out of one chunk sums with the fade-in of the next instead of leaving
/// a gap of silence.
pub const CROSSFADE_OVERLAP_MS: u32 = 8;

/// Sample rate used when the output device does not report a default config.
pub const FALLBACK_SAMPLE_RATE: u32 = 48000;

/// Default training batch size.
pub const TRAIN_BATCH_SIZE: u32 = 8;

/// Default number of training epochs.
pub const TRAIN_EPOCHS: u32 = 100;

/// Default maximum utterance length (in frames) accepted by training.
pub const TRAIN_MAX_LEN: u32 = 1000;

/// Poll interval in milliseconds while waiting for scheduled audio to drain.
pub const DRAIN_POLL_MS: u64 = 50;
