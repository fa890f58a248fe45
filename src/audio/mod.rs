//! Audio clock domain: chunk decoding, clip mixing, playback scheduling, and
//! the cpal output stream.

pub mod chunk;
pub mod mixer;
#[cfg(feature = "playback")]
pub mod output;
pub mod scheduler;
pub mod wav;

pub use chunk::{DecodedChunk, decode_chunk};
pub use mixer::Mixer;
#[cfg(feature = "playback")]
pub use output::AudioOutput;
pub use scheduler::{ChunkScheduler, ScheduledChunk, SchedulerConfig};
