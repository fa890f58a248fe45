//! Gapless placement of decoded chunks on the playback clock.

use crate::audio::chunk::DecodedChunk;
use crate::audio::mixer::Mixer;
use crate::defaults;
use crate::error::{CloneCtlError, Result};

/// Timing knobs for chunk placement, all in seconds.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Minimum distance from "now" at which a chunk may start.
    pub safety_margin_secs: f64,
    /// Linear fade-in/fade-out length, capped at a quarter of each chunk.
    pub fade_secs: f64,
    /// How far consecutive chunks overlap so their fades crossfade.
    pub overlap_secs: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            safety_margin_secs: defaults::SAFETY_MARGIN_MS as f64 / 1000.0,
            fade_secs: defaults::FADE_MS as f64 / 1000.0,
            overlap_secs: defaults::CROSSFADE_OVERLAP_MS as f64 / 1000.0,
        }
    }
}

impl SchedulerConfig {
    /// Build from the millisecond values in the user's audio config.
    pub fn from_audio_config(audio: &crate::config::AudioConfig) -> Self {
        Self {
            safety_margin_secs: audio.safety_margin_ms as f64 / 1000.0,
            fade_secs: audio.fade_ms as f64 / 1000.0,
            overlap_secs: audio.crossfade_overlap_ms as f64 / 1000.0,
        }
    }
}

/// Where a chunk ended up on the clock.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledChunk {
    pub index: u64,
    pub start_secs: f64,
    pub duration_secs: f64,
}

/// Decides when each chunk starts and applies the boundary fades.
///
/// `next_start_time` is the playback schedule: monotonically non-decreasing
/// for the life of a session, reset only when a new session begins. The
/// scheduler assumes in-order arrival (a transport guarantee) and fails fast
/// when an index regresses rather than reordering.
pub struct ChunkScheduler {
    config: SchedulerConfig,
    next_start_time: f64,
    last_index: Option<u64>,
}

impl ChunkScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            next_start_time: 0.0,
            last_index: None,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn next_start_time(&self) -> f64 {
        self.next_start_time
    }

    /// Rewind the schedule to the given clock position for a fresh session.
    pub fn reset(&mut self, clock_now: f64) {
        self.next_start_time = clock_now;
        self.last_index = None;
    }

    /// Place one chunk on the mixer.
    ///
    /// The start is `max(now + safety_margin, next_start_time)`: never in the
    /// past, never before the previous chunk's slot. On success the schedule
    /// advances by `duration − overlap`; on any error it is left untouched, so
    /// a dropped chunk cannot corrupt the placement of the ones after it.
    pub fn schedule(
        &mut self,
        chunk: DecodedChunk,
        clock_now: f64,
        mixer: &mut Mixer,
    ) -> Result<ScheduledChunk> {
        if let Some(last) = self.last_index
            && chunk.index <= last
        {
            return Err(CloneCtlError::ChunkOrdering {
                last,
                got: chunk.index,
            });
        }

        if chunk.samples.is_empty() || chunk.duration_secs <= 0.0 {
            return Err(CloneCtlError::ChunkDecode {
                index: chunk.index,
                message: "zero-duration chunk".to_string(),
            });
        }

        let start_secs = (clock_now + self.config.safety_margin_secs).max(self.next_start_time);

        let DecodedChunk {
            index,
            mut samples,
            duration_secs,
        } = chunk;
        apply_fades(
            &mut samples,
            mixer.sample_rate(),
            self.config.fade_secs,
            duration_secs,
        );
        mixer.add_clip(start_secs, samples);

        self.last_index = Some(index);
        // A chunk shorter than the overlap must not pull the schedule backwards.
        self.next_start_time = start_secs + (duration_secs - self.config.overlap_secs).max(0.0);

        Ok(ScheduledChunk {
            index,
            start_secs,
            duration_secs,
        })
    }
}

impl Default for ChunkScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

/// Linear fade-in at the head and fade-out at the tail.
///
/// Each fade is capped at a quarter of the chunk so the two can never overlap
/// destructively, even on very short chunks.
fn apply_fades(samples: &mut [f32], sample_rate: u32, fade_secs: f64, duration_secs: f64) {
    let fade = fade_secs.min(duration_secs / 4.0);
    let fade_frames = (fade * sample_rate as f64).floor() as usize;
    if fade_frames == 0 {
        return;
    }

    let len = samples.len();
    for i in 0..fade_frames {
        let gain = i as f32 / fade_frames as f32;
        samples[i] *= gain;
        samples[len - 1 - i] *= gain;
    }
}
