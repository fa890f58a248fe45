//! Sample-accurate clip mixer and the playback clock.
//!
//! The mixer is the crate's audio clock domain: `now_secs()` is derived from
//! the number of frames the output callback has rendered, not from wall-clock
//! time. Everything here is pure sample arithmetic so the scheduling
//! behaviour is testable without an audio device.

/// One placed clip: mono samples starting at an absolute frame position.
struct Clip {
    start_frame: u64,
    samples: Vec<f32>,
}

impl Clip {
    fn end_frame(&self) -> u64 {
        self.start_frame + self.samples.len() as u64
    }
}

/// Mixes scheduled clips into the output, advancing a monotonic frame cursor.
///
/// Overlapping clips sum per frame — that is what turns the scheduler's
/// deliberate overlap into a crossfade instead of a gap.
pub struct Mixer {
    sample_rate: u32,
    cursor: u64,
    clips: Vec<Clip>,
}

impl Mixer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            cursor: 0,
            clips: Vec::new(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Current position of the playback clock in seconds.
    pub fn now_secs(&self) -> f64 {
        self.cursor as f64 / self.sample_rate as f64
    }

    /// Place a clip at an absolute clock position.
    ///
    /// A start in the past is clamped to the cursor; the scheduler's safety
    /// margin makes that a non-event in practice.
    pub fn add_clip(&mut self, start_secs: f64, samples: Vec<f32>) {
        if samples.is_empty() {
            return;
        }
        let start_frame = (start_secs * self.sample_rate as f64).round() as u64;
        self.clips.push(Clip {
            start_frame: start_frame.max(self.cursor),
            samples,
        });
    }

    /// Render the next `out.len()` mono frames and advance the clock.
    pub fn render(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        let window_start = self.cursor;
        let window_end = self.cursor + out.len() as u64;

        for clip in &self.clips {
            let from = clip.start_frame.max(window_start);
            let to = clip.end_frame().min(window_end);
            for frame in from..to {
                let sample = clip.samples[(frame - clip.start_frame) as usize];
                out[(frame - window_start) as usize] += sample;
            }
        }

        // Summed fades can briefly exceed full scale; keep the DAC honest.
        for sample in out.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }

        self.cursor = window_end;
        self.clips.retain(|c| c.end_frame() > window_end);
    }

    /// Number of clips not yet fully rendered.
    pub fn pending_clips(&self) -> usize {
        self.clips.len()
    }

    /// True once every placed clip has been fully rendered.
    pub fn is_idle(&self) -> bool {
        self.clips.is_empty()
    }

    /// Drop all clips and rewind the clock to zero.
    ///
    /// Only called between sessions — a subsequent session must start from a
    /// clean clock, independent of anything scheduled before.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.clips.clear();
    }

    /// Render every pending clip to a buffer, starting from the cursor.
    ///
    /// Offline counterpart of the realtime callback, used by `speak --save`
    /// to produce the same crossfaded output a live stream would have played.
    pub fn render_all(&mut self) -> Vec<f32> {
        let mut rendered = Vec::new();
        let mut block = [0.0f32; 1024];
        while !self.is_idle() {
            self.render(&mut block);
            rendered.extend_from_slice(&block);
        }
        // Trim trailing silence past the last clip's end.
        while rendered.last() == Some(&0.0) {
            rendered.pop();
        }
        rendered
    }
}
