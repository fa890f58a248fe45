//! WAV parsing, sample-rate conversion, and capture of received audio.

use crate::error::{CloneCtlError, Result};
use std::io::Read;
use std::path::Path;

/// Parse WAV data into mono f32 samples at the given target rate.
///
/// Accepts 16-bit integer and 32-bit float WAVs at any rate and channel
/// count; multi-channel audio is averaged down to mono before resampling.
pub fn read_mono_f32(reader: impl Read, target_rate: u32) -> Result<Vec<f32>> {
    let mut wav_reader = hound::WavReader::new(reader).map_err(|e| CloneCtlError::Other(
        format!("Failed to parse WAV data: {e}"),
    ))?;

    let spec = wav_reader.spec();
    let source_rate = spec.sample_rate;
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(CloneCtlError::Other(
            "WAV data reports zero channels".to_string(),
        ));
    }

    let raw: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => wav_reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / i16::MAX as f32))
            .collect::<std::result::Result<Vec<_>, _>>(),
        hound::SampleFormat::Float => wav_reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>(),
    }
    .map_err(|e| CloneCtlError::Other(format!("Failed to read WAV samples: {e}")))?;

    // Average channels down to mono
    let mono: Vec<f32> = if channels == 1 {
        raw
    } else {
        raw.chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    if source_rate == target_rate {
        Ok(mono)
    } else {
        Ok(resample(&mono, source_rate, target_rate))
    }
}

/// Simple linear interpolation resampling.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[samples.len() - 1]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as f32
            }
        })
        .collect()
}

/// Write mono f32 samples as a 16-bit WAV file.
///
/// Used by `speak --save` to keep a copy of everything received on a stream.
pub fn write_mono_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(|e| CloneCtlError::Other(
        format!("Failed to create WAV file {}: {e}", path.display()),
    ))?;
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(value).map_err(|e| CloneCtlError::Other(
            format!("Failed to write WAV sample: {e}"),
        ))?;
    }
    writer.finalize().map_err(|e| CloneCtlError::Other(
        format!("Failed to finalize WAV file: {e}"),
    ))?;
    Ok(())
}
