//! Decoding of base64 WAV payloads into playable chunks.

use crate::audio::wav;
use crate::error::{CloneCtlError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::io::Cursor;

/// One decoded audio segment, ready for scheduling.
///
/// Created and consumed within a single session; samples are mono f32 at the
/// mixer's sample rate.
#[derive(Debug, Clone)]
pub struct DecodedChunk {
    pub index: u64,
    pub samples: Vec<f32>,
    pub duration_secs: f64,
}

/// Decode a base64 WAV payload into mono samples at the target rate.
///
/// Any failure — bad base64, unparseable WAV — is a `ChunkDecode` error; the
/// caller drops the chunk and continues, it never aborts the stream.
pub fn decode_chunk(index: u64, payload_base64: &str, target_rate: u32) -> Result<DecodedChunk> {
    let bytes = BASE64
        .decode(payload_base64)
        .map_err(|e| CloneCtlError::ChunkDecode {
            index,
            message: format!("invalid base64: {e}"),
        })?;

    let samples =
        wav::read_mono_f32(Cursor::new(bytes), target_rate).map_err(|e| {
            CloneCtlError::ChunkDecode {
                index,
                message: e.to_string(),
            }
        })?;

    let duration_secs = samples.len() as f64 / target_rate as f64;
    Ok(DecodedChunk {
        index,
        samples,
        duration_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_wav(sample_rate: u32, samples: &[i16]) -> String {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut buffer, spec).expect("create writer");
            for &sample in samples {
                writer.write_sample(sample).expect("write sample");
            }
            writer.finalize().expect("finalize");
        }
        BASE64.encode(buffer.into_inner())
    }

    #[test]
    fn decodes_half_second_clip() {
        let payload = encode_wav(16000, &vec![0i16; 8000]);
        let chunk = decode_chunk(0, &payload, 16000).expect("decode");
        assert_eq!(chunk.index, 0);
        assert_eq!(chunk.samples.len(), 8000);
        assert!((chunk.duration_secs - 0.5).abs() < 1e-9);
    }

    #[test]
    fn resamples_to_mixer_rate() {
        let payload = encode_wav(16000, &vec![0i16; 16000]); // 1s at 16kHz
        let chunk = decode_chunk(0, &payload, 48000).expect("decode");
        assert_eq!(chunk.samples.len(), 48000);
        assert!((chunk.duration_secs - 1.0).abs() < 1e-9);
    }

    #[test]
    fn invalid_base64_is_a_chunk_decode_error() {
        match decode_chunk(7, "!!! not base64 !!!", 16000) {
            Err(CloneCtlError::ChunkDecode { index, message }) => {
                assert_eq!(index, 7);
                assert!(message.contains("base64"));
            }
            other => panic!("expected ChunkDecode, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn valid_base64_of_garbage_is_a_chunk_decode_error() {
        let payload = BASE64.encode(b"definitely not a wav file");
        match decode_chunk(2, &payload, 16000) {
            Err(CloneCtlError::ChunkDecode { index, .. }) => assert_eq!(index, 2),
            other => panic!("expected ChunkDecode, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn empty_wav_decodes_to_zero_duration() {
        let payload = encode_wav(16000, &[]);
        let chunk = decode_chunk(0, &payload, 16000).expect("decode");
        assert!(chunk.samples.is_empty());
        assert_eq!(chunk.duration_secs, 0.0);
    }
}
