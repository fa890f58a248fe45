//! Decodes one transport line into a tagged stream record.

use serde::Deserialize;

/// One decoded line of the synthesis stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamRecord {
    /// Free-text progress output from the server.
    LogLine(String),
    /// One synthesized audio segment, base64-encoded WAV.
    AudioChunk { index: u64, payload_base64: String },
    /// Terminal marker; `inference_ms` is the server-measured total.
    Done { inference_ms: Option<u64> },
}

/// Wire shape of a structured line. All fields optional: the discriminator is
/// which of them are present.
#[derive(Debug, Deserialize)]
struct RawRecord {
    event: Option<String>,
    chunk_index: Option<u64>,
    audio_base64: Option<String>,
    inference_ms: Option<u64>,
}

/// Map one line to exactly one record.
///
/// Lines that fail structured decode — plain progress text, malformed JSON,
/// or JSON without a recognized discriminator — degrade to `LogLine` and
/// never abort the stream.
pub fn parse_record(line: &str) -> StreamRecord {
    let raw: RawRecord = match serde_json::from_str(line) {
        Ok(raw) => raw,
        Err(_) => return StreamRecord::LogLine(line.to_string()),
    };

    if raw.event.as_deref() == Some("done") {
        return StreamRecord::Done {
            inference_ms: raw.inference_ms,
        };
    }

    if let Some(payload_base64) = raw.audio_base64 {
        return StreamRecord::AudioChunk {
            index: raw.chunk_index.unwrap_or(0),
            payload_base64,
        };
    }

    StreamRecord::LogLine(line.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_log_line() {
        assert_eq!(
            parse_record("Loading model..."),
            StreamRecord::LogLine("Loading model...".to_string())
        );
    }

    #[test]
    fn malformed_json_is_a_log_line() {
        let line = r#"{"chunk_index": 0, "audio_base64": "#;
        assert_eq!(parse_record(line), StreamRecord::LogLine(line.to_string()));
    }

    #[test]
    fn audio_chunk_parses() {
        let line = r#"{"chunk_index": 3, "audio_base64": "UklGRg=="}"#;
        assert_eq!(
            parse_record(line),
            StreamRecord::AudioChunk {
                index: 3,
                payload_base64: "UklGRg==".to_string(),
            }
        );
    }

    #[test]
    fn audio_chunk_without_index_defaults_to_zero() {
        let line = r#"{"audio_base64": "UklGRg=="}"#;
        assert_eq!(
            parse_record(line),
            StreamRecord::AudioChunk {
                index: 0,
                payload_base64: "UklGRg==".to_string(),
            }
        );
    }

    #[test]
    fn renamed_audio_field_degrades_to_log_line() {
        // Same JSON text with the payload field renamed is no longer a chunk.
        let line = r#"{"chunk_index": 3, "audio": "UklGRg=="}"#;
        assert_eq!(parse_record(line), StreamRecord::LogLine(line.to_string()));
    }

    #[test]
    fn done_with_inference_ms() {
        let line = r#"{"event": "done", "inference_ms": 900}"#;
        assert_eq!(
            parse_record(line),
            StreamRecord::Done {
                inference_ms: Some(900),
            }
        );
    }

    #[test]
    fn done_without_inference_ms() {
        let line = r#"{"event": "done"}"#;
        assert_eq!(parse_record(line), StreamRecord::Done { inference_ms: None });
    }

    #[test]
    fn done_wins_over_audio_payload() {
        // A done marker is terminal even if the server also attached a payload.
        let line = r#"{"event": "done", "audio_base64": "UklGRg=="}"#;
        assert!(matches!(parse_record(line), StreamRecord::Done { .. }));
    }

    #[test]
    fn unrecognized_event_is_a_log_line() {
        let line = r#"{"event": "progress", "step": 5}"#;
        assert_eq!(parse_record(line), StreamRecord::LogLine(line.to_string()));
    }

    #[test]
    fn structured_but_unrelated_json_is_a_log_line() {
        let line = r#"{"epoch": 10, "loss": 0.42}"#;
        assert_eq!(parse_record(line), StreamRecord::LogLine(line.to_string()));
    }

    #[test]
    fn non_object_json_is_a_log_line() {
        assert_eq!(
            parse_record("42"),
            StreamRecord::LogLine("42".to_string())
        );
        assert_eq!(
            parse_record(r#""quoted""#),
            StreamRecord::LogLine(r#""quoted""#.to_string())
        );
    }
}
