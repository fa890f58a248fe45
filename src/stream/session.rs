//! One synthesis request end to end: pump, decode, schedule, measure.

use crate::audio::chunk::decode_chunk;
use crate::audio::mixer::Mixer;
use crate::audio::scheduler::{ChunkScheduler, SchedulerConfig};
use crate::error::{CloneCtlError, Result};
use crate::sink::LogSink;
use crate::stream::reader::LineStreamReader;
use crate::stream::record::{StreamRecord, parse_record};
use bytes::Bytes;
use futures_util::Stream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// Lifecycle of a synthesis session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Streaming,
    Completed,
    Cancelled,
    Failed,
}

/// Cloneable handle that cancels a running session.
///
/// Cancellation is cooperative: the pump loop checks the flag at every
/// suspension point, and a decode that resolves after cancellation is never
/// scheduled. Calling `cancel` with no session running is a no-op.
#[derive(Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if !self.flag.swap(true, Ordering::SeqCst) {
            // notify_one stores a permit, so a cancel that lands before the
            // pump reaches its next await is not lost.
            self.notify.notify_one();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    async fn notified(&self) {
        self.notify.notified().await;
    }
}

/// Arrival record for one scheduled chunk.
#[derive(Debug, Clone)]
pub struct ChunkArrival {
    pub index: u64,
    pub duration_secs: f64,
    pub start_secs: f64,
    pub received_at: Instant,
}

/// Latency measurements for one session.
#[derive(Debug, Clone)]
pub struct SessionMetrics {
    started_at: Instant,
    pub time_to_first_audio: Option<Duration>,
    pub total_ms: Option<u64>,
    pub chunks: Vec<ChunkArrival>,
}

impl SessionMetrics {
    fn new() -> Self {
        Self {
            started_at: Instant::now(),
            time_to_first_audio: None,
            total_ms: None,
            chunks: Vec::new(),
        }
    }

    /// Wall-clock time since the session started.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Total seconds of audio scheduled.
    pub fn audio_secs(&self) -> f64 {
        self.chunks.iter().map(|c| c.duration_secs).sum()
    }

    /// Prints a user-friendly summary of session performance.
    pub fn print_summary(&self) {
        eprintln!();
        eprintln!("=== Synthesis Summary ===");
        eprintln!(
            "Received {} chunk{} ({:.1}s of audio)",
            self.chunks.len(),
            if self.chunks.len() == 1 { "" } else { "s" },
            self.audio_secs()
        );
        if let Some(ttfa) = self.time_to_first_audio {
            eprintln!("  Time to first audio:  {} ms", ttfa.as_millis());
        }
        if let Some(total) = self.total_ms {
            eprintln!("  Total inference:      {} ms", total);
        }
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives one synthesis stream to a terminal state.
///
/// Sessions are one-shot: create, `run`, inspect. The caller owns the network
/// side (opening `POST /stream`) and the audio side (a resumed output context
/// whose mixer is passed in); the session owns everything between the two.
pub struct StreamSession {
    state: SessionState,
    cancel: CancelHandle,
    scheduler: ChunkScheduler,
    metrics: SessionMetrics,
}

impl StreamSession {
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_cancel(config, CancelHandle::new())
    }

    /// Create a session driven by an externally owned cancel handle,
    /// e.g. one already wired to Ctrl-C.
    pub fn with_cancel(config: SchedulerConfig, cancel: CancelHandle) -> Self {
        Self {
            state: SessionState::Idle,
            cancel,
            scheduler: ChunkScheduler::new(config),
            metrics: SessionMetrics::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    /// Handle for cancelling this session from another task (e.g. Ctrl-C).
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Pump the response byte stream to completion.
    ///
    /// Lines are processed strictly in arrival order, and each record is
    /// processed to completion — including its decode — before the next line
    /// is pulled. That serialization is what guarantees a fast-decoding later
    /// chunk can never be scheduled ahead of an earlier one.
    pub async fn run<S, E>(
        &mut self,
        byte_stream: S,
        mixer: &Arc<Mutex<Mixer>>,
        sink: &mut dyn LogSink,
    ) -> Result<()>
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
        E: std::fmt::Display,
    {
        if self.state != SessionState::Idle {
            return Err(CloneCtlError::Other(
                "session already consumed; create a new one".to_string(),
            ));
        }

        self.metrics = SessionMetrics::new();
        {
            let guard = lock_mixer(mixer)?;
            // The schedule restarts at the current clock position: whatever an
            // earlier session left behind must not delay this one.
            self.scheduler.reset(guard.now_secs());
        }
        self.state = SessionState::Streaming;

        let mut reader = LineStreamReader::new(byte_stream);
        let cancel = self.cancel.clone();

        loop {
            if cancel.is_cancelled() {
                self.state = SessionState::Cancelled;
                return Ok(());
            }

            let line = tokio::select! {
                biased;
                _ = cancel.notified() => {
                    self.state = SessionState::Cancelled;
                    return Ok(());
                }
                line = reader.next_line() => line,
            };

            match line {
                Err(e) => {
                    self.state = SessionState::Failed;
                    return Err(e);
                }
                Ok(None) => {
                    // Stream ended without a done marker; treat as complete
                    // with the measured wall-clock total.
                    self.metrics.total_ms = Some(self.metrics.elapsed().as_millis() as u64);
                    self.state = SessionState::Completed;
                    return Ok(());
                }
                Ok(Some(text)) => self.handle_record(parse_record(&text), mixer, sink)?,
            }

            match self.state {
                SessionState::Streaming => {}
                _ => return Ok(()),
            }
        }
    }

    fn handle_record(
        &mut self,
        record: StreamRecord,
        mixer: &Arc<Mutex<Mixer>>,
        sink: &mut dyn LogSink,
    ) -> Result<()> {
        match record {
            StreamRecord::LogLine(line) => sink.log(&line),
            StreamRecord::Done { inference_ms } => {
                // Prefer the server-side measurement, fall back to ours.
                self.metrics.total_ms =
                    Some(inference_ms.unwrap_or(self.metrics.elapsed().as_millis() as u64));
                self.state = SessionState::Completed;
            }
            StreamRecord::AudioChunk {
                index,
                payload_base64,
            } => {
                let target_rate = lock_mixer(mixer)?.sample_rate();
                let decoded = decode_chunk(index, &payload_base64, target_rate);

                // Cancellation may have landed while decoding; scheduling
                // after cancel() returns is forbidden.
                if self.cancel.is_cancelled() {
                    self.state = SessionState::Cancelled;
                    return Ok(());
                }

                let chunk = match decoded {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        sink.log(&format!("Error: {e}"));
                        return Ok(());
                    }
                };

                let received_at = Instant::now();
                let placed = {
                    let mut guard = lock_mixer(mixer)?;
                    let now = guard.now_secs();
                    self.scheduler.schedule(chunk, now, &mut guard)
                };

                match placed {
                    Ok(placed) => {
                        if self.metrics.chunks.is_empty() {
                            self.metrics.time_to_first_audio = Some(self.metrics.elapsed());
                        }
                        self.metrics.chunks.push(ChunkArrival {
                            index: placed.index,
                            duration_secs: placed.duration_secs,
                            start_secs: placed.start_secs,
                            received_at,
                        });
                    }
                    Err(e @ CloneCtlError::ChunkOrdering { .. }) => {
                        self.state = SessionState::Failed;
                        return Err(e);
                    }
                    Err(e) => {
                        // Zero-duration chunk: dropped, schedule untouched.
                        sink.log(&format!("Error: {e}"));
                    }
                }
            }
        }
        Ok(())
    }
}

fn lock_mixer(mixer: &Arc<Mutex<Mixer>>) -> Result<std::sync::MutexGuard<'_, Mixer>> {
    mixer.lock().map_err(|_| CloneCtlError::AudioOutput {
        message: "mixer lock poisoned".to_string(),
    })
}

/// Pump a progress-only stream (`/preprocess`, `/train`) into a log sink.
///
/// These endpoints emit free text; a structured record showing up anyway is
/// forwarded verbatim rather than dropped.
pub async fn forward_progress<S, E>(byte_stream: S, sink: &mut dyn LogSink) -> Result<()>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    let mut reader = LineStreamReader::new(byte_stream);
    while let Some(line) = reader.next_line().await? {
        match parse_record(&line) {
            StreamRecord::LogLine(text) => sink.log(&text),
            _ => sink.log(&line),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CollectorSink;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use futures_util::{StreamExt, stream};
    use std::convert::Infallible;
    use std::io::Cursor;

    const RATE: u32 = 16000;

    fn wav_base64(duration_secs: f64) -> String {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let frames = (duration_secs * RATE as f64).round() as usize;
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut buffer, spec).expect("create writer");
            for _ in 0..frames {
                writer.write_sample(1000i16).expect("write sample");
            }
            writer.finalize().expect("finalize");
        }
        BASE64.encode(buffer.into_inner())
    }

    fn byte_stream(
        lines: Vec<String>,
    ) -> impl Stream<Item = std::result::Result<Bytes, Infallible>> + Unpin {
        let body = lines.join("\n") + "\n";
        stream::iter(vec![Ok(Bytes::from(body))])
    }

    fn test_mixer() -> Arc<Mutex<Mixer>> {
        Arc::new(Mutex::new(Mixer::new(RATE)))
    }

    fn session() -> StreamSession {
        StreamSession::new(SchedulerConfig::default())
    }

    #[tokio::test]
    async fn new_session_is_idle() {
        let s = session();
        assert_eq!(s.state(), SessionState::Idle);
        assert!(s.metrics().chunks.is_empty());
    }

    #[tokio::test]
    async fn log_lines_are_forwarded_to_the_sink() {
        let mut s = session();
        let mixer = test_mixer();
        let mut sink = CollectorSink::new();

        s.run(
            byte_stream(vec![
                "Loading model...".to_string(),
                r#"{"event":"done","inference_ms":5}"#.to_string(),
            ]),
            &mixer,
            &mut sink,
        )
        .await
        .expect("run");

        assert_eq!(sink.lines(), &["Loading model...".to_string()]);
        assert_eq!(s.state(), SessionState::Completed);
    }

    #[tokio::test]
    async fn done_prefers_server_reported_total() {
        let mut s = session();
        let mixer = test_mixer();
        let mut sink = CollectorSink::new();

        s.run(
            byte_stream(vec![r#"{"event":"done","inference_ms":900}"#.to_string()]),
            &mixer,
            &mut sink,
        )
        .await
        .expect("run");

        assert_eq!(s.metrics().total_ms, Some(900));
    }

    #[tokio::test]
    async fn done_without_server_total_falls_back_to_measured() {
        let mut s = session();
        let mixer = test_mixer();
        let mut sink = CollectorSink::new();

        s.run(
            byte_stream(vec![r#"{"event":"done"}"#.to_string()]),
            &mixer,
            &mut sink,
        )
        .await
        .expect("run");

        assert!(s.metrics().total_ms.is_some());
    }

    #[tokio::test]
    async fn stream_end_without_done_still_completes() {
        let mut s = session();
        let mixer = test_mixer();
        let mut sink = CollectorSink::new();

        s.run(byte_stream(vec!["working".to_string()]), &mixer, &mut sink)
            .await
            .expect("run");

        assert_eq!(s.state(), SessionState::Completed);
        assert!(s.metrics().total_ms.is_some());
    }

    #[tokio::test]
    async fn chunks_are_scheduled_and_measured() {
        let mut s = session();
        let mixer = test_mixer();
        let mut sink = CollectorSink::new();

        let lines = vec![
            format!(r#"{{"chunk_index":0,"audio_base64":"{}"}}"#, wav_base64(0.5)),
            format!(r#"{{"chunk_index":1,"audio_base64":"{}"}}"#, wav_base64(0.5)),
            r#"{"event":"done","inference_ms":900}"#.to_string(),
        ];
        s.run(byte_stream(lines), &mixer, &mut sink)
            .await
            .expect("run");

        assert_eq!(s.state(), SessionState::Completed);
        let metrics = s.metrics();
        assert_eq!(metrics.chunks.len(), 2);
        assert!(metrics.time_to_first_audio.is_some());
        assert_eq!(metrics.total_ms, Some(900));

        let overlap = s.scheduler.config().overlap_secs;
        let delta = metrics.chunks[1].start_secs - metrics.chunks[0].start_secs;
        assert!(
            (delta - (0.5 - overlap)).abs() < 1e-6,
            "second chunk should start one chunk minus the overlap later, got {delta}"
        );
        assert_eq!(mixer.lock().expect("lock").pending_clips(), 2);
    }

    #[tokio::test]
    async fn undecodable_chunk_is_dropped_and_session_completes() {
        let mut s = session();
        let mixer = test_mixer();
        let mut sink = CollectorSink::new();

        let lines = vec![
            r#"{"audio_base64":"<invalid>"}"#.to_string(),
            r#"{"event":"done"}"#.to_string(),
        ];
        s.run(byte_stream(lines), &mixer, &mut sink)
            .await
            .expect("run");

        assert_eq!(s.state(), SessionState::Completed);
        assert!(s.metrics().chunks.is_empty());
        assert_eq!(mixer.lock().expect("lock").pending_clips(), 0);
        assert!(
            sink.lines().iter().any(|l| l.contains("Error")),
            "decode failure should be reported via the sink"
        );
    }

    #[tokio::test]
    async fn out_of_order_chunk_fails_the_session() {
        let mut s = session();
        let mixer = test_mixer();
        let mut sink = CollectorSink::new();

        let lines = vec![
            format!(r#"{{"chunk_index":1,"audio_base64":"{}"}}"#, wav_base64(0.1)),
            format!(r#"{{"chunk_index":0,"audio_base64":"{}"}}"#, wav_base64(0.1)),
        ];
        let result = s.run(byte_stream(lines), &mixer, &mut sink).await;

        assert!(matches!(result, Err(CloneCtlError::ChunkOrdering { .. })));
        assert_eq!(s.state(), SessionState::Failed);
    }

    #[tokio::test]
    async fn transport_error_fails_the_session() {
        let mut s = session();
        let mixer = test_mixer();
        let mut sink = CollectorSink::new();

        let items: Vec<std::result::Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"progress\n")),
            Err(std::io::Error::other("connection reset")),
        ];
        let result = s
            .run(stream::iter(items), &mixer, &mut sink)
            .await;

        assert!(matches!(result, Err(CloneCtlError::Transport { .. })));
        assert_eq!(s.state(), SessionState::Failed);
    }

    #[tokio::test]
    async fn cancel_before_run_schedules_nothing() {
        let mut s = session();
        let mixer = test_mixer();
        let mut sink = CollectorSink::new();

        s.cancel_handle().cancel();
        let lines = vec![format!(
            r#"{{"chunk_index":0,"audio_base64":"{}"}}"#,
            wav_base64(0.5)
        )];
        s.run(byte_stream(lines), &mixer, &mut sink)
            .await
            .expect("cancelled run is not an error");

        assert_eq!(s.state(), SessionState::Cancelled);
        assert!(s.metrics().chunks.is_empty());
        assert_eq!(mixer.lock().expect("lock").pending_clips(), 0);
    }

    #[tokio::test]
    async fn cancel_mid_stream_stops_scheduling() {
        let mut s = session();
        let mixer = test_mixer();
        let mut sink = CollectorSink::new();
        let handle = s.cancel_handle();

        // First chunk arrives normally; the cancel fires while the second
        // chunk's bytes are being delivered, so its decode resolves after
        // cancellation and must not be scheduled.
        let first = format!(
            r#"{{"chunk_index":0,"audio_base64":"{}"}}"#,
            wav_base64(0.25)
        );
        let second = format!(
            r#"{{"chunk_index":1,"audio_base64":"{}"}}"#,
            wav_base64(0.25)
        );
        let canceller = handle.clone();
        let items = stream::iter(vec![
            Bytes::from(format!("{first}\n")),
            Bytes::from(format!("{second}\n")),
        ])
        .enumerate()
        .map(move |(i, bytes)| {
            if i == 1 {
                canceller.cancel();
            }
            Ok::<_, Infallible>(bytes)
        });
        s.run(items, &mixer, &mut sink)
            .await
            .expect("cancelled run is not an error");

        assert_eq!(s.state(), SessionState::Cancelled);
        assert_eq!(
            s.metrics().chunks.len(),
            1,
            "only the chunk that arrived before cancellation may be scheduled"
        );
        assert_eq!(mixer.lock().expect("lock").pending_clips(), 1);
    }

    #[tokio::test]
    async fn session_cannot_be_reused() {
        let mut s = session();
        let mixer = test_mixer();
        let mut sink = CollectorSink::new();

        s.run(byte_stream(vec![r#"{"event":"done"}"#.to_string()]), &mixer, &mut sink)
            .await
            .expect("first run");
        let again = s
            .run(byte_stream(vec![]), &mixer, &mut sink)
            .await;
        assert!(again.is_err());
    }

    #[tokio::test]
    async fn forward_progress_pumps_all_lines() {
        let mut sink = CollectorSink::new();
        forward_progress(
            byte_stream(vec![
                "Segmenting audio...".to_string(),
                "Error: clip 3 too short".to_string(),
                "Done.".to_string(),
            ]),
            &mut sink,
        )
        .await
        .expect("forward");

        assert_eq!(sink.lines().len(), 3);
        assert_eq!(sink.lines()[1], "Error: clip 3 too short");
    }
}
