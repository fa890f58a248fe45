//! Reassembles a chunked byte stream into complete text lines.

use crate::error::{CloneCtlError, Result};
use bytes::Bytes;
use futures_util::{Stream, StreamExt};

/// Turns a fallible byte stream into an ordered sequence of complete,
/// newline-delimited text lines.
///
/// Network reads land on arbitrary byte boundaries, so the reader buffers raw
/// bytes and converts to UTF-8 only once a full line is available — a
/// multi-byte character split across two reads reassembles before decoding.
/// Empty lines are skipped; a non-empty trailing fragment without a
/// terminating newline is emitted as one final line at end of stream.
pub struct LineStreamReader<S> {
    stream: S,
    buffer: Vec<u8>,
    eof: bool,
}

impl<S, E> LineStreamReader<S>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: Vec::new(),
            eof: false,
        }
    }

    /// Next complete line, or `Ok(None)` when the stream is exhausted.
    ///
    /// A transport error mid-read discards any buffered partial content: it
    /// cannot be guaranteed complete, so it is never emitted.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw[..pos]).trim().to_string();
                if line.is_empty() {
                    continue;
                }
                return Ok(Some(line));
            }

            if self.eof {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let line = String::from_utf8_lossy(&self.buffer).trim().to_string();
                self.buffer.clear();
                if line.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(line));
            }

            match self.stream.next().await {
                Some(Ok(bytes)) => self.buffer.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    self.buffer.clear();
                    return Err(CloneCtlError::Transport {
                        message: format!("stream read failed: {e}"),
                    });
                }
                None => self.eof = true,
            }
        }
    }
}
