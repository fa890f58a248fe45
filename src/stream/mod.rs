//! Streaming core: line-delimited transport decoding and session orchestration.
//!
//! ```text
//! ┌────────────┐    ┌──────────────────┐    ┌─────────────┐    ┌───────────┐
//! │  HTTP byte │───▶│ LineStreamReader │───▶│ StreamRecord│───▶│  Chunk    │───▶ Mixer
//! │   stream   │    │ (reassemble      │    │   parser    │    │ Scheduler │
//! └────────────┘    │  complete lines) │    └─────────────┘    └───────────┘
//!                   └──────────────────┘           │
//!                                                  └── LogLine ──▶ LogSink
//! ```

pub mod reader;
pub mod record;
pub mod session;

pub use reader::LineStreamReader;
pub use record::{StreamRecord, parse_record};
pub use session::{
    CancelHandle, ChunkArrival, SessionMetrics, SessionState, StreamSession, forward_progress,
};
