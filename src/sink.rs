//! Pluggable log output for streamed progress lines.
//!
//! The inference service interleaves free-text progress lines with structured
//! records on its chunked responses. Sessions forward every progress line to a
//! `LogSink`; what happens to it (console, capture, nothing) is up to the
//! caller.

/// Receiver for progress/log lines emitted during a streamed operation.
pub trait LogSink: Send {
    /// Handle one progress line. Called in arrival order.
    fn log(&mut self, line: &str);

    /// Name for logging/debugging.
    fn name(&self) -> &'static str {
        "sink"
    }
}

/// Sink that prints lines to stderr.
///
/// Severity tagging is purely presentational: lines containing "Error" are
/// highlighted, everything else is printed as-is. The parser upstream never
/// classifies severity.
pub struct ConsoleSink {
    quiet: bool,
}

impl ConsoleSink {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl LogSink for ConsoleSink {
    fn log(&mut self, line: &str) {
        if self.quiet {
            return;
        }
        #[cfg(feature = "cli")]
        {
            use owo_colors::OwoColorize;
            if line.contains("Error") {
                eprintln!("{}", line.red());
            } else {
                eprintln!("{}", line);
            }
        }
        #[cfg(not(feature = "cli"))]
        eprintln!("{}", line);
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

/// Sink that collects lines in memory, for tests and for `--save` reports.
#[derive(Default)]
pub struct CollectorSink {
    lines: Vec<String>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

impl LogSink for CollectorSink {
    fn log(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}

/// Sink that discards everything.
pub struct NullSink;

impl LogSink for NullSink {
    fn log(&mut self, _line: &str) {}

    fn name(&self) -> &'static str {
        "null"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_preserves_order() {
        let mut sink = CollectorSink::new();
        sink.log("first");
        sink.log("second");
        assert_eq!(sink.lines(), &["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn collector_into_lines_consumes() {
        let mut sink = CollectorSink::new();
        sink.log("only");
        assert_eq!(sink.into_lines(), vec!["only".to_string()]);
    }

    #[test]
    fn null_sink_accepts_anything() {
        let mut sink = NullSink;
        sink.log("ignored");
        assert_eq!(sink.name(), "null");
    }

    #[test]
    fn sinks_are_usable_as_trait_objects() {
        let mut sinks: Vec<Box<dyn LogSink>> = vec![
            Box::new(CollectorSink::new()),
            Box::new(NullSink),
            Box::new(ConsoleSink::new(true)),
        ];
        for sink in &mut sinks {
            sink.log("line");
        }
    }
}
