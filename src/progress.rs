//! Summarization progress reporting.
//!
//! Reports observable progress while `mdai summarize` works through chunks
//! and files, so users see how many generation calls remain. Progress is
//! emitted on **stderr** so stdout stays parseable for scripts and pipes.

use std::io::Write;
use std::path::PathBuf;

/// A single progress event.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// A document exceeded the token budget and was split into `chunks`.
    Chunking { label: String, chunks: usize },
    /// Chunk `n` of `total` is being summarized.
    Chunk {
        label: String,
        n: usize,
        total: usize,
    },
    /// The partial summaries of a document (or the per-file summaries of a
    /// batch) are being combined.
    Synthesizing { label: String, parts: usize },
    /// File `n` of `total` in a multi-file run is being processed.
    File {
        path: PathBuf,
        n: usize,
        total: usize,
    },
}

/// Reports progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the summarization pipeline.
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr: "summarize notes.md  chunk 3 / 12".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Chunking { label, chunks } => {
                format!(
                    "summarize {}  split into {} chunks\n",
                    label,
                    format_number(*chunks as u64)
                )
            }
            ProgressEvent::Chunk { label, n, total } => {
                format!(
                    "summarize {}  chunk {} / {}\n",
                    label,
                    format_number(*n as u64),
                    format_number(*total as u64)
                )
            }
            ProgressEvent::Synthesizing { label, parts } => {
                format!("summarize {}  combining {} parts\n", label, parts)
            }
            ProgressEvent::File { path, n, total } => {
                format!("summarize {}  file {} / {}\n", path.display(), n, total)
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// JSON lines on stderr, for wrapping mdai in other tools.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::Chunking { label, chunks } => serde_json::json!({
                "event": "progress",
                "phase": "chunking",
                "label": label,
                "chunks": chunks
            }),
            ProgressEvent::Chunk { label, n, total } => serde_json::json!({
                "event": "progress",
                "phase": "chunk",
                "label": label,
                "n": n,
                "total": total
            }),
            ProgressEvent::Synthesizing { label, parts } => serde_json::json!({
                "event": "progress",
                "phase": "synthesizing",
                "label": label,
                "parts": parts
            }),
            ProgressEvent::File { path, n, total } => serde_json::json!({
                "event": "progress",
                "phase": "file",
                "path": path.display().to_string(),
                "n": n,
                "total": total
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// Reports nothing.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// `1234567` becomes `"1,234,567"`.
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let lead = digits.len() % 3;
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, d) in digits.char_indices() {
        if i > 0 && i % 3 == lead {
            out.push(',');
        }
        out.push(d);
    }
    out
}

/// Selected by `--progress`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Human output on a terminal, silence when stderr is redirected.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_groups_thousands() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(42), "42");
        assert_eq!(format_number(8000), "8,000");
        assert_eq!(format_number(12_345), "12,345");
        assert_eq!(format_number(123_456), "123,456");
        assert_eq!(format_number(1_048_576), "1,048,576");
    }
}
