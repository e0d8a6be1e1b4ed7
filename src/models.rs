//! Core data models used throughout mdai.
//!
//! These types represent the documents, partial summaries, and batch results
//! that flow through the summarization pipeline. None of them are persisted;
//! they live for the duration of a single command invocation.

use std::fmt;
use std::path::PathBuf;

use crate::chunk::estimate_tokens;

/// Where a [`Document`]'s content came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Text passed directly on the command line.
    Text,
    /// Text read from standard input.
    Stdin,
    /// Text read from a file.
    File(PathBuf),
}

/// An immutable body of text to be summarized.
#[derive(Debug, Clone)]
pub struct Document {
    pub content: String,
    pub origin: Origin,
}

impl Document {
    pub fn new(content: impl Into<String>, origin: Origin) -> Self {
        Self {
            content: content.into(),
            origin,
        }
    }

    /// Human-readable label used in prompts and progress output.
    pub fn label(&self) -> String {
        match &self.origin {
            Origin::Text => "the provided text".to_string(),
            Origin::Stdin => "standard input".to_string(),
            Origin::File(path) => path.display().to_string(),
        }
    }

    /// Estimated size in tokens (derived, never stored).
    pub fn estimated_tokens(&self) -> usize {
        estimate_tokens(&self.content)
    }
}

/// The summary of exactly one chunk, tagged with its 1-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialSummary {
    pub index: usize,
    pub total: usize,
    pub text: String,
}

impl PartialSummary {
    /// The `Part i:` labeled form used when concatenating partials for synthesis.
    pub fn labeled(&self) -> String {
        format!("Part {}:\n{}", self.index, self.text.trim())
    }
}

/// A successfully summarized file in a multi-file run.
#[derive(Debug, Clone)]
pub struct FileSummary {
    pub path: PathBuf,
    pub summary: String,
}

/// A file whose summarization failed; the rest of the batch continued.
#[derive(Debug, Clone)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Why a file in a multi-file run was not summarized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Larger than the per-file size ceiling.
    TooLarge,
    /// Empty or whitespace only.
    Blank,
}

/// A file left out of a multi-file run without a generation call.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub bytes: u64,
    pub reason: SkipReason,
}

/// Outcome of a multi-file summarization run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub summaries: Vec<FileSummary>,
    pub failures: Vec<FileFailure>,
    pub skipped: Vec<SkippedFile>,
    /// Cross-file overview, present only when combination was requested or
    /// the file count exceeded the threshold.
    pub combined: Option<String>,
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} summarized, {} failed, {} skipped",
            self.summaries.len(),
            self.failures.len(),
            self.skipped.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_label() {
        assert_eq!(Document::new("x", Origin::Text).label(), "the provided text");
        assert_eq!(Document::new("x", Origin::Stdin).label(), "standard input");
        let doc = Document::new("x", Origin::File(PathBuf::from("notes/a.md")));
        assert_eq!(doc.label(), "notes/a.md");
    }

    #[test]
    fn test_partial_summary_labeled() {
        let partial = PartialSummary {
            index: 2,
            total: 3,
            text: "  middle part  \n".to_string(),
        };
        assert_eq!(partial.labeled(), "Part 2:\nmiddle part");
    }

    #[test]
    fn test_batch_report_display() {
        let report = BatchReport::default();
        assert_eq!(report.to_string(), "0 summarized, 0 failed, 0 skipped");
    }
}
