//! Multi-file summarization.
//!
//! Files are processed one after another with a pause between them. Unlike
//! the per-document pipeline in [`crate::summarize`], a failure here is
//! isolated to the file it happened in: it is logged and recorded in the
//! [`BatchReport`], and the next file is processed.

use std::path::PathBuf;
use tracing::{info, warn};

use crate::inputs::read_text_file;
use crate::models::{BatchReport, FileFailure, FileSummary, SkipReason, SkippedFile};
use crate::pace::Pacer;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::summarize::{Budget, Summarizer};

/// Options for [`summarize_files`].
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub budget: Budget,
    /// Files larger than this are skipped.
    pub max_file_bytes: u64,
    /// Always produce a cross-file overview.
    pub combine: bool,
    /// Produce a cross-file overview when more files than this are given.
    pub combine_threshold: usize,
}

impl BatchOptions {
    fn wants_overview(&self, file_count: usize) -> bool {
        self.combine || file_count > self.combine_threshold
    }
}

/// Summarize `files` in order.
///
/// # Errors
///
/// Only the cross-file synthesis call can fail the batch. Per-file read and
/// generation errors land in [`BatchReport::failures`].
pub async fn summarize_files(
    summarizer: &Summarizer<'_>,
    files: &[PathBuf],
    options: &BatchOptions,
    file_pacer: &dyn Pacer,
    progress: &dyn ProgressReporter,
) -> anyhow::Result<BatchReport> {
    let mut report = BatchReport::default();
    let total = files.len();

    for (i, path) in files.iter().enumerate() {
        if i > 0 {
            file_pacer.pause().await;
        }
        progress.report(ProgressEvent::File {
            path: path.clone(),
            n: i + 1,
            total,
        });

        let bytes = match std::fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot stat file, skipping");
                report.failures.push(FileFailure {
                    path: path.clone(),
                    error: e.to_string(),
                });
                continue;
            }
        };
        if bytes > options.max_file_bytes {
            warn!(
                path = %path.display(),
                bytes,
                limit = options.max_file_bytes,
                "file exceeds size limit, skipping"
            );
            report.skipped.push(SkippedFile {
                path: path.clone(),
                bytes,
                reason: SkipReason::TooLarge,
            });
            continue;
        }

        let content = match read_text_file(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read file");
                report.failures.push(FileFailure {
                    path: path.clone(),
                    error: e.to_string(),
                });
                continue;
            }
        };
        if content.trim().is_empty() {
            info!(path = %path.display(), "file is blank, skipping");
            report.skipped.push(SkippedFile {
                path: path.clone(),
                bytes,
                reason: SkipReason::Blank,
            });
            continue;
        }

        let label = path.display().to_string();
        match summarizer.summarize(&content, options.budget, &label).await {
            Ok(summary) => {
                info!(path = %label, "file summarized");
                report.summaries.push(FileSummary {
                    path: path.clone(),
                    summary,
                });
            }
            Err(e) => {
                warn!(path = %label, error = %e, "failed to summarize file");
                report.failures.push(FileFailure {
                    path: path.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    if options.wants_overview(total) && !report.summaries.is_empty() {
        let sections: Vec<(String, String)> = report
            .summaries
            .iter()
            .map(|s| (s.path.display().to_string(), s.summary.clone()))
            .collect();
        file_pacer.pause().await;
        report.combined = Some(summarizer.combine(&sections).await?);
    }

    Ok(report)
}
