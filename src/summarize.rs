//! Hierarchical summarization of a single document.
//!
//! Text whose estimated size fits the token budget is summarized with one
//! generation call. Larger text is split into chunks of at most
//! `token_budget * 4` bytes, each chunk is summarized on its own, and a final
//! call synthesizes the `Part i:` labeled partial summaries into one result.
//!
//! ```text
//! text ──estimate──▶ fits? ──yes──▶ generate ──▶ summary
//!                      │
//!                      no
//!                      ▼
//!                    split ──▶ part 1..N ──▶ generate ×N ──▶ synthesize ──▶ summary
//! ```
//!
//! Any generation failure aborts the whole document: no partial summary is
//! returned and nothing is retried. Blank text is rejected before any call.

use tracing::info;

use crate::chunk::{split_text_with, RegexSegmenter, Segmenter, CHARS_PER_TOKEN};
use crate::llm::{strip_code_fence, LlmError, TextGenerator};
use crate::models::PartialSummary;
use crate::pace::Pacer;
use crate::progress::{ProgressEvent, ProgressReporter};

/// System instruction shared by every summarization call.
pub const SUMMARY_SYSTEM: &str = "You are a careful technical writer. Respond with plain Markdown \
only. Do not wrap the answer in a code fence and do not add a preamble.";

/// Errors from [`Summarizer::summarize`].
#[derive(Debug, thiserror::Error)]
pub enum SummarizeError {
    #[error("nothing to summarize: {0} is empty")]
    Empty(String),
    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Size limits for one summarization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    /// Estimated tokens above which the text is chunked.
    pub tokens: usize,
    /// Byte budget handed to the splitter.
    pub chunk_chars: usize,
}

impl Budget {
    /// Derive the chunk budget from the token budget (4 chars per token).
    pub fn from_tokens(tokens: usize) -> Self {
        Self {
            tokens,
            chunk_chars: tokens.saturating_mul(CHARS_PER_TOKEN),
        }
    }
}

/// Drives the splitter and the generator for one document at a time.
pub struct Summarizer<'a> {
    generator: &'a dyn TextGenerator,
    pacer: &'a dyn Pacer,
    progress: &'a dyn ProgressReporter,
    segmenter: &'a dyn Segmenter,
}

impl<'a> Summarizer<'a> {
    pub fn new(
        generator: &'a dyn TextGenerator,
        pacer: &'a dyn Pacer,
        progress: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            generator,
            pacer,
            progress,
            segmenter: &RegexSegmenter,
        }
    }

    /// Replace the sentence segmenter used when chunking.
    pub fn with_segmenter(mut self, segmenter: &'a dyn Segmenter) -> Self {
        self.segmenter = segmenter;
        self
    }

    /// Summarize `text`, labelled `label` in prompts and progress output.
    pub async fn summarize(
        &self,
        text: &str,
        budget: Budget,
        label: &str,
    ) -> Result<String, SummarizeError> {
        if text.trim().is_empty() {
            return Err(SummarizeError::Empty(label.to_string()));
        }

        let estimated = crate::chunk::estimate_tokens(text);
        if estimated <= budget.tokens {
            info!(label, estimated, "summarizing in a single call");
            return Ok(self.call(&direct_prompt(text, label)).await?);
        }

        let chunks = split_text_with(self.segmenter, text, budget.chunk_chars);
        if chunks.is_empty() {
            return Err(SummarizeError::Empty(label.to_string()));
        }
        let total = chunks.len();
        info!(label, estimated, chunks = total, "summarizing in chunks");
        self.progress.report(ProgressEvent::Chunking {
            label: label.to_string(),
            chunks: total,
        });

        let mut partials = Vec::with_capacity(total);
        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 {
                self.pacer.pause().await;
            }
            self.progress.report(ProgressEvent::Chunk {
                label: label.to_string(),
                n: i + 1,
                total,
            });
            let text = self.call(&chunk_prompt(chunk, i + 1, total, label)).await?;
            partials.push(PartialSummary {
                index: i + 1,
                total,
                text,
            });
        }

        self.progress.report(ProgressEvent::Synthesizing {
            label: label.to_string(),
            parts: partials.len(),
        });
        Ok(self.call(&synthesis_prompt(&partials, label)).await?)
    }

    /// Produce one overview from several per-file summaries.
    pub async fn combine(&self, sections: &[(String, String)]) -> Result<String, LlmError> {
        self.progress.report(ProgressEvent::Synthesizing {
            label: "all files".to_string(),
            parts: sections.len(),
        });
        self.call(&combine_prompt(sections)).await
    }

    async fn call(&self, prompt: &str) -> Result<String, LlmError> {
        let text = self.generator.generate(prompt, Some(SUMMARY_SYSTEM)).await?;
        Ok(strip_code_fence(&text).to_string())
    }
}

fn direct_prompt(text: &str, label: &str) -> String {
    format!(
        "Summarize {label} concisely but comprehensively. Keep the key points, \
         decisions, and any figures.\n\n{text}"
    )
}

fn chunk_prompt(chunk: &str, index: usize, total: usize, label: &str) -> String {
    format!(
        "This is part {index} of {total} of {label}. Summarize the key points of \
         this part only; the parts will be combined afterwards.\n\n{chunk}"
    )
}

fn synthesis_prompt(partials: &[PartialSummary], label: &str) -> String {
    let parts: Vec<String> = partials.iter().map(PartialSummary::labeled).collect();
    format!(
        "The following are summaries of consecutive parts of {label}. Combine them \
         into a single cohesive summary without repeating points.\n\n{}",
        parts.join("\n\n")
    )
}

fn combine_prompt(sections: &[(String, String)]) -> String {
    let body: Vec<String> = sections
        .iter()
        .map(|(name, summary)| format!("## {}\n{}", name, summary.trim()))
        .collect();
    format!(
        "The following are summaries of {} files. Write one overview covering all \
         of them: the common themes first, then what is specific to each file.\n\n{}",
        sections.len(),
        body.join("\n\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::ScriptedGenerator;
    use crate::pace::NoDelay;
    use crate::progress::NoProgress;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingPacer(AtomicUsize);

    #[async_trait]
    impl Pacer for CountingPacer {
        async fn pause(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn sentences(count: usize, len: usize) -> String {
        (0..count)
            .map(|i| format!("S{}{}.", i, "x".repeat(len)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_budget_from_tokens() {
        let budget = Budget::from_tokens(1000);
        assert_eq!(budget.chunk_chars, 4000);
    }

    #[tokio::test]
    async fn test_small_text_single_call() {
        let generator = ScriptedGenerator::replying("a short summary");
        let summarizer = Summarizer::new(&generator, &NoDelay, &NoProgress);

        let text = "word ".repeat(40);
        let summary = summarizer
            .summarize(&text, Budget::from_tokens(1_000_000), "note")
            .await
            .unwrap();

        assert_eq!(summary, "a short summary");
        assert_eq!(generator.calls(), 1);
        assert!(generator.prompts()[0].contains(text.as_str()));
    }

    #[tokio::test]
    async fn test_large_text_chunk_count_plus_one_calls() {
        let generator = ScriptedGenerator::new();
        let pacer = CountingPacer::default();
        let summarizer = Summarizer::new(&generator, &pacer, &NoProgress);

        let text = sentences(10, 300);
        let budget = Budget::from_tokens(200);
        let expected_chunks = split_text_with(&RegexSegmenter, &text, budget.chunk_chars).len();
        assert!(expected_chunks > 1);

        let summary = summarizer.summarize(&text, budget, "big.md").await.unwrap();

        assert_eq!(generator.calls(), expected_chunks + 1);
        assert_eq!(summary, format!("summary {}", expected_chunks + 1));
        assert_eq!(pacer.0.load(Ordering::SeqCst), expected_chunks - 1);
    }

    #[tokio::test]
    async fn test_synthesis_prompt_contains_parts_in_order() {
        let generator = ScriptedGenerator::new();
        let summarizer = Summarizer::new(&generator, &NoDelay, &NoProgress);

        let text = sentences(6, 100);
        let budget = Budget::from_tokens(30);
        summarizer.summarize(&text, budget, "doc").await.unwrap();

        let prompts = generator.prompts();
        let chunk_count = prompts.len() - 1;
        assert!(prompts[0].contains(&format!("part 1 of {}", chunk_count)));

        let last = prompts.last().unwrap();
        let mut cursor = 0;
        for i in 1..=chunk_count {
            let needle = format!("Part {}:\nsummary {}", i, i);
            let pos = last[cursor..]
                .find(&needle)
                .unwrap_or_else(|| panic!("missing {:?} in synthesis prompt", needle));
            cursor += pos + needle.len();
        }
    }

    #[tokio::test]
    async fn test_chunk_failure_aborts() {
        let generator = ScriptedGenerator::failing_on("part 2 of");
        let summarizer = Summarizer::new(&generator, &NoDelay, &NoProgress);

        let text = sentences(6, 100);
        let result = summarizer.summarize(&text, Budget::from_tokens(30), "doc").await;

        assert!(matches!(
            result,
            Err(SummarizeError::Llm(LlmError::Api { status: 500, .. }))
        ));
        // Chunk 1 and the failing chunk 2; no further calls and no synthesis.
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn test_blank_text_makes_no_calls() {
        let generator = ScriptedGenerator::new();
        let summarizer = Summarizer::new(&generator, &NoDelay, &NoProgress);

        let result = summarizer.summarize("", Budget::from_tokens(10), "a.md").await;
        assert!(matches!(result, Err(SummarizeError::Empty(ref label)) if label == "a.md"));

        // Above the budget, but splits into nothing.
        let spaces = " ".repeat(500);
        let result = summarizer.summarize(&spaces, Budget::from_tokens(10), "b.md").await;
        assert!(matches!(result, Err(SummarizeError::Empty(_))));

        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_custom_segmenter_is_used() {
        struct LineSegmenter(AtomicUsize);

        impl Segmenter for LineSegmenter {
            fn sentences<'t>(&self, text: &'t str) -> Vec<&'t str> {
                self.0.fetch_add(1, Ordering::SeqCst);
                text.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
            }
        }

        let generator = ScriptedGenerator::new();
        let segmenter = LineSegmenter(AtomicUsize::new(0));
        let summarizer =
            Summarizer::new(&generator, &NoDelay, &NoProgress).with_segmenter(&segmenter);

        let text = "first line\nsecond line\nthird line";
        summarizer.summarize(text, Budget::from_tokens(3), "lines").await.unwrap();

        assert_eq!(segmenter.0.load(Ordering::SeqCst), 1);
        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 4);
        assert!(prompts[0].ends_with("first line"));
        assert!(prompts[1].ends_with("second line"));
        assert!(prompts[2].ends_with("third line"));
    }

    #[tokio::test]
    async fn test_strips_wrapping_code_fence() {
        let generator = ScriptedGenerator::replying("```markdown\n- point\n```");
        let summarizer = Summarizer::new(&generator, &NoDelay, &NoProgress);
        let summary = summarizer
            .summarize("Short.", Budget::from_tokens(100), "x")
            .await
            .unwrap();
        assert_eq!(summary, "- point");
    }

    #[tokio::test]
    async fn test_combine_prompt_lists_files() {
        let generator = ScriptedGenerator::new();
        let summarizer = Summarizer::new(&generator, &NoDelay, &NoProgress);
        let sections = vec![
            ("a.md".to_string(), "alpha".to_string()),
            ("b.md".to_string(), "beta".to_string()),
        ];
        summarizer.combine(&sections).await.unwrap();

        let prompt = &generator.prompts()[0];
        assert!(prompt.contains("2 files"));
        assert!(prompt.find("## a.md\nalpha").unwrap() < prompt.find("## b.md\nbeta").unwrap());
    }
}
