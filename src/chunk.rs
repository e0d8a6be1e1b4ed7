//! Sentence-boundary text splitter and token estimator.
//!
//! Splits arbitrarily large text into pieces that fit an LLM request,
//! respecting a `max_chars` byte budget. Splitting happens on sentence
//! boundaries so that partial summaries see whole sentences.
//!
//! # Algorithm
//!
//! 1. Segment the text into sentences. A boundary follows `.`, `!`, or `?`
//!    when immediately followed by whitespace. This is a heuristic: `Dr. Smith`
//!    splits after `Dr.`, while `3.14` stays intact because no whitespace
//!    follows the dot.
//! 2. Greedily pack sentences into a running chunk, joined by a single space,
//!    while the chunk stays within `max_chars`.
//! 3. A sentence that alone exceeds `max_chars` is split by paragraph breaks
//!    (blank lines), and any paragraph that is still too long is split into
//!    whitespace-delimited words packed the same way.
//! 4. A single word longer than `max_chars` becomes its own oversized chunk.
//!    It is never truncated.
//!
//! # Guarantees
//!
//! - Chunks preserve the original order, and no non-whitespace character is
//!   dropped or invented. Whitespace is normalized only at chunk boundaries
//!   and between packed units.
//! - Every chunk is at most `max_chars` bytes unless it is a single word that
//!   is itself larger.
//! - No chunk is empty, and the output is deterministic.
//!
//! # Example
//!
//! ```rust
//! use mdai::chunk::split_text;
//!
//! let chunks = split_text("One. Two. Three.", 9);
//! assert_eq!(chunks, vec!["One. Two.", "Three."]);
//! ```

use regex::Regex;
use std::sync::LazyLock;

/// Approximate characters-per-token ratio.
///
/// This is a rough heuristic (4 chars ≈ 1 token), used only to decide
/// whether chunking is needed.
pub const CHARS_PER_TOKEN: usize = 4;

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("sentence boundary regex"));
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n[ \t]*\r?\n\s*").expect("paragraph break regex"));

/// Estimate the token count of `text` as `ceil(chars / 4)`.
///
/// Returns 0 for empty input.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Boundary detection used by the splitter.
///
/// Only [`sentences`](Segmenter::sentences) is required; paragraph and word
/// segmentation have defaults that rarely need replacing. Implementations
/// return trimmed, non-empty slices of the input in order.
pub trait Segmenter: Send + Sync {
    /// Split `text` into sentences.
    fn sentences<'t>(&self, text: &'t str) -> Vec<&'t str>;

    /// Split `text` into blank-line-delimited paragraphs.
    fn paragraphs<'t>(&self, text: &'t str) -> Vec<&'t str> {
        PARAGRAPH_BREAK
            .split(text)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    }

    /// Split `text` into whitespace-delimited words.
    fn words<'t>(&self, text: &'t str) -> Vec<&'t str> {
        text.split_whitespace().collect()
    }
}

/// The default punctuation-plus-whitespace sentence segmenter.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexSegmenter;

impl Segmenter for RegexSegmenter {
    fn sentences<'t>(&self, text: &'t str) -> Vec<&'t str> {
        let mut sentences = Vec::new();
        let mut start = 0;

        for m in SENTENCE_END.find_iter(text) {
            // The terminator is a single ASCII byte and stays with its sentence.
            let end = m.start() + 1;
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = m.end();
        }

        let tail = text[start..].trim();
        if !tail.is_empty() {
            sentences.push(tail);
        }

        sentences
    }
}

/// Split `text` into chunks of at most `max_chars` bytes using the default
/// [`RegexSegmenter`].
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    split_text_with(&RegexSegmenter, text, max_chars)
}

/// Split `text` into chunks of at most `max_chars` bytes using `segmenter`.
///
/// A `max_chars` of 0 is treated as 1.
pub fn split_text_with(segmenter: &dyn Segmenter, text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut packer = Packer::new(max_chars, " ");

    for sentence in segmenter.sentences(text) {
        if sentence.len() > max_chars {
            for piece in split_oversized(segmenter, sentence, max_chars) {
                packer.emit(piece);
            }
        } else {
            packer.push(sentence);
        }
    }

    packer.finish()
}

/// Fall back to paragraph, then word boundaries for a sentence that does
/// not fit on its own.
fn split_oversized(segmenter: &dyn Segmenter, sentence: &str, max_chars: usize) -> Vec<String> {
    let mut packer = Packer::new(max_chars, "\n\n");

    for paragraph in segmenter.paragraphs(sentence) {
        if paragraph.len() > max_chars {
            let mut words = Packer::new(max_chars, " ");
            for word in segmenter.words(paragraph) {
                if word.len() > max_chars {
                    words.emit(word.to_string());
                } else {
                    words.push(word);
                }
            }
            for piece in words.finish() {
                packer.emit(piece);
            }
        } else {
            packer.push(paragraph);
        }
    }

    packer.finish()
}

/// Greedy accumulator shared by every split level.
struct Packer {
    max_chars: usize,
    separator: &'static str,
    current: String,
    chunks: Vec<String>,
}

impl Packer {
    fn new(max_chars: usize, separator: &'static str) -> Self {
        Self {
            max_chars,
            separator,
            current: String::new(),
            chunks: Vec::new(),
        }
    }

    /// Append a unit that fits the budget on its own.
    fn push(&mut self, unit: &str) {
        if self.current.is_empty() {
            self.current.push_str(unit);
            return;
        }

        if self.current.len() + self.separator.len() + unit.len() <= self.max_chars {
            self.current.push_str(self.separator);
            self.current.push_str(unit);
        } else {
            self.flush();
            self.current.push_str(unit);
        }
    }

    /// Close the running chunk and emit `chunk` as-is after it.
    fn emit(&mut self, chunk: String) {
        self.flush();
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            self.chunks.push(trimmed.to_string());
        }
    }

    fn flush(&mut self) {
        let trimmed = self.current.trim();
        if !trimmed.is_empty() {
            self.chunks.push(trimmed.to_string());
        }
        self.current.clear();
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.chunks
    }
}
