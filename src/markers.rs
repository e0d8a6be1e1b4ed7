//! `<!-- AI:... -->` marker blocks.
//!
//! Every piece of generated text mdai writes is framed as
//!
//! ```text
//! <!-- AI:summary -->
//! generated text
//! <!-- /AI -->
//! ```
//!
//! Other tooling locates machine-written regions by these exact lines, so
//! the format must not change.

use regex::Regex;
use std::sync::LazyLock;

/// Closing marker line.
pub const CLOSE: &str = "<!-- /AI -->";

static MARKER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*<!--\s*/?AI(:[^>]*)?\s*-->\s*$").expect("marker regex"));

/// Opening marker line for `kind`.
pub fn open(kind: &str) -> String {
    format!("<!-- AI:{} -->", kind)
}

/// Frame `text` (trimmed) in a marker block of the given kind.
pub fn wrap(kind: &str, text: &str) -> String {
    format!("{}\n{}\n{}", open(kind), text.trim(), CLOSE)
}

/// Remove marker lines, keeping the text between them.
///
/// Used before feeding previously generated content back to the model so
/// that blocks never nest.
pub fn strip_markers(text: &str) -> String {
    let kept: Vec<&str> = text
        .lines()
        .filter(|line| !MARKER_LINE.is_match(line))
        .collect();
    let mut out = kept.join("\n");
    if text.ends_with('\n') && !out.is_empty() {
        out.push('\n');
    }
    out
}
