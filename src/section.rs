//! Markdown section lookup by heading.
//!
//! A linear scan over ATX headings (`#` to `######`). Lines inside fenced
//! code blocks are never treated as headings. A section's body runs from
//! the line after its heading to the next heading of the same or higher
//! level, or to the end of the document.

use anyhow::{bail, Result};

/// One ATX heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: usize,
    pub title: String,
    /// Byte offset of the heading line.
    pub start: usize,
    /// Byte offset just past the heading line (including its newline).
    pub end: usize,
}

/// A located section: its heading and the byte range of its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: Heading,
    pub body_start: usize,
    pub body_end: usize,
}

impl Section {
    pub fn body<'t>(&self, text: &'t str) -> &'t str {
        &text[self.body_start..self.body_end]
    }
}

/// Parse an ATX heading line into `(level, title)`.
fn parse_heading(line: &str) -> Option<(usize, String)> {
    let line = line.trim_end_matches(['\r', '\n']);
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let level = rest.len() - rest.trim_start_matches('#').len();
    if level == 0 || level > 6 {
        return None;
    }
    let after = &rest[level..];
    if !after.is_empty() && !after.starts_with([' ', '\t']) {
        return None;
    }
    // Optional closing sequence: "## Title ##"
    let mut title = after.trim();
    let stripped = title.trim_end_matches('#');
    if stripped.is_empty() || stripped.ends_with([' ', '\t']) {
        title = stripped.trim_end();
    }
    Some((level, title.to_string()))
}

fn fence_marker(line: &str) -> Option<&'static str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with("```") {
        Some("```")
    } else if trimmed.starts_with("~~~") {
        Some("~~~")
    } else {
        None
    }
}

/// All headings outside fenced code blocks, in document order.
pub fn headings(text: &str) -> Vec<Heading> {
    let mut found = Vec::new();
    let mut open_fence: Option<&str> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let start = offset;
        offset += line.len();

        if let Some(fence) = open_fence {
            if line.trim_start().starts_with(fence) {
                open_fence = None;
            }
            continue;
        }
        if let Some(fence) = fence_marker(line) {
            open_fence = Some(fence);
            continue;
        }
        if let Some((level, title)) = parse_heading(line) {
            found.push(Heading {
                level,
                title,
                start,
                end: offset,
            });
        }
    }

    found
}

/// Find the section named `name`.
///
/// Matching ignores case and leading `#`s in `name`. An exact title match
/// wins; otherwise the first heading whose title contains `name` is used.
pub fn find_section(text: &str, name: &str) -> Result<Section> {
    let all = headings(text);
    let wanted = name.trim().trim_start_matches('#').trim().to_lowercase();
    if wanted.is_empty() {
        bail!("Section name is empty");
    }

    let index = all
        .iter()
        .position(|h| h.title.to_lowercase() == wanted)
        .or_else(|| {
            all.iter()
                .position(|h| h.title.to_lowercase().contains(&wanted))
        });

    let Some(index) = index else {
        if all.is_empty() {
            bail!("Section '{}' not found: the document has no headings", name);
        }
        let available: Vec<String> = all
            .iter()
            .map(|h| format!("{} {}", "#".repeat(h.level), h.title))
            .collect();
        bail!(
            "Section '{}' not found. Available headings:\n  {}",
            name,
            available.join("\n  ")
        );
    };

    let heading = all[index].clone();
    let body_end = all[index + 1..]
        .iter()
        .find(|h| h.level <= heading.level)
        .map(|h| h.start)
        .unwrap_or(text.len());

    Ok(Section {
        body_start: heading.end,
        body_end,
        heading,
    })
}

/// Replace the body of `section` with `new_body`, keeping the heading.
///
/// The new body is surrounded by one blank line on each side; a following
/// heading stays on its own line.
pub fn replace_section_body(text: &str, section: &Section, new_body: &str) -> String {
    let mut out = String::with_capacity(text.len() + new_body.len());
    out.push_str(&text[..section.body_start]);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out.push('\n');
    out.push_str(new_body.trim());
    out.push('\n');

    let rest = &text[section.body_end..];
    if !rest.is_empty() {
        out.push('\n');
        out.push_str(rest);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "# Title\n\nIntro.\n\n## Setup\n\nInstall it.\n\n### Details\n\nMore.\n\n## Usage\n\n```sh\n# not a heading\n```\n\nRun it.\n";

    #[test]
    fn test_headings_skip_code_fences() {
        let titles: Vec<(usize, String)> =
            headings(DOC).into_iter().map(|h| (h.level, h.title)).collect();
        assert_eq!(
            titles,
            vec![
                (1, "Title".to_string()),
                (2, "Setup".to_string()),
                (3, "Details".to_string()),
                (2, "Usage".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_heading_rules() {
        assert_eq!(parse_heading("## Setup ##"), Some((2, "Setup".to_string())));
        assert_eq!(parse_heading("#hashtag"), None);
        assert_eq!(parse_heading("####### too deep"), None);
        assert_eq!(parse_heading("    # indented code"), None);
        assert_eq!(parse_heading("# C#"), Some((1, "C#".to_string())));
    }

    #[test]
    fn test_section_includes_subsections() {
        let section = find_section(DOC, "setup").unwrap();
        assert_eq!(section.heading.title, "Setup");
        assert_eq!(section.body(DOC), "\nInstall it.\n\n### Details\n\nMore.\n\n");
    }

    #[test]
    fn test_section_runs_to_end_of_file() {
        let section = find_section(DOC, "## Usage").unwrap();
        assert!(section.body(DOC).ends_with("Run it.\n"));
        assert_eq!(section.body_end, DOC.len());
    }

    #[test]
    fn test_exact_match_beats_contains() {
        let doc = "# Setup notes\n\na\n\n# Setup\n\nb\n";
        let section = find_section(doc, "SETUP").unwrap();
        assert_eq!(section.body(doc).trim(), "b");

        let section = find_section(doc, "notes").unwrap();
        assert_eq!(section.body(doc).trim(), "a");
    }

    #[test]
    fn test_missing_section_lists_headings() {
        let err = find_section(DOC, "Deploy").unwrap_err().to_string();
        assert!(err.contains("not found"));
        assert!(err.contains("## Setup"));
        assert!(err.contains("### Details"));
    }

    #[test]
    fn test_replace_section_body() {
        let section = find_section(DOC, "Details").unwrap();
        let out = replace_section_body(DOC, &section, "Rewritten.");
        assert!(out.contains("### Details\n\nRewritten.\n\n## Usage\n"));
        assert!(out.starts_with("# Title\n\nIntro.\n\n## Setup\n\nInstall it.\n\n"));
    }

    #[test]
    fn test_replace_last_section() {
        let doc = "# A\n\nold";
        let section = find_section(doc, "A").unwrap();
        assert_eq!(replace_section_body(doc, &section, "new"), "# A\n\nnew\n");
    }
}
