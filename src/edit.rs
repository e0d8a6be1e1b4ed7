//! `mdai edit`: rewrite a file or one section with a fixed action.
//!
//! The target text has existing marker lines stripped before it is sent to
//! the model, and the result is written back as an `edit:{action}` marker
//! block. A whole-file edit replaces the file content; a section edit keeps
//! the heading line and replaces only the body.

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use std::fmt;
use std::path::Path;
use tracing::info;

use crate::config::Settings;
use crate::inputs::{read_text_file, require_file};
use crate::llm::{create_generator, strip_code_fence, TextGenerator};
use crate::markers::{strip_markers, wrap};
use crate::section::{find_section, replace_section_body};
use crate::splice::replace_file;

const EDIT_SYSTEM: &str = "You are a precise editor. Return only the rewritten Markdown, with no \
code fence, no commentary, and no preamble. Preserve links, code blocks, and the author's meaning.";

/// The fixed menu of rewrite actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EditAction {
    /// Improve clarity and flow.
    Improve,
    /// Make it substantially shorter.
    Shorten,
    /// Add detail and explanation.
    Expand,
    /// Use simpler words and sentences.
    Simplify,
    /// Fix spelling, grammar, and punctuation only.
    FixGrammar,
    /// Use a formal, professional tone.
    Professional,
    /// Use a relaxed, conversational tone.
    Casual,
    /// Restructure as a bulleted list.
    Bullets,
}

impl EditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditAction::Improve => "improve",
            EditAction::Shorten => "shorten",
            EditAction::Expand => "expand",
            EditAction::Simplify => "simplify",
            EditAction::FixGrammar => "fix-grammar",
            EditAction::Professional => "professional",
            EditAction::Casual => "casual",
            EditAction::Bullets => "bullets",
        }
    }

    pub fn instruction(&self) -> &'static str {
        match self {
            EditAction::Improve => {
                "Improve the clarity, flow, and word choice of the following text while keeping its meaning and length roughly the same."
            }
            EditAction::Shorten => {
                "Shorten the following text to about half its length, keeping every essential point."
            }
            EditAction::Expand => {
                "Expand the following text with more detail, explanation, and examples where helpful."
            }
            EditAction::Simplify => {
                "Rewrite the following text in plain language with short sentences and common words."
            }
            EditAction::FixGrammar => {
                "Fix spelling, grammar, and punctuation in the following text. Do not change wording otherwise."
            }
            EditAction::Professional => {
                "Rewrite the following text in a formal, professional tone."
            }
            EditAction::Casual => "Rewrite the following text in a relaxed, conversational tone.",
            EditAction::Bullets => {
                "Restructure the following text as a concise Markdown bulleted list."
            }
        }
    }

    /// Marker kind for the rewritten block, e.g. `edit:shorten`.
    pub fn marker_kind(&self) -> String {
        format!("edit:{}", self.as_str())
    }
}

impl fmt::Display for EditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rewrite `content` (or its `section`) and return the new document.
pub async fn edit_document(
    generator: &dyn TextGenerator,
    content: &str,
    action: EditAction,
    section: Option<&str>,
) -> Result<String> {
    let located = section.map(|name| find_section(content, name)).transpose()?;
    let target = match &located {
        Some(section) => strip_markers(section.body(content)),
        None => strip_markers(content),
    };
    if target.trim().is_empty() {
        match section {
            Some(name) => bail!("Nothing to edit: section '{}' is empty", name),
            None => bail!("Nothing to edit: the file is empty"),
        }
    }

    let prompt = format!("{}\n\n{}", action.instruction(), target.trim());
    let rewritten = generator.generate(&prompt, Some(EDIT_SYSTEM)).await?;
    let block = wrap(&action.marker_kind(), strip_code_fence(&rewritten));

    Ok(match &located {
        Some(section) => replace_section_body(content, section, &block),
        None => format!("{}\n", block),
    })
}

/// Entry point for `mdai edit`.
pub async fn run_edit(
    settings: &Settings,
    file: &Path,
    action: EditAction,
    section: Option<&str>,
    no_backup: bool,
    dry_run: bool,
) -> Result<()> {
    require_file(file)?;
    let content = read_text_file(file)?;
    let generator = create_generator(&settings.llm)?;

    info!(path = %file.display(), action = %action, section, "editing");
    let edited = edit_document(generator.as_ref(), &content, action, section)
        .await
        .with_context(|| format!("Failed to edit {}", file.display()))?;

    if dry_run {
        print!("{}", edited);
        return Ok(());
    }

    let backup = replace_file(file, &edited, settings.backup && !no_backup)?;
    println!("edit {} ({})", file.display(), action);
    if let Some(section) = section {
        println!("  section: {}", section);
    }
    match backup {
        Some(path) => println!("  backup: {}", path.display()),
        None => println!("  backup: none"),
    }
    println!("ok");
    Ok(())
}
