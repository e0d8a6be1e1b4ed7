//! `mdai ask`: one question, one answer.

use anyhow::{bail, Result};
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::config::Settings;
use crate::inputs::read_text_file;
use crate::llm::{create_generator, strip_code_fence, TextGenerator};
use crate::markers::{self, strip_markers, wrap};
use crate::splice::append_block;

const ASK_SYSTEM: &str = "You are a helpful assistant answering questions from a terminal. Answer \
in plain Markdown without wrapping the answer in a code fence.";

/// Build the prompt, prefixing the content of a context file when given.
pub fn build_prompt(question: &str, context: Option<(&Path, &str)>) -> String {
    match context {
        Some((path, content)) => format!(
            "Use the following content of {} as context.\n\n{}\n\nQuestion: {}",
            path.display(),
            strip_markers(content).trim(),
            question.trim()
        ),
        None => question.trim().to_string(),
    }
}

/// Stream the answer to stdout inside an `ask` marker block.
pub async fn stream_answer(
    generator: &dyn TextGenerator,
    prompt: &str,
    out: &mut (dyn Write + Send),
) -> Result<String> {
    writeln!(out, "{}", markers::open("ask"))?;
    out.flush()?;

    let mut write_error = None;
    let mut sink = |fragment: &str| {
        if write_error.is_none() {
            if let Err(e) = out.write_all(fragment.as_bytes()).and_then(|_| out.flush()) {
                write_error = Some(e);
            }
        }
    };
    let answer = generator
        .generate_stream(prompt, Some(ASK_SYSTEM), &mut sink)
        .await?;
    if let Some(e) = write_error {
        return Err(e.into());
    }

    if !answer.ends_with('\n') {
        writeln!(out)?;
    }
    writeln!(out, "{}", markers::CLOSE)?;
    out.flush()?;
    Ok(answer)
}

/// Entry point for `mdai ask`.
pub async fn run_ask(
    settings: &Settings,
    question: &[String],
    context: Option<&Path>,
    output: Option<&Path>,
    no_stream: bool,
) -> Result<()> {
    let question = question.join(" ");
    if question.trim().is_empty() {
        bail!("The question is empty");
    }

    let context_content = context.map(read_text_file).transpose()?;
    let prompt = build_prompt(&question, context.zip(context_content.as_deref()));
    let generator = create_generator(&settings.llm)?;
    info!(model = generator.model_name(), "asking");

    match output {
        Some(path) => {
            let answer = generator.generate(&prompt, Some(ASK_SYSTEM)).await?;
            append_block(path, &wrap("ask", strip_code_fence(&answer)))?;
            println!("ask: appended answer to {}", path.display());
        }
        None if no_stream => {
            let answer = generator.generate(&prompt, Some(ASK_SYSTEM)).await?;
            println!("{}", wrap("ask", strip_code_fence(&answer)));
        }
        None => {
            stream_answer(generator.as_ref(), &prompt, &mut std::io::stdout()).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::ScriptedGenerator;

    #[test]
    fn test_build_prompt_without_context() {
        assert_eq!(build_prompt("  What is Rust? ", None), "What is Rust?");
    }

    #[test]
    fn test_build_prompt_with_context() {
        let prompt = build_prompt(
            "Who wrote it?",
            Some((Path::new("notes.md"), "<!-- AI:summary -->\nBy Ann.\n<!-- /AI -->\n")),
        );
        assert!(prompt.contains("notes.md"));
        assert!(prompt.contains("By Ann."));
        assert!(!prompt.contains("<!--"));
        assert!(prompt.ends_with("Question: Who wrote it?"));
    }

    #[tokio::test]
    async fn test_stream_answer_framing() {
        let generator = ScriptedGenerator::replying("Forty-two.");
        let mut out: Vec<u8> = Vec::new();
        let answer = stream_answer(&generator, "q", &mut out).await.unwrap();

        assert_eq!(answer, "Forty-two.");
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "<!-- AI:ask -->\nForty-two.\n<!-- /AI -->\n"
        );
    }
}
