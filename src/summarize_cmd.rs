//! `mdai summarize`: resolve the input, run the pipeline, frame the output.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::batch::{summarize_files, BatchOptions};
use crate::chunk::split_text;
use crate::config::Settings;
use crate::inputs::{read_text_file, resolve_input, ResolvedInput};
use crate::llm::create_generator;
use crate::markers::wrap;
use crate::models::{BatchReport, Document, Origin};
use crate::pace::FixedDelay;
use crate::progress::{format_number, ProgressMode};
use crate::splice::append_block;
use crate::summarize::{Budget, Summarizer};

/// Flags of `mdai summarize`.
#[derive(Debug, Clone, Default)]
pub struct SummarizeArgs {
    pub input: String,
    pub output: Option<PathBuf>,
    pub combine: bool,
    pub budget: Option<usize>,
    pub dry_run: bool,
}

/// Entry point for `mdai summarize`.
pub async fn run_summarize(
    settings: &Settings,
    progress: ProgressMode,
    args: &SummarizeArgs,
) -> Result<()> {
    let tokens = args.budget.unwrap_or(settings.summary.token_budget);
    if tokens == 0 {
        bail!("--budget must be > 0");
    }
    let budget = Budget::from_tokens(tokens);

    let document = match resolve_input(&args.input)? {
        ResolvedInput::Text(doc) => doc,
        ResolvedInput::File(path) => load(path)?,
        ResolvedInput::Files(files) if files.is_empty() => {
            eprintln!("No matching files found for '{}'", args.input);
            return Ok(());
        }
        ResolvedInput::Files(mut files) if files.len() == 1 && !args.combine => {
            load(files.remove(0))?
        }
        ResolvedInput::Files(files) => {
            return summarize_many(settings, progress, args, budget, &files).await;
        }
    };

    if document.content.trim().is_empty() {
        bail!("Nothing to summarize: {} is empty", document.label());
    }

    if args.dry_run {
        print_plan(&document, budget);
        return Ok(());
    }

    let generator = create_generator(&settings.llm)?;
    let reporter = progress.reporter();
    let pacer = FixedDelay::from_millis(settings.summary.chunk_delay_ms);
    let summarizer = Summarizer::new(generator.as_ref(), &pacer, reporter.as_ref());

    info!(label = %document.label(), model = generator.model_name(), "summarizing");
    let summary = summarizer
        .summarize(&document.content, budget, &document.label())
        .await?;
    emit(args.output.as_deref(), &wrap("summary", &summary))
}

async fn summarize_many(
    settings: &Settings,
    progress: ProgressMode,
    args: &SummarizeArgs,
    budget: Budget,
    files: &[PathBuf],
) -> Result<()> {
    let options = BatchOptions {
        budget,
        max_file_bytes: settings.summary.max_file_bytes,
        combine: args.combine,
        combine_threshold: settings.summary.combine_threshold,
    };

    if args.dry_run {
        print_batch_plan(&args.input, files, &options);
        return Ok(());
    }

    let generator = create_generator(&settings.llm)?;
    let reporter = progress.reporter();
    let chunk_pacer = FixedDelay::from_millis(settings.summary.chunk_delay_ms);
    let file_pacer = FixedDelay::from_millis(settings.summary.file_delay_ms);
    let summarizer = Summarizer::new(generator.as_ref(), &chunk_pacer, reporter.as_ref());

    info!(files = files.len(), model = generator.model_name(), "summarizing files");
    let report =
        summarize_files(&summarizer, files, &options, &file_pacer, reporter.as_ref()).await?;
    eprintln!("summarize: {}", report);

    if report.summaries.is_empty() {
        if report.failures.is_empty() {
            eprintln!("No files were summarized");
            return Ok(());
        }
        bail!(
            "All {} files failed to summarize; first error: {}",
            report.failures.len(),
            report.failures[0].error
        );
    }

    emit(args.output.as_deref(), &render_report(&report))
}

fn load(path: PathBuf) -> Result<Document> {
    let content = read_text_file(&path)?;
    Ok(Document::new(content, Origin::File(path)))
}

/// Either the cross-file overview block, or one headed block per file.
fn render_report(report: &BatchReport) -> String {
    if let Some(combined) = &report.combined {
        return wrap("summary", combined);
    }
    report
        .summaries
        .iter()
        .map(|s| format!("## {}\n\n{}", s.path.display(), wrap("summary", &s.summary)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn emit(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            append_block(path, text)?;
            println!("summarize: appended to {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

/// Generation calls a document needs: `(tokens, chunks, calls)`.
fn plan(document: &Document, budget: Budget) -> (usize, usize, usize) {
    let tokens = document.estimated_tokens();
    if document.content.trim().is_empty() {
        (tokens, 0, 0)
    } else if tokens <= budget.tokens {
        (tokens, 1, 1)
    } else {
        let chunks = split_text(&document.content, budget.chunk_chars).len();
        (tokens, chunks, chunks + 1)
    }
}

fn print_plan(document: &Document, budget: Budget) {
    let (tokens, chunks, calls) = plan(document, budget);
    println!("summarize {} (dry-run)", document.label());
    println!("  estimated tokens: {}", format_number(tokens as u64));
    println!("  token budget: {}", format_number(budget.tokens as u64));
    println!("  chunks: {}", chunks);
    println!("  generation calls: {}", calls);
}

fn print_batch_plan(input: &str, files: &[PathBuf], options: &BatchOptions) {
    println!("summarize {} (dry-run)", input);
    println!("  files: {}", files.len());

    let mut calls = 0;
    let mut summarized = 0;
    for path in files {
        let bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        if bytes > options.max_file_bytes {
            println!("  {}: skipped ({} bytes)", path.display(), format_number(bytes));
            continue;
        }
        match read_text_file(path) {
            Ok(content) => {
                let document = Document::new(content, Origin::File(path.clone()));
                let (tokens, chunks, file_calls) = plan(&document, options.budget);
                if file_calls == 0 {
                    println!("  {}: skipped (blank)", path.display());
                    continue;
                }
                println!(
                    "  {}: {} tokens, {} chunk(s)",
                    path.display(),
                    format_number(tokens as u64),
                    chunks
                );
                calls += file_calls;
                summarized += 1;
            }
            Err(e) => println!("  {}: unreadable ({})", path.display(), e),
        }
    }

    let overview = summarized > 0 && (options.combine || files.len() > options.combine_threshold);
    if overview {
        calls += 1;
    }
    println!("  combined overview: {}", if overview { "yes" } else { "no" });
    println!("  generation calls: {}", calls);
}
