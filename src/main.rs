//! # mdai CLI
//!
//! Ask a large language model questions, summarize documents of any size,
//! and rewrite Markdown files or sections, from the terminal. Generated text
//! is always framed in `<!-- AI:... -->` marker blocks.
//!
//! ## Usage
//!
//! ```bash
//! mdai [--config PATH] [-v] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mdai ask <question>` | Ask a question; the answer streams to stdout |
//! | `mdai summarize <input>` | Summarize text, stdin, a file, a directory, or a glob |
//! | `mdai edit <file> <action>` | Rewrite a file or one section |
//! | `mdai config set/get/unset/list/path` | Manage `~/.mdai/config.toml` |
//! | `mdai completions <shell>` | Print shell completions |
//!
//! ## Examples
//!
//! ```bash
//! # Pick a provider and store its key
//! mdai config set provider anthropic
//! mdai config set anthropic_api_key sk-ant-...
//!
//! # Summarize every Markdown file under docs/ into one overview
//! mdai summarize 'docs/**/*.md' --combine --output SUMMARY.md
//!
//! # Tighten one section of a README, keeping a backup
//! mdai edit README.md shorten --section Installation
//! ```

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mdai::ask::run_ask;
use mdai::config::{default_config_path, ConfigStore, Settings};
use mdai::config_cmd;
use mdai::edit::{run_edit, EditAction};
use mdai::progress::ProgressMode;
use mdai::summarize_cmd::{run_summarize, SummarizeArgs};

/// mdai: LLM-assisted Markdown from the terminal.
#[derive(Parser)]
#[command(
    name = "mdai",
    about = "Ask, summarize, and edit Markdown with a large language model",
    version,
    long_about = "mdai sends prompts to OpenAI, Anthropic, Gemini, or a local Ollama server and \
    splices the responses into Markdown files inside <!-- AI:... --> marker blocks. Long input is \
    split into chunks, summarized part by part, and synthesized into one summary."
)]
struct Cli {
    /// Path to the configuration file (TOML).
    ///
    /// Defaults to `~/.mdai/config.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging on stderr (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Progress reporting on stderr.
    #[arg(long, global = true, value_enum, default_value_t = ProgressArg::Auto)]
    progress: ProgressArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProgressArg {
    /// Human-readable when stderr is a terminal, otherwise off.
    Auto,
    Off,
    Human,
    Json,
}

impl ProgressArg {
    fn mode(self) -> ProgressMode {
        match self {
            ProgressArg::Auto => ProgressMode::default_for_tty(),
            ProgressArg::Off => ProgressMode::Off,
            ProgressArg::Human => ProgressMode::Human,
            ProgressArg::Json => ProgressMode::Json,
        }
    }
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Ask a single question.
    ///
    /// Without `--output` the answer is streamed to stdout as it arrives,
    /// framed in an `<!-- AI:ask -->` block.
    Ask {
        /// The question. Multiple words are joined with spaces.
        #[arg(required = true)]
        question: Vec<String>,

        /// Include this file's content as context.
        #[arg(long)]
        context: Option<PathBuf>,

        /// Append the answer to this file instead of printing it.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the answer only once it is complete.
        #[arg(long)]
        no_stream: bool,
    },

    /// Summarize text, stdin (`-`), a file, a directory, or a glob.
    ///
    /// Input above the token budget is split on sentence boundaries,
    /// summarized part by part, and synthesized into one summary. With
    /// several files each file is summarized separately; `--combine` (or
    /// more files than `combine_threshold`) adds one cross-file overview.
    Summarize {
        /// Text, `-`, a path, or a glob pattern such as `'notes/**/*.md'`.
        input: String,

        /// Append the summary to this file instead of printing it.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Combine per-file summaries into one overview.
        #[arg(long)]
        combine: bool,

        /// Token budget override (default: `token_budget` from config).
        #[arg(long)]
        budget: Option<usize>,

        /// Show token estimates and planned calls without calling the provider.
        #[arg(long)]
        dry_run: bool,
    },

    /// Rewrite a file, or one section of it, with a fixed action.
    ///
    /// The original is copied to `<file>.bak` first unless `--no-backup` is
    /// given or `backup = false` is configured.
    Edit {
        /// The Markdown file to edit.
        file: PathBuf,

        /// What to do with the text.
        #[arg(value_enum)]
        action: EditAction,

        /// Only edit the section under this heading.
        #[arg(long)]
        section: Option<String>,

        /// Do not write a `.bak` backup.
        #[arg(long)]
        no_backup: bool,

        /// Print the edited document instead of writing it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Read and write configuration values.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Print a shell completion script.
    Completions {
        /// Target shell.
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Configuration subcommands.
#[derive(Subcommand)]
enum ConfigAction {
    /// Set a key (validated before it is saved).
    Set { key: String, value: String },
    /// Print a key's effective value.
    Get { key: String },
    /// Remove a key, restoring its default.
    Unset { key: String },
    /// List every known key with its value or default.
    List,
    /// Print the configuration file location.
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose when set.
    let default_level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_str()));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let progress = cli.progress.mode();
    let config = cli.config;

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "mdai", &mut std::io::stdout());
        }
        Commands::Config { action } => {
            let mut store = load_store(config)?;
            match action {
                ConfigAction::Set { key, value } => {
                    config_cmd::run_config_set(&mut store, &key, &value)?
                }
                ConfigAction::Get { key } => config_cmd::run_config_get(&store, &key)?,
                ConfigAction::Unset { key } => config_cmd::run_config_unset(&mut store, &key)?,
                ConfigAction::List => config_cmd::run_config_list(&store)?,
                ConfigAction::Path => config_cmd::run_config_path(&store)?,
            }
        }
        Commands::Ask {
            question,
            context,
            output,
            no_stream,
        } => {
            let settings = Settings::from_store(&load_store(config)?)?;
            run_ask(
                &settings,
                &question,
                context.as_deref(),
                output.as_deref(),
                no_stream,
            )
            .await?;
        }
        Commands::Summarize {
            input,
            output,
            combine,
            budget,
            dry_run,
        } => {
            let settings = Settings::from_store(&load_store(config)?)?;
            let args = SummarizeArgs {
                input,
                output,
                combine,
                budget,
                dry_run,
            };
            run_summarize(&settings, progress, &args).await?;
        }
        Commands::Edit {
            file,
            action,
            section,
            no_backup,
            dry_run,
        } => {
            let settings = Settings::from_store(&load_store(config)?)?;
            run_edit(
                &settings,
                &file,
                action,
                section.as_deref(),
                no_backup,
                dry_run,
            )
            .await?;
        }
    }

    Ok(())
}

/// Load the store from `--config`, or from `~/.mdai/config.toml`.
fn load_store(config: Option<PathBuf>) -> Result<ConfigStore> {
    let path = match config {
        Some(path) => path,
        None => default_config_path()?,
    };
    ConfigStore::load(&path)
}
