//! # mdai
//!
//! LLM-assisted Markdown from the terminal.
//!
//! mdai asks questions, summarizes documents of any size, and rewrites
//! Markdown files or single sections. Every piece of generated text is framed
//! in `<!-- AI:... --> ... <!-- /AI -->` marker blocks so that other tooling
//! can find machine-written regions.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌─────────────┐   ┌──────────┐
//! │  inputs  │──▶│   chunk   │──▶│  summarize  │──▶│ markers  │──▶ stdout / file
//! │ text/fs/ │   │ sentence  │   │ part 1..N + │   │  splice  │
//! │   glob   │   │  packing  │   │  synthesis  │   └──────────┘
//! └──────────┘   └───────────┘   └──────┬──────┘
//!                                       │
//!                                       ▼
//!                                 ┌───────────┐
//!                                 │    llm    │ openai / anthropic /
//!                                 │ generator │ gemini / ollama
//!                                 └───────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Persisted key/value store and typed settings |
//! | [`models`] | Documents, partial summaries, batch results |
//! | [`chunk`] | Token estimate and sentence-boundary splitter |
//! | [`summarize`] | Hierarchical single-document summarization |
//! | [`batch`] | Multi-file summarization with per-file isolation |
//! | [`inputs`] | Text / stdin / file / directory / glob resolution |
//! | [`llm`] | Text-generation trait and HTTP providers |
//! | [`pace`] | Pauses between generation calls |
//! | [`progress`] | Progress reporting on stderr |
//! | [`markers`] | `<!-- AI:... -->` framing |
//! | [`splice`] | Appending blocks and replacing files with backups |
//! | [`section`] | Markdown heading scan and section lookup |
//! | [`ask`], [`summarize_cmd`], [`edit`], [`config_cmd`] | Command entry points |

pub mod ask;
pub mod batch;
pub mod chunk;
pub mod config;
pub mod config_cmd;
pub mod edit;
pub mod inputs;
pub mod llm;
pub mod markers;
pub mod models;
pub mod pace;
pub mod progress;
pub mod section;
pub mod splice;
pub mod summarize;
pub mod summarize_cmd;
