//! Text-generation provider abstraction.
//!
//! Defines the [`TextGenerator`] trait consumed by every command and the
//! HTTP-backed implementations:
//! - **[`openai::OpenAiGenerator`]**: OpenAI chat completions (and any
//!   OpenAI-compatible server via `base_url`).
//! - **[`anthropic::AnthropicGenerator`]**: Anthropic Messages API.
//! - **[`gemini::GeminiGenerator`]**: Google Gemini `generateContent`.
//! - **[`ollama::OllamaGenerator`]**: local Ollama `/api/chat`.
//!
//! # Provider Selection
//!
//! Use [`create_generator`] to instantiate the configured provider:
//!
//! ```rust,no_run
//! # use mdai::config::{ConfigStore, Settings};
//! # use mdai::llm::create_generator;
//! let mut store = ConfigStore::in_memory();
//! store.set("provider", "ollama").unwrap();
//! let settings = Settings::from_store(&store).unwrap();
//! let generator = create_generator(&settings.llm).unwrap();
//! assert_eq!(generator.model_name(), "llama3.1");
//! ```
//!
//! # Failure Policy
//!
//! Requests are never retried. A non-2xx response becomes
//! [`LlmError::Api`] with the status and body; transport failures become
//! [`LlmError::Http`]. Callers decide whether an error aborts the whole run.

use async_trait::async_trait;
use futures_util::StreamExt;
use std::ops::ControlFlow;
use std::time::Duration;

use crate::config::{LlmSettings, Provider};

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod sse;

#[cfg(test)]
pub(crate) mod mock;

/// Errors from the text-generation layer.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
    #[error("provider reported an error mid-stream: {0}")]
    Stream(String),
    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

/// Receives text fragments in arrival order while a response streams.
pub type FragmentSink<'a> = &'a mut (dyn FnMut(&str) + Send);

/// Produces text from a prompt and an optional system instruction.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;

    /// Generate a complete response.
    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, LlmError>;

    /// Generate a response, passing each fragment to `sink` as it arrives.
    ///
    /// Returns the concatenation of all fragments. The default emits the
    /// complete response as a single fragment.
    async fn generate_stream(
        &self,
        prompt: &str,
        system: Option<&str>,
        sink: FragmentSink<'_>,
    ) -> Result<String, LlmError> {
        let text = self.generate(prompt, system).await?;
        sink(&text);
        Ok(text)
    }
}

/// Create the [`TextGenerator`] for the configured provider.
///
/// # Errors
///
/// Returns [`LlmError::NotConfigured`] when the provider needs an API key
/// and none was found in the config store or the environment.
pub fn create_generator(settings: &LlmSettings) -> Result<Box<dyn TextGenerator>, LlmError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()?;

    match settings.provider {
        Provider::OpenAi => Ok(Box::new(openai::OpenAiGenerator::new(
            client,
            require_api_key(settings)?,
            settings,
        ))),
        Provider::Anthropic => Ok(Box::new(anthropic::AnthropicGenerator::new(
            client,
            require_api_key(settings)?,
            settings,
        ))),
        Provider::Gemini => Ok(Box::new(gemini::GeminiGenerator::new(
            client,
            require_api_key(settings)?,
            settings,
        ))),
        Provider::Ollama => Ok(Box::new(ollama::OllamaGenerator::new(client, settings))),
    }
}

fn require_api_key(settings: &LlmSettings) -> Result<String, LlmError> {
    if let Some(key) = &settings.api_key {
        return Ok(key.clone());
    }
    let hint = match settings.provider.api_key_source() {
        Some((config_key, env_var)) => format!(
            "no API key for {}; run `mdai config set {} <key>` or set {}",
            settings.provider, config_key, env_var
        ),
        None => format!("no API key for {}", settings.provider),
    };
    Err(LlmError::NotConfigured(hint))
}

/// Turn a non-2xx response into [`LlmError::Api`].
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(LlmError::Api {
        status: status.as_u16(),
        body,
    })
}

/// Feed a streaming response body to `on_line` one line at a time.
///
/// Lines are split on `\n` with any trailing `\r` removed. After the body
/// ends, a trailing partial line and then one empty line are delivered, so
/// an SSE decoder always sees its final dispatch boundary.
pub(crate) async fn for_each_line<F>(
    response: reqwest::Response,
    mut on_line: F,
) -> Result<(), LlmError>
where
    F: FnMut(&str) -> Result<ControlFlow<()>, LlmError> + Send,
{
    let mut lines = sse::LineBuffer::default();
    let mut body = Box::pin(response.bytes_stream());

    while let Some(bytes) = body.next().await {
        let bytes = bytes?;
        for line in lines.push(&bytes) {
            if on_line(&line)?.is_break() {
                return Ok(());
            }
        }
    }

    if let Some(rest) = lines.finish() {
        if on_line(&rest)?.is_break() {
            return Ok(());
        }
    }
    on_line("")?;
    Ok(())
}

/// Remove a single code fence wrapping the whole response.
///
/// Models sometimes answer with ```` ```markdown … ``` ```` even when asked
/// for plain Markdown. Fences inside the text are left alone.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // The opening fence line may carry a language tag.
    match body.split_once('\n') {
        Some((tag, inner)) if !tag.contains('`') && !tag.trim().contains(' ') => {
            if inner.contains("\n```") {
                trimmed
            } else {
                inner.trim()
            }
        }
        _ => trimmed,
    }
}
