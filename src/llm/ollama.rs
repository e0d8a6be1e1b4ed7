use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::ops::ControlFlow;
use tracing::debug;

use super::{ensure_success, for_each_line, FragmentSink, LlmError, TextGenerator};
use crate::config::LlmSettings;

/// Local Ollama server via `/api/chat`. Streams newline-delimited JSON.
pub struct OllamaGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OllamaGenerator {
    pub fn new(client: reqwest::Client, settings: &LlmSettings) -> Self {
        Self {
            client,
            url: settings.base_url.clone(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_output_tokens,
        }
    }

    fn build_request_body(
        model: &str,
        prompt: &str,
        system: Option<&str>,
        temperature: f32,
        max_tokens: u32,
        stream: bool,
    ) -> Value {
        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": prompt }));

        json!({
            "model": model,
            "messages": messages,
            "stream": stream,
            "options": {
                "temperature": temperature,
                "num_predict": max_tokens,
            },
        })
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response, LlmError> {
        let url = format!("{}/api/chat", self.url);
        debug!(model = %self.model, url = %url, "Ollama request");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;
        ensure_success(response).await
    }
}

fn parse_response(resp: &Value) -> Result<String, LlmError> {
    resp["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| LlmError::Parse("missing message.content".into()))
}

/// One line of the `/api/chat` NDJSON stream.
#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChatMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

/// Parse one NDJSON line. Returns the fragment (if any) and whether the
/// stream is complete.
fn parse_stream_line(line: &str) -> Result<(Option<String>, bool), LlmError> {
    let chunk: ChatChunk = serde_json::from_str(line)
        .map_err(|e| LlmError::Parse(format!("invalid stream line: {}", e)))?;
    if let Some(message) = chunk.error {
        return Err(LlmError::Stream(message));
    }
    let fragment = chunk
        .message
        .map(|m| m.content)
        .filter(|content| !content.is_empty());
    Ok((fragment, chunk.done))
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, LlmError> {
        let body = Self::build_request_body(
            &self.model,
            prompt,
            system,
            self.temperature,
            self.max_tokens,
            false,
        );
        let response = self.send(&body).await?;
        let resp: Value = response.json().await?;
        parse_response(&resp)
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        system: Option<&str>,
        sink: FragmentSink<'_>,
    ) -> Result<String, LlmError> {
        let body = Self::build_request_body(
            &self.model,
            prompt,
            system,
            self.temperature,
            self.max_tokens,
            true,
        );
        let response = self.send(&body).await?;

        let mut text = String::new();
        for_each_line(response, |line| {
            if line.trim().is_empty() {
                return Ok(ControlFlow::Continue(()));
            }
            let (fragment, done) = parse_stream_line(line)?;
            if let Some(fragment) = fragment {
                sink(&fragment);
                text.push_str(&fragment);
            }
            Ok(if done {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            })
        })
        .await?;

        Ok(text)
    }
}
