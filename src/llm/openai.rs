use async_trait::async_trait;
use serde_json::{json, Value};
use std::ops::ControlFlow;
use tracing::debug;

use super::sse::SseDecoder;
use super::{ensure_success, for_each_line, FragmentSink, LlmError, TextGenerator};
use crate::config::LlmSettings;

/// OpenAI chat completions, or any server speaking the same protocol.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiGenerator {
    pub fn new(client: reqwest::Client, api_key: String, settings: &LlmSettings) -> Self {
        Self {
            client,
            api_key,
            model: settings.model.clone(),
            base_url: settings.base_url.clone(),
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
            "temperature": temperature,
            "max_tokens": max_tokens,
            "stream": stream,
        })
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!(model = %self.model, url = %url, "OpenAI request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;
        ensure_success(response).await
    }
}

fn parse_response(resp: &Value) -> Result<String, LlmError> {
    resp["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| LlmError::Parse("missing choices[0].message.content".into()))
}

/// Extract the text fragment from one streamed `data:` payload.
fn parse_stream_data(data: &str) -> Result<Option<String>, LlmError> {
    let chunk: Value = serde_json::from_str(data)
        .map_err(|e| LlmError::Parse(format!("invalid stream chunk: {}", e)))?;
    if let Some(message) = chunk["error"]["message"].as_str() {
        return Err(LlmError::Stream(message.to_string()));
    }
    Ok(chunk["choices"][0]["delta"]["content"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string))
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
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

        let mut decoder = SseDecoder::default();
        let mut text = String::new();
        for_each_line(response, |line| {
            let Some(event) = decoder.push_line(line) else {
                return Ok(ControlFlow::Continue(()));
            };
            if event.data == "[DONE]" {
                return Ok(ControlFlow::Break(()));
            }
            if let Some(fragment) = parse_stream_data(&event.data)? {
                sink(&fragment);
                text.push_str(&fragment);
            }
            Ok(ControlFlow::Continue(()))
        })
        .await?;

        Ok(text)
    }
}
