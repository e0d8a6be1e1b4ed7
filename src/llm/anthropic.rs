use async_trait::async_trait;
use serde_json::{json, Value};
use std::ops::ControlFlow;
use tracing::{debug, trace};

use super::sse::SseDecoder;
use super::{ensure_success, for_each_line, FragmentSink, LlmError, TextGenerator};
use crate::config::LlmSettings;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API.
pub struct AnthropicGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
}

impl AnthropicGenerator {
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

    // The Messages API takes the system instruction as a top-level field.
    fn build_request_body(
        model: &str,
        prompt: &str,
        system: Option<&str>,
        temperature: f32,
        max_tokens: u32,
        stream: bool,
    ) -> Value {
        let mut body = json!({
            "model": model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": temperature,
            "max_tokens": max_tokens,
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }
        if stream {
            body["stream"] = json!(true);
        }
        body
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);
        debug!(model = %self.model, url = %url, "Anthropic request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;
        ensure_success(response).await
    }
}

fn parse_response(resp: &Value) -> Result<String, LlmError> {
    let blocks = resp["content"]
        .as_array()
        .ok_or_else(|| LlmError::Parse("missing content array".into()))?;

    let text: String = blocks
        .iter()
        .filter(|block| block["type"] == "text")
        .filter_map(|block| block["text"].as_str())
        .collect();

    if text.is_empty() && !blocks.is_empty() {
        return Err(LlmError::Parse("response contained no text blocks".into()));
    }
    Ok(text)
}

/// What one SSE event of the Messages stream means for the caller.
#[derive(Debug, PartialEq)]
enum StreamStep {
    Text(String),
    Skip,
    Done,
}

fn parse_stream_event(event_type: &str, data: &str) -> Result<StreamStep, LlmError> {
    match event_type {
        "content_block_delta" => {
            let parsed: Value = serde_json::from_str(data)
                .map_err(|e| LlmError::Parse(format!("invalid stream event: {}", e)))?;
            let delta = &parsed["delta"];
            if delta["type"] == "text_delta" {
                if let Some(text) = delta["text"].as_str() {
                    return Ok(StreamStep::Text(text.to_string()));
                }
            }
            Ok(StreamStep::Skip)
        }
        "message_stop" => Ok(StreamStep::Done),
        "error" => {
            let message = serde_json::from_str::<Value>(data)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(String::from))
                .unwrap_or_else(|| data.to_string());
            Err(LlmError::Stream(message))
        }
        other => {
            trace!(event_type = other, "ignoring SSE event");
            Ok(StreamStep::Skip)
        }
    }
}

#[async_trait]
impl TextGenerator for AnthropicGenerator {
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
            let event_type = event.event.as_deref().unwrap_or("");
            match parse_stream_event(event_type, &event.data)? {
                StreamStep::Text(fragment) => {
                    sink(&fragment);
                    text.push_str(&fragment);
                    Ok(ControlFlow::Continue(()))
                }
                StreamStep::Skip => Ok(ControlFlow::Continue(())),
                StreamStep::Done => Ok(ControlFlow::Break(())),
            }
        })
        .await?;

        Ok(text)
    }
}
