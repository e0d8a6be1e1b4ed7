use async_trait::async_trait;
use serde_json::{json, Value};
use std::ops::ControlFlow;
use tracing::debug;

use super::sse::SseDecoder;
use super::{ensure_success, for_each_line, FragmentSink, LlmError, TextGenerator};
use crate::config::LlmSettings;

/// Google Gemini `generateContent` API.
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
}

impl GeminiGenerator {
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

    /// Build the request body for the Gemini generateContent API.
    fn build_request_body(
        prompt: &str,
        system: Option<&str>,
        temperature: f32,
        max_tokens: u32,
    ) -> Value {
        let mut body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": temperature,
                "maxOutputTokens": max_tokens,
            },
        });

        if let Some(system) = system {
            body["system_instruction"] = json!({
                "parts": [{ "text": system }],
            });
        }

        body
    }

    async fn send(&self, method: &str, body: &Value) -> Result<reqwest::Response, LlmError> {
        let url = format!("{}/v1beta/models/{}:{}", self.base_url, self.model, method);
        debug!(model = %self.model, url = %url, "Gemini request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;
        ensure_success(response).await
    }
}

/// Concatenate the text parts of the first candidate.
fn candidate_text(resp: &Value) -> Option<String> {
    let parts = resp["candidates"][0]["content"]["parts"].as_array()?;
    Some(parts.iter().filter_map(|p| p["text"].as_str()).collect())
}

fn parse_response(resp: &Value) -> Result<String, LlmError> {
    candidate_text(resp)
        .ok_or_else(|| LlmError::Parse("missing candidates[0].content.parts".into()))
}

fn parse_stream_data(data: &str) -> Result<Option<String>, LlmError> {
    let chunk: Value = serde_json::from_str(data)
        .map_err(|e| LlmError::Parse(format!("invalid stream chunk: {}", e)))?;
    if let Some(message) = chunk["error"]["message"].as_str() {
        return Err(LlmError::Stream(message.to_string()));
    }
    Ok(candidate_text(&chunk).filter(|t| !t.is_empty()))
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, LlmError> {
        let body = Self::build_request_body(prompt, system, self.temperature, self.max_tokens);
        let response = self.send("generateContent", &body).await?;
        let resp: Value = response.json().await?;
        parse_response(&resp)
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        system: Option<&str>,
        sink: FragmentSink<'_>,
    ) -> Result<String, LlmError> {
        let body = Self::build_request_body(prompt, system, self.temperature, self.max_tokens);
        let response = self.send("streamGenerateContent?alt=sse", &body).await?;

        let mut decoder = SseDecoder::default();
        let mut text = String::new();
        for_each_line(response, |line| {
            if let Some(event) = decoder.push_line(line) {
                if let Some(fragment) = parse_stream_data(&event.data)? {
                    sink(&fragment);
                    text.push_str(&fragment);
                }
            }
            Ok(ControlFlow::Continue(()))
        })
        .await?;

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_structure() {
        let body =
            GeminiGenerator::build_request_body("Hello", Some("You are helpful."), 0.1, 4096);

        assert_eq!(
            body["system_instruction"]["parts"][0]["text"].as_str().unwrap(),
            "You are helpful.",
        );
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["text"], "Hello");

        let temp = body["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temp - 0.1).abs() < 1e-6, "temperature should be ~0.1, got {temp}");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 4096);
    }

    #[test]
    fn test_request_body_without_system() {
        let body = GeminiGenerator::build_request_body("Hello", None, 0.5, 2048);
        assert!(body.get("system_instruction").is_none());
    }

    #[test]
    fn test_parse_response() {
        let resp = json!({
            "candidates": [{ "content": { "parts": [{ "text": "a" }, { "text": "b" }] } }]
        });
        assert_eq!(parse_response(&resp).unwrap(), "ab");
        assert!(parse_response(&json!({ "candidates": [] })).is_err());
    }

    #[test]
    fn test_parse_stream_data() {
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"chunk"}]}}]}"#;
        assert_eq!(parse_stream_data(data).unwrap().as_deref(), Some("chunk"));
        assert_eq!(parse_stream_data(r#"{"usageMetadata":{}}"#).unwrap(), None);
    }
}
