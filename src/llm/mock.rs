//! Scripted [`TextGenerator`] for unit tests.

use async_trait::async_trait;
use std::sync::Mutex;

use super::{LlmError, TextGenerator};

/// Records every prompt and answers `"summary N"` for the N-th call.
///
/// Calls whose prompt contains the configured failure marker return an
/// [`LlmError::Api`] instead (and are still recorded).
#[derive(Default)]
pub(crate) struct ScriptedGenerator {
    prompts: Mutex<Vec<String>>,
    fail_on: Option<String>,
    fixed_reply: Option<String>,
}

impl ScriptedGenerator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing_on(marker: &str) -> Self {
        Self {
            fail_on: Some(marker.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn replying(reply: &str) -> Self {
        Self {
            fixed_reply: Some(reply.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str, _system: Option<&str>) -> Result<String, LlmError> {
        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(prompt.to_string());
        if let Some(marker) = &self.fail_on {
            if prompt.contains(marker.as_str()) {
                return Err(LlmError::Api {
                    status: 500,
                    body: "scripted failure".to_string(),
                });
            }
        }
        Ok(match &self.fixed_reply {
            Some(reply) => reply.clone(),
            None => format!("summary {}", prompts.len()),
        })
    }
}
