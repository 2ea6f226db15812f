//! Scripted provider shared by unit tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::llm::provider::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Role};

/// One recorded call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub user: String,
    pub json_mode: bool,
}

/// Answers JSON-mode calls with `classification` and free-text calls with
/// `synthesis`. A `None` reply fails the call.
pub struct ScriptedLlm {
    classification: Option<String>,
    synthesis: Option<String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedLlm {
    pub fn new(classification: Option<&str>, synthesis: Option<&str>) -> Self {
        Self {
            classification: classification.map(str::to_string),
            synthesis: synthesis.map(str::to_string),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fails every call.
    pub fn failing() -> Self {
        Self::new(None, None)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let user = request
            .messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .collect::<Vec<_>>()
            .join("\n");
        self.calls.lock().unwrap().push(RecordedCall {
            system: request.system_text(),
            user,
            json_mode: request.json_mode,
        });

        let reply = if request.json_mode {
            &self.classification
        } else {
            &self.synthesis
        };
        match reply {
            Some(content) => Ok(CompletionResponse {
                content: content.clone(),
                input_tokens: 10,
                output_tokens: 10,
                finish_reason: FinishReason::Stop,
            }),
            None => Err(LlmError::RequestFailed {
                provider: "scripted".into(),
                reason: "scripted failure".into(),
            }),
        }
    }
}
