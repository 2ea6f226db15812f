//! The collaborator seam: a possibly-absent provider behind a bounded timeout.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};

/// Per-call options for a collaborator completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub json_mode: bool,
}

impl CompletionOptions {
    pub fn json(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
            json_mode: true,
        }
    }

    pub fn text(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
            json_mode: false,
        }
    }
}

/// Gateway to the LLM collaborator.
///
/// Cheap to clone. A gateway without a provider answers every call with
/// `LlmError::Unavailable`; an elapsed timeout surfaces as `LlmError::Timeout`.
#[derive(Clone)]
pub struct LlmGateway {
    provider: Option<Arc<dyn LlmProvider>>,
    timeout: Duration,
}

impl LlmGateway {
    pub fn new(provider: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self {
            provider: Some(provider),
            timeout,
        }
    }

    /// A gateway with no collaborator configured.
    pub fn unavailable() -> Self {
        Self {
            provider: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    /// Send a system + user prompt and return the completion text.
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: CompletionOptions,
    ) -> Result<String, LlmError> {
        let provider = self.provider.as_ref().ok_or(LlmError::Unavailable)?;

        let request = CompletionRequest::new(vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(user_prompt),
        ])
        .with_temperature(options.temperature)
        .with_max_tokens(options.max_tokens)
        .with_json_mode(options.json_mode);

        let response = match tokio::time::timeout(self.timeout, provider.complete(request)).await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    model = provider.model_name(),
                    timeout_secs = self.timeout.as_secs(),
                    "Collaborator call timed out"
                );
                return Err(LlmError::Timeout {
                    provider: provider.model_name().to_string(),
                    timeout: self.timeout,
                });
            }
        };

        debug!(
            model = provider.model_name(),
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Collaborator call complete"
        );

        Ok(response.content)
    }
}

impl std::fmt::Debug for LlmGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmGateway")
            .field(
                "provider",
                &self.provider.as_ref().map(|p| p.model_name().to_string()),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}
