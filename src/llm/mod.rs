//! LLM collaborator integration.
//!
//! Supports:
//! - **Anthropic**: Direct API access via rig-core
//! - **OpenAI**: Direct API access via rig-core
//!
//! The dialogue core never talks to a provider directly. It goes through
//! [`LlmGateway`], which owns the timeout and models a missing provider as
//! "unavailable" so every caller can fall back deterministically.

pub mod gateway;
pub mod json;
pub mod provider;
mod rig_adapter;
#[cfg(test)]
pub(crate) mod testing;

pub use gateway::{CompletionOptions, LlmGateway};
pub use json::extract_json_object;
pub use provider::*;
pub use rig_adapter::RigAdapter;

use std::sync::Arc;

use rig::client::CompletionClient;
use secrecy::ExposeSecret;

use crate::error::LlmError;

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Anthropic,
    OpenAi,
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
}

impl LlmConfig {
    /// Read provider settings from the environment.
    ///
    /// Returns `None` when no API key is set; the core then runs with the
    /// collaborator unavailable.
    pub fn from_env() -> Option<Self> {
        let backend = match std::env::var("HELPDESK_LLM_BACKEND")
            .unwrap_or_else(|_| "anthropic".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "openai" => LlmBackend::OpenAi,
            _ => LlmBackend::Anthropic,
        };

        let (key_var, default_model) = match backend {
            LlmBackend::Anthropic => ("ANTHROPIC_API_KEY", "claude-sonnet-4-20250514"),
            LlmBackend::OpenAi => ("OPENAI_API_KEY", "gpt-4o-mini"),
        };

        let api_key = std::env::var(key_var).ok().filter(|k| !k.trim().is_empty())?;
        let model =
            std::env::var("HELPDESK_LLM_MODEL").unwrap_or_else(|_| default_model.to_string());

        Some(Self {
            backend,
            api_key: secrecy::SecretString::from(api_key),
            model,
        })
    }
}

/// Build the rig-backed provider for `config.backend`.
///
/// Construction never touches the network; a bad key only surfaces on the
/// first completion, where the gateway reports it as a request failure.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::{anthropic, openai};

    let key = config.api_key.expose_secret();
    let provider: Arc<dyn LlmProvider> = match config.backend {
        LlmBackend::Anthropic => {
            let client: rig::client::Client<anthropic::client::AnthropicExt> =
                anthropic::Client::new(key).map_err(|e| client_error("anthropic", e))?;
            Arc::new(RigAdapter::new(
                client.completion_model(&config.model),
                &config.model,
            ))
        }
        LlmBackend::OpenAi => {
            let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
                openai::Client::new(key).map_err(|e| client_error("openai", e))?;
            Arc::new(RigAdapter::new(
                client.completion_model(&config.model),
                &config.model,
            ))
        }
    };

    tracing::info!(backend = ?config.backend, model = %config.model, "LLM collaborator ready");
    Ok(provider)
}

/// Gateway from [`LlmConfig::from_env`], or an unavailable one when no key is set.
pub fn gateway_from_env(timeout: std::time::Duration) -> Result<LlmGateway, LlmError> {
    match LlmConfig::from_env() {
        Some(config) => Ok(LlmGateway::new(create_provider(&config)?, timeout)),
        None => {
            tracing::info!("No LLM key configured, collaborator unavailable");
            Ok(LlmGateway::unavailable())
        }
    }
}

fn client_error(provider: &str, e: impl std::fmt::Display) -> LlmError {
    LlmError::RequestFailed {
        provider: provider.to_string(),
        reason: format!("client construction failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anthropic_provider_constructs_without_network() {
        let config = LlmConfig {
            backend: LlmBackend::Anthropic,
            api_key: secrecy::SecretString::from("test-key"),
            model: "claude-3-5-haiku-latest".to_string(),
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.model_name(), "claude-3-5-haiku-latest");
    }

    #[test]
    fn openai_provider_constructs_without_network() {
        let config = LlmConfig {
            backend: LlmBackend::OpenAi,
            api_key: secrecy::SecretString::from("sk-test"),
            model: "gpt-4o-mini".to_string(),
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.model_name(), "gpt-4o-mini");
    }

    #[test]
    fn client_errors_are_request_failures() {
        let err = client_error("anthropic", "bad key");
        assert_eq!(err.kind(), "request_failed");
        assert!(err.to_string().contains("client construction failed: bad key"));
    }
}
