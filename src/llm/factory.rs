//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use crate::config::LlmConfig;
use crate::error::{GateError, Result};
use crate::llm::{LlmClient, LlmProvider, MockLlmClient, OpenAiClient, OpenAiConfig};

/// Creates an LLM client from the `[llm]` configuration.
///
/// If `api_key` is provided, it takes precedence over environment variables.
/// Hosted providers resolve the key in order:
/// 1. Provided `api_key` parameter
/// 2. Environment variable (`GROQ_API_KEY` or `OPENAI_API_KEY`)
///
/// An empty `model` or missing `base_url` falls back to the provider default.
pub fn create_client(config: &LlmConfig, api_key: Option<String>) -> Result<Box<dyn LlmClient>> {
    let provider: LlmProvider = config.provider.parse().map_err(GateError::config)?;

    if provider == LlmProvider::Mock {
        return Ok(Box::new(MockLlmClient::new()));
    }

    let model = if config.model.is_empty() {
        provider.default_model().to_string()
    } else {
        config.model.clone()
    };
    let base_url = config
        .base_url
        .clone()
        .unwrap_or_else(|| provider.default_base_url().to_string());

    let client_config = match provider.api_key_var() {
        Some(var) => {
            let key = api_key
                .or_else(|| std::env::var(var).ok())
                .filter(|k| !k.is_empty())
                .ok_or_else(|| {
                    GateError::llm(format!(
                        "No API key configured for {provider}. Set {var} or add it to .env."
                    ))
                })?;
            OpenAiConfig::new(key, model)
        }
        None => OpenAiConfig::new("", model).without_api_key(),
    };

    let client = OpenAiClient::new(
        client_config
            .with_base_url(base_url)
            .with_temperature(config.temperature),
    )?;
    Ok(Box::new(client))
}
