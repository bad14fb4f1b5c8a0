//! LLM integration for WhatsApp Assist.
//!
//! Supports:
//! - **Ollama**: local servers or Ollama Cloud via `POST /api/chat`
//!
//! Providers sit behind the `LlmProvider` trait so the reply generator can be
//! exercised against stubs.

pub mod ollama;
pub mod provider;

pub use ollama::OllamaProvider;
pub use provider::*;

use std::sync::Arc;

use crate::config::LlmConfig;

/// Create the LLM provider described by `config`.
///
/// `client` is shared with other outbound collaborators and carries the
/// request timeout.
pub fn create_provider(config: &LlmConfig, client: reqwest::Client) -> Arc<dyn LlmProvider> {
    tracing::info!(base_url = %config.base_url, "Using Ollama (model: {})", config.model);
    Arc::new(OllamaProvider::new(
        client,
        config.base_url.clone(),
        config.api_key.clone(),
        config.model.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_provider_uses_configured_model() {
        let config = LlmConfig {
            base_url: "https://ollama.com".to_string(),
            api_key: secrecy::SecretString::from("test-key"),
            model: "gpt-oss:120b".to_string(),
        };
        let provider = create_provider(&config, reqwest::Client::new());
        assert_eq!(provider.model_name(), "gpt-oss:120b");
    }
}
