//! Ollama chat provider (`POST /api/chat`), local or Ollama Cloud.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider,
};
use crate::error::LlmError;

const PROVIDER: &str = "ollama";

/// Chat completions against an Ollama-compatible server.
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl OllamaProvider {
    /// `client` should carry a finite timeout; the provider adds none of its own.
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: SecretString,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

#[derive(Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
}

#[derive(Serialize)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponseBody {
    message: Option<ResponseMessage>,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let options = (request.temperature.is_some() || request.max_tokens.is_some()).then(|| {
            ChatOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            }
        });
        let body = ChatRequestBody {
            model: &self.model,
            messages: &request.messages,
            stream: false,
            options,
        };

        let resp = self
            .client
            .post(self.chat_url())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(std::time::Duration::from_secs);
            let detail = resp.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::AuthFailed {
                    provider: PROVIDER.into(),
                },
                StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited {
                    provider: PROVIDER.into(),
                    retry_after,
                },
                _ => LlmError::RequestFailed {
                    provider: PROVIDER.into(),
                    reason: format!("HTTP {status}: {}", truncate(&detail, 200)),
                },
            });
        }

        let parsed: ChatResponseBody = resp.json().await.map_err(|e| LlmError::InvalidResponse {
            provider: PROVIDER.into(),
            reason: e.to_string(),
        })?;

        let content = parsed
            .message
            .and_then(|m| m.content)
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: PROVIDER.into(),
                reason: "response has no message.content".into(),
            })?;

        let finish_reason = match parsed.done_reason.as_deref() {
            Some("stop") | None => FinishReason::Stop,
            Some("length") => FinishReason::Length,
            Some(_) => FinishReason::Unknown,
        };

        Ok(CompletionResponse {
            content,
            input_tokens: parsed.prompt_eval_count.unwrap_or(0),
            output_tokens: parsed.eval_count.unwrap_or(0),
            finish_reason,
        })
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
