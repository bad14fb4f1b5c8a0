//! Evolution API relay: sends WhatsApp text messages through a relay
//! instance (`POST /message/sendText/<instance>`).

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::{DeliveryReceipt, ReplyDispatcher};
use crate::config::RelayConfig;
use crate::error::ChannelError;

const CHANNEL_NAME: &str = "whatsapp";

/// HTTP client for an Evolution API instance.
pub struct EvolutionDispatcher {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    instance: String,
}

impl EvolutionDispatcher {
    pub fn new(client: reqwest::Client, config: &RelayConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            instance: config.instance.clone(),
        }
    }

    fn send_text_url(&self) -> String {
        format!("{}/message/sendText/{}", self.base_url, self.instance)
    }

    /// Send one text message, surfacing every failure as an error.
    pub async fn send_text(&self, number: &str, text: &str) -> Result<DeliveryReceipt, ChannelError> {
        let body = serde_json::json!({
            "number": number,
            "text": text,
        });

        let resp = self
            .client
            .post(self.send_text_url())
            .header("apikey", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: CHANNEL_NAME.into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        let raw = resp
            .text()
            .await
            .map_err(|e| ChannelError::Http(format!("Failed to read relay response: {e}")))?;

        if !status.is_success() {
            return Err(ChannelError::SendFailed {
                name: CHANNEL_NAME.into(),
                reason: format!(
                    "sendText returned {status}: {}",
                    raw.chars().take(200).collect::<String>()
                ),
            });
        }

        Ok(DeliveryReceipt {
            status: status.as_u16(),
            body: serde_json::from_str(&raw).ok(),
        })
    }
}

#[async_trait]
impl ReplyDispatcher for EvolutionDispatcher {
    async fn send(&self, user_id: &str, text: &str) -> Option<DeliveryReceipt> {
        match self.send_text(user_id, text).await {
            Ok(receipt) => {
                tracing::info!(user_id = %user_id, status = receipt.status, "Reply delivered");
                Some(receipt)
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Reply delivery failed");
                None
            }
        }
    }
}
