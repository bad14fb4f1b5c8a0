//! Shared types for the message processing pipeline.

use serde::Serialize;

/// Canonical inbound message, built fresh per request by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Sender identifier (phone number).
    pub user_id: String,
    /// Message text, already trimmed and non-empty.
    pub text: String,
}

impl InboundMessage {
    pub fn new(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            text: text.into(),
        }
    }

    /// First 60 characters of the text, for logs.
    pub fn preview(&self) -> String {
        if self.text.chars().count() > 60 {
            let truncated: String = self.text.chars().take(60).collect();
            format!("{truncated}...")
        } else {
            self.text.clone()
        }
    }
}

/// A reply on its way to the messaging relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub user_id: String,
    pub text: String,
}

/// Webhook response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// Nothing to do; no state was read or written.
    Ignored { reason: String },
    /// The message was handled; `state` is the user's state afterwards.
    Processed { state: String },
}
