//! Outbound messaging: delivers generated replies to the end user.

pub mod evolution;

pub use evolution::EvolutionDispatcher;

use async_trait::async_trait;

/// Proof that the relay accepted a message.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryReceipt {
    /// HTTP status returned by the relay.
    pub status: u16,
    /// Relay response body, when it was JSON.
    pub body: Option<serde_json::Value>,
}

/// Sends reply text to a user.
///
/// Delivery is best-effort: implementations log failures and return `None`
/// instead of erroring, so a broken relay never fails the inbound webhook.
#[async_trait]
pub trait ReplyDispatcher: Send + Sync {
    async fn send(&self, user_id: &str, text: &str) -> Option<DeliveryReceipt>;
}
