//! Webhook processor: turns one inbound webhook into a state update and a
//! reply.
//!
//! Flow:
//! 1. Normalize the body (may short-circuit as ignored)
//! 2. Remember the message in the cache (best-effort)
//! 3. Load or create the conversation record
//! 4. Run the transition table and persist the result
//! 5. Generate a reply (falls back on model failure)
//! 6. Dispatch the reply (best-effort)
//!
//! Only persistence failures fail the request. The state change is saved
//! before any reply is attempted, so it survives a broken model or relay.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::MessageCache;
use crate::channels::ReplyDispatcher;
use crate::conversation::TransitionEngine;
use crate::error::PipelineError;
use crate::pipeline::payload::{Normalized, WebhookPayload, normalize};
use crate::pipeline::reply::ReplyGenerator;
use crate::pipeline::types::{InboundMessage, OutboundReply, WebhookOutcome};
use crate::store::ConversationStore;

/// Per-request orchestration over the store, cache, model and relay.
pub struct WebhookProcessor {
    store: Arc<dyn ConversationStore>,
    cache: Arc<dyn MessageCache>,
    engine: TransitionEngine,
    replies: ReplyGenerator,
    dispatcher: Arc<dyn ReplyDispatcher>,
}

impl WebhookProcessor {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        cache: Arc<dyn MessageCache>,
        engine: TransitionEngine,
        replies: ReplyGenerator,
        dispatcher: Arc<dyn ReplyDispatcher>,
    ) -> Self {
        Self {
            store,
            cache,
            engine,
            replies,
            dispatcher,
        }
    }

    /// Process one webhook body end to end.
    pub async fn process(&self, payload: WebhookPayload) -> Result<WebhookOutcome, PipelineError> {
        let event = payload.event.clone().unwrap_or_else(|| "direct".to_string());
        let instance = payload.instance.clone().unwrap_or_default();

        let message = match normalize(payload) {
            Normalized::Message(message) => message,
            Normalized::Ignored(reason) => {
                debug!(
                    event = %event,
                    instance = %instance,
                    reason = reason.as_str(),
                    "Ignoring webhook"
                );
                return Ok(WebhookOutcome::Ignored {
                    reason: reason.as_str().to_string(),
                });
            }
        };

        info!(
            event = %event,
            instance = %instance,
            user_id = %message.user_id,
            text = %message.preview(),
            "Processing inbound message"
        );

        self.remember(&message).await;

        let record = self.store.get_or_create(&message.user_id).await?;

        let transition = self.engine.transition(&record, &message.text);
        let mut updated = record.clone();
        updated.state = transition.state;
        updated.step = transition.step;
        updated.scratch = message.text.clone();

        if updated.differs_from(&record) {
            self.store.save(&updated).await?;
        }
        info!(
            user_id = %message.user_id,
            from = %record.state,
            state = %updated.state,
            step = %updated.step,
            transitioned = transition.changed,
            "Conversation state resolved"
        );

        let outcome = self.replies.generate(&updated, &message.text).await;
        let reply = OutboundReply {
            user_id: message.user_id.clone(),
            text: outcome.text().to_string(),
        };
        if self.dispatcher.send(&reply.user_id, &reply.text).await.is_none() {
            debug!(user_id = %reply.user_id, "Reply not delivered");
        }

        Ok(WebhookOutcome::Processed {
            state: updated.state.as_str().to_string(),
        })
    }

    async fn remember(&self, message: &InboundMessage) {
        if let Err(e) = self
            .cache
            .remember_last_message(&message.user_id, &message.text)
            .await
        {
            warn!(user_id = %message.user_id, error = %e, "Failed to cache last message");
        }
    }
}
