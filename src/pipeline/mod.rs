//! Inbound message pipeline.
//!
//! Every webhook body flows through:
//! 1. `normalize()`: two body shapes reduced to `(user_id, text)`
//! 2. `TransitionEngine::transition()`: pure state machine step
//! 3. `ReplyGenerator::generate()`: state-aware model reply with fallback
//! 4. `ReplyDispatcher::send()`: best-effort delivery
//!
//! `WebhookProcessor` wires the steps together around the store and cache.

pub mod payload;
pub mod processor;
pub mod reply;
pub mod types;

pub use payload::{InboundPayload, Normalized, WebhookPayload, normalize};
pub use processor::WebhookProcessor;
pub use reply::{FALLBACK_REPLY, ReplyGenerator, ReplyOutcome};
pub use types::{InboundMessage, OutboundReply, WebhookOutcome};
