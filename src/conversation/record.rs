//! The persisted per-user conversation record.

use serde::{Deserialize, Serialize};

use super::state::{ConversationState, ConversationStep};

/// Durable conversation state for one user, keyed by `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// Surrogate key assigned by the store.
    pub id: i64,
    /// External identifier (phone number). Unique.
    pub user_id: String,
    pub state: ConversationState,
    pub step: ConversationStep,
    /// Free-form buffer for partially collected details. Holds the latest
    /// raw message until multi-turn collection exists.
    pub scratch: String,
}

impl ConversationRecord {
    /// A record as it looks on first contact, before the store assigns an id.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            id: 0,
            user_id: user_id.into(),
            state: ConversationState::Start,
            step: ConversationStep::Intro,
            scratch: String::new(),
        }
    }

    /// Whether the mutable fields differ from `other`.
    pub fn differs_from(&self, other: &ConversationRecord) -> bool {
        self.state != other.state || self.step != other.step || self.scratch != other.scratch
    }
}
