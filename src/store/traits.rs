//! `ConversationStore` trait: the async persistence seam for conversation
//! records.

use async_trait::async_trait;

use crate::conversation::ConversationRecord;
use crate::error::DatabaseError;

/// Backend-agnostic conversation state store.
///
/// Implementations must let different users proceed independently and must
/// write `state`, `step` and `scratch` together (last write wins, never a
/// partial update).
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Look up the record for `user_id`, creating it with defaults
    /// (`start` / `intro` / empty scratch) on first contact.
    ///
    /// Calling this twice for a new user creates exactly one record.
    async fn get_or_create(&self, user_id: &str) -> Result<ConversationRecord, DatabaseError>;

    /// Persist `state`, `step` and `scratch` for an existing record, keyed by
    /// `user_id`.
    async fn save(&self, record: &ConversationRecord) -> Result<(), DatabaseError>;

    /// Round-trip to the backend to confirm it is reachable.
    async fn ping(&self) -> Result<(), DatabaseError>;
}
