//! Conversation state machine: per-user state, step, and the transition
//! table that moves between them.

pub mod record;
pub mod state;
pub mod transition;

pub use record::ConversationRecord;
pub use state::{ConversationState, ConversationStep};
pub use transition::{Signal, StateFilter, Transition, TransitionEngine, TransitionRule, TriggerSet};
