//! Conversation state and step tags.
//!
//! Both are stored as plain text, so unknown tags read back from the
//! database survive a round trip untouched.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level conversation state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConversationState {
    /// Initial state for every new user.
    #[default]
    Start,
    /// The user asked about leave; the assistant collects reason and dates.
    LeaveApplication,
    /// A tag written by something newer than this build.
    Other(String),
}

impl ConversationState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Start => "start",
            Self::LeaveApplication => "leave_application",
            Self::Other(tag) => tag,
        }
    }
}

impl From<&str> for ConversationState {
    fn from(s: &str) -> Self {
        match s {
            "start" => Self::Start,
            "leave_application" => Self::LeaveApplication,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ConversationState {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<ConversationState> for String {
    fn from(state: ConversationState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-step within a state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConversationStep {
    #[default]
    Intro,
    AskingDetails,
    Other(String),
}

impl ConversationStep {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Intro => "intro",
            Self::AskingDetails => "asking_details",
            Self::Other(tag) => tag,
        }
    }
}

impl From<&str> for ConversationStep {
    fn from(s: &str) -> Self {
        match s {
            "intro" => Self::Intro,
            "asking_details" => Self::AskingDetails,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ConversationStep {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<ConversationStep> for String {
    fn from(step: ConversationStep) -> Self {
        step.as_str().to_string()
    }
}

impl fmt::Display for ConversationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
