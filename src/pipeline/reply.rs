//! Reply generation: build a state-aware instruction and ask the model
//! for a reply.
//!
//! Model failures never escape: [`ReplyOutcome::Fallback`] carries a fixed,
//! user-safe message together with the error that caused it.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::conversation::{ConversationRecord, ConversationState};
use crate::error::LlmError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

/// Sent to the user whenever the model cannot produce a reply.
pub const FALLBACK_REPLY: &str =
    "Sorry, I'm having trouble responding right now. Please try again in a few minutes.";

/// Temperature for conversational replies.
const REPLY_TEMPERATURE: f32 = 0.4;

/// Cap on reply length. WhatsApp replies should stay short.
const REPLY_MAX_TOKENS: u32 = 512;

/// Outcome of one reply attempt.
#[derive(Debug)]
pub enum ReplyOutcome {
    /// Model completion text, verbatim.
    Generated(String),
    /// The model call failed; the user gets [`FALLBACK_REPLY`].
    Fallback { error: LlmError },
}

impl ReplyOutcome {
    /// Text to send to the user.
    pub fn text(&self) -> &str {
        match self {
            Self::Generated(text) => text,
            Self::Fallback { .. } => FALLBACK_REPLY,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Generates replies conditioned on the user's conversation state.
pub struct ReplyGenerator {
    llm: Arc<dyn LlmProvider>,
    assistant_name: String,
}

impl ReplyGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, assistant_name: impl Into<String>) -> Self {
        Self {
            llm,
            assistant_name: assistant_name.into(),
        }
    }

    /// Ask the model for a reply to `text`, given the user's record.
    pub async fn generate(&self, record: &ConversationRecord, text: &str) -> ReplyOutcome {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(build_system_prompt(&self.assistant_name, record)),
            ChatMessage::user(text),
        ])
        .with_temperature(REPLY_TEMPERATURE)
        .with_max_tokens(REPLY_MAX_TOKENS);

        let result = self.llm.complete(request).await.and_then(|response| {
            if response.content.trim().is_empty() {
                Err(LlmError::InvalidResponse {
                    provider: self.llm.model_name().to_string(),
                    reason: "empty completion".into(),
                })
            } else {
                Ok(response)
            }
        });

        match result {
            Ok(response) => {
                debug!(
                    user_id = %record.user_id,
                    input_tokens = response.input_tokens,
                    output_tokens = response.output_tokens,
                    "Reply generated"
                );
                ReplyOutcome::Generated(response.content)
            }
            Err(error) => {
                warn!(
                    user_id = %record.user_id,
                    model = %self.llm.model_name(),
                    error = %error,
                    "Reply generation failed, sending fallback"
                );
                ReplyOutcome::Fallback { error }
            }
        }
    }
}

/// Build the system instruction for a user's current state.
pub fn build_system_prompt(assistant_name: &str, record: &ConversationRecord) -> String {
    let mut prompt = format!(
        "You are {assistant_name}, a helpful HR assistant chatting with an employee on WhatsApp. \
Keep replies short, friendly and plain-text.\n\
The user's current conversation state is: {state}.",
        state = record.state
    );

    if record.state == ConversationState::LeaveApplication {
        prompt.push_str(
            "\nThe user wants to apply for leave. Ask them for the reason for the leave \
and the start and end dates if they have not given them yet.",
        );
    }

    prompt
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::conversation::ConversationStep;
    use crate::llm::{CompletionResponse, FinishReason, Role};

    /// Stub LLM that records requests and returns a canned result.
    struct StubLlm {
        reply: Result<String, ()>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl StubLlm {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(()),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for StubLlm {
        fn model_name(&self) -> &str {
            "stub"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.requests.lock().unwrap().push(request);
            match &self.reply {
                Ok(text) => Ok(CompletionResponse {
                    content: text.clone(),
                    input_tokens: 10,
                    output_tokens: 5,
                    finish_reason: FinishReason::Stop,
                }),
                Err(()) => Err(LlmError::RequestFailed {
                    provider: "stub".into(),
                    reason: "connection refused".into(),
                }),
            }
        }
    }

    fn leave_record() -> ConversationRecord {
        ConversationRecord {
            state: ConversationState::LeaveApplication,
            step: ConversationStep::AskingDetails,
            ..ConversationRecord::new("1555")
        }
    }

    #[test]
    fn prompt_mentions_state() {
        let prompt = build_system_prompt("ATB AI", &ConversationRecord::new("1555"));
        assert!(prompt.starts_with("You are ATB AI"));
        assert!(prompt.contains("state is: start"));
        assert!(!prompt.contains("start and end dates"));
    }

    #[test]
    fn leave_prompt_asks_for_reason_and_dates() {
        let prompt = build_system_prompt("ATB AI", &leave_record());
        assert!(prompt.contains("state is: leave_application"));
        assert!(prompt.contains("reason for the leave"));
        assert!(prompt.contains("start and end dates"));
    }

    #[tokio::test]
    async fn generate_returns_completion_verbatim() {
        let llm = Arc::new(StubLlm::replying("  Sure! What dates?\n"));
        let generator = ReplyGenerator::new(llm.clone(), "ATB AI");

        let outcome = generator.generate(&leave_record(), "I am sick").await;
        assert!(!outcome.is_fallback());
        assert_eq!(outcome.text(), "  Sure! What dates?\n");

        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].temperature, Some(REPLY_TEMPERATURE));
        assert_eq!(requests[0].max_tokens, Some(REPLY_MAX_TOKENS));
        let messages = &requests[0].messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("leave_application"));
        assert_eq!(messages[1], ChatMessage::user("I am sick"));
    }

    #[tokio::test]
    async fn generate_falls_back_on_model_failure() {
        let generator = ReplyGenerator::new(Arc::new(StubLlm::failing()), "ATB AI");

        let outcome = generator.generate(&ConversationRecord::new("1555"), "hello").await;
        assert!(outcome.is_fallback());
        assert_eq!(outcome.text(), FALLBACK_REPLY);
        match outcome {
            ReplyOutcome::Fallback { error } => {
                assert!(matches!(error, LlmError::RequestFailed { .. }))
            }
            ReplyOutcome::Generated(_) => unreachable!(),
        }
    }

    #[tokio::test]
    async fn blank_completion_falls_back() {
        let generator = ReplyGenerator::new(Arc::new(StubLlm::replying("   ")), "ATB AI");
        let outcome = generator.generate(&ConversationRecord::new("1555"), "hello").await;
        assert_eq!(outcome.text(), FALLBACK_REPLY);
    }
}
