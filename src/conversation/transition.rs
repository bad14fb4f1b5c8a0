//! State transition engine.
//!
//! An inbound message is first reduced to the set of [`Signal`]s it raises
//! (trigger-word matches), then the first [`TransitionRule`] whose state
//! filter and signal both match decides the next `(state, step)`. When no rule
//! matches, state and step are unchanged.
//!
//! Trigger matching is case-insensitive substring search on the raw text, so
//! "sickness" raises the same signal as "sick". `leave_application` has no
//! outgoing rule and is therefore absorbing.

use super::record::ConversationRecord;
use super::state::{ConversationState, ConversationStep};

/// Something an inbound message asks for, derived from trigger words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    LeaveRequested,
}

/// A set of trigger substrings that raise one signal.
#[derive(Debug, Clone)]
pub struct TriggerSet {
    pub signal: Signal,
    words: Vec<String>,
}

impl TriggerSet {
    pub fn new<I, S>(signal: Signal, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            signal,
            words: words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// Whether any trigger word occurs in `text`, ignoring case.
    pub fn matches(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.words.iter().any(|w| lowered.contains(w.as_str()))
    }
}

/// Which current states a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateFilter {
    Any,
    Is(ConversationState),
    Not(ConversationState),
}

impl StateFilter {
    fn accepts(&self, state: &ConversationState) -> bool {
        match self {
            Self::Any => true,
            Self::Is(s) => s == state,
            Self::Not(s) => s != state,
        }
    }
}

/// One row of the transition table.
#[derive(Debug, Clone)]
pub struct TransitionRule {
    pub from: StateFilter,
    pub on: Signal,
    pub to_state: ConversationState,
    pub to_step: ConversationStep,
}

/// Result of evaluating the table for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: ConversationState,
    pub step: ConversationStep,
    /// Whether a rule fired and moved the record to a different state or step.
    pub changed: bool,
}

/// Pure `(state, step, text) -> (state, step)` mapping.
#[derive(Debug, Clone)]
pub struct TransitionEngine {
    triggers: Vec<TriggerSet>,
    rules: Vec<TransitionRule>,
}

impl TransitionEngine {
    /// The default table: leave trigger words move any non-leave state into
    /// `leave_application / asking_details`.
    pub fn with_leave_triggers<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            triggers: vec![TriggerSet::new(Signal::LeaveRequested, words)],
            rules: vec![TransitionRule {
                from: StateFilter::Not(ConversationState::LeaveApplication),
                on: Signal::LeaveRequested,
                to_state: ConversationState::LeaveApplication,
                to_step: ConversationStep::AskingDetails,
            }],
        }
    }

    /// Build an engine from explicit triggers and rules.
    pub fn new(triggers: Vec<TriggerSet>, rules: Vec<TransitionRule>) -> Self {
        Self { triggers, rules }
    }

    /// Signals raised by `text`, in trigger-set order.
    pub fn signals(&self, text: &str) -> Vec<Signal> {
        self.triggers
            .iter()
            .filter(|t| t.matches(text))
            .map(|t| t.signal)
            .collect()
    }

    /// Compute the next state and step. Never mutates or persists anything.
    pub fn transition(&self, record: &ConversationRecord, text: &str) -> Transition {
        let signals = self.signals(text);

        let fired = self
            .rules
            .iter()
            .find(|rule| rule.from.accepts(&record.state) && signals.contains(&rule.on));

        match fired {
            Some(rule) => Transition {
                changed: rule.to_state != record.state || rule.to_step != record.step,
                state: rule.to_state.clone(),
                step: rule.to_step.clone(),
            },
            None => Transition {
                state: record.state.clone(),
                step: record.step.clone(),
                changed: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_LEAVE_TRIGGER_WORDS;

    fn engine() -> TransitionEngine {
        TransitionEngine::with_leave_triggers(DEFAULT_LEAVE_TRIGGER_WORDS.iter())
    }

    fn record_in(state: ConversationState, step: ConversationStep) -> ConversationRecord {
        ConversationRecord {
            state,
            step,
            ..ConversationRecord::new("15551234567")
        }
    }

    #[test]
    fn trigger_word_moves_fresh_record_to_leave_application() {
        let record = ConversationRecord::new("15551234567");
        let t = engine().transition(&record, "I need to request sick leave");
        assert_eq!(t.state, ConversationState::LeaveApplication);
        assert_eq!(t.step, ConversationStep::AskingDetails);
        assert!(t.changed);
    }

    #[test]
    fn unrelated_text_leaves_record_unchanged() {
        let record = ConversationRecord::new("15551234567");
        let t = engine().transition(&record, "what time is the meeting");
        assert_eq!(t.state, ConversationState::Start);
        assert_eq!(t.step, ConversationStep::Intro);
        assert!(!t.changed);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let record = ConversationRecord::new("1");
        let t = engine().transition(&record, "Requesting PERMISSION to be out");
        assert_eq!(t.state, ConversationState::LeaveApplication);
    }

    #[test]
    fn matching_is_substring_not_word() {
        // "sickness" and "leaves" still contain trigger words
        let record = ConversationRecord::new("1");
        assert!(engine().transition(&record, "my sickness").changed);
        assert!(engine().transition(&record, "the bus leaves at 5").changed);
    }

    #[test]
    fn leave_application_is_absorbing() {
        let record = record_in(
            ConversationState::LeaveApplication,
            ConversationStep::AskingDetails,
        );
        for text in ["thanks", "more sick leave please", "start over", ""] {
            let t = engine().transition(&record, text);
            assert_eq!(t.state, ConversationState::LeaveApplication, "text: {text:?}");
            assert_eq!(t.step, ConversationStep::AskingDetails);
            assert!(!t.changed);
        }
    }

    #[test]
    fn unknown_state_still_accepts_leave_trigger() {
        let record = record_in(
            ConversationState::Other("onboarding".into()),
            ConversationStep::Other("welcome".into()),
        );
        let t = engine().transition(&record, "can I take leave tomorrow");
        assert_eq!(t.state, ConversationState::LeaveApplication);
        assert_eq!(t.step, ConversationStep::AskingDetails);
    }

    #[test]
    fn custom_table_first_matching_rule_wins() {
        let engine = TransitionEngine::new(
            vec![TriggerSet::new(Signal::LeaveRequested, ["vacation"])],
            vec![
                TransitionRule {
                    from: StateFilter::Is(ConversationState::Start),
                    on: Signal::LeaveRequested,
                    to_state: ConversationState::Other("vacation".into()),
                    to_step: ConversationStep::Intro,
                },
                TransitionRule {
                    from: StateFilter::Any,
                    on: Signal::LeaveRequested,
                    to_state: ConversationState::LeaveApplication,
                    to_step: ConversationStep::AskingDetails,
                },
            ],
        );
        let record = ConversationRecord::new("1");
        let t = engine.transition(&record, "Vacation next week");
        assert_eq!(t.state, ConversationState::Other("vacation".into()));
        assert_eq!(t.step, ConversationStep::Intro);
        // Default trigger words are not part of this table
        assert!(!engine.transition(&record, "sick").changed);
    }

    #[test]
    fn blank_trigger_words_are_dropped() {
        let set = TriggerSet::new(Signal::LeaveRequested, ["", "  ", "Leave"]);
        assert_eq!(set.words, ["leave".to_string()]);
        assert!(set.matches("on LEAVE"));
        // An empty trigger would otherwise match everything
        assert!(!set.matches("hello"));
    }
}
