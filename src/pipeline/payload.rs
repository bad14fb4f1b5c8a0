//! Inbound webhook schema and the normalizer that reduces it to an
//! [`InboundMessage`].
//!
//! Two body shapes reach the webhook:
//! - a relay event (`{event, instance, data: {key: {remoteJid, fromMe}, message: {...}}}`)
//!   posted by the WhatsApp relay, and
//! - a direct test body (`{phone_number, message}`) for manual testing.
//!
//! Presence of `data` selects the relay shape. Downstream code only ever sees
//! the normalized message.

use serde::Deserialize;

use super::types::InboundMessage;

/// Raw webhook body as accepted over HTTP.
///
/// Every field is optional; which ones are present decides the shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    /// Relay event name, e.g. `messages.upsert`.
    #[serde(default)]
    pub event: Option<String>,
    /// Relay instance that received the message.
    #[serde(default)]
    pub instance: Option<String>,
    #[serde(default)]
    pub data: Option<RelayEventData>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// The `data` envelope of a relay event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelayEventData {
    #[serde(default)]
    pub key: Option<MessageKey>,
    #[serde(default)]
    pub message: Option<RelayMessage>,
}

/// Addressing for a relay message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageKey {
    /// Composite sender address, `<id>@<domain>`.
    #[serde(default, rename = "remoteJid")]
    pub remote_jid: Option<String>,
    /// Set when the relay echoes a message this service sent.
    #[serde(default, rename = "fromMe")]
    pub from_me: bool,
}

/// Message content of a relay event. Plain chats use `conversation`;
/// replies, links and quoted messages use `extendedTextMessage`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelayMessage {
    #[serde(default)]
    pub conversation: Option<String>,
    #[serde(default, rename = "extendedTextMessage")]
    pub extended_text_message: Option<ExtendedTextMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtendedTextMessage {
    #[serde(default)]
    pub text: Option<String>,
}

/// The two body shapes, resolved once.
#[derive(Debug, Clone)]
pub enum InboundPayload {
    RelayEvent(RelayEventData),
    Direct {
        phone_number: Option<String>,
        message: Option<String>,
    },
}

impl From<WebhookPayload> for InboundPayload {
    fn from(payload: WebhookPayload) -> Self {
        match payload.data {
            Some(data) => Self::RelayEvent(data),
            None => Self::Direct {
                phone_number: payload.phone_number,
                message: payload.message,
            },
        }
    }
}

/// Why a payload produced no work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Text or sender missing or blank.
    MissingData,
    /// The relay echoed one of our own outgoing messages.
    OwnMessage,
}

impl IgnoreReason {
    /// Reason string reported back to the webhook caller.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingData => "Missing data",
            Self::OwnMessage => "Outgoing message",
        }
    }
}

/// Result of normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Message(InboundMessage),
    Ignored(IgnoreReason),
}

/// Reduce a webhook body to `(user_id, text)`. Pure; never fails.
pub fn normalize(payload: impl Into<InboundPayload>) -> Normalized {
    match payload.into() {
        InboundPayload::RelayEvent(data) => normalize_relay_event(data),
        InboundPayload::Direct {
            phone_number,
            message,
        } => build(phone_number.as_deref(), message.as_deref()),
    }
}

fn normalize_relay_event(data: RelayEventData) -> Normalized {
    let key = data.key.unwrap_or_default();
    if key.from_me {
        return Normalized::Ignored(IgnoreReason::OwnMessage);
    }

    let text = data.message.as_ref().and_then(message_text);
    let user_id = key.remote_jid.as_deref().map(user_id_from_jid);

    build(user_id, text)
}

/// Text of a relay message: the plain conversation field when it has
/// content, otherwise the extended text.
fn message_text(message: &RelayMessage) -> Option<&str> {
    let conversation = message
        .conversation
        .as_deref()
        .filter(|t| !t.trim().is_empty());
    conversation.or_else(|| {
        message
            .extended_text_message
            .as_ref()
            .and_then(|m| m.text.as_deref())
    })
}

/// The part of a composite address before the first `@`.
pub fn user_id_from_jid(jid: &str) -> &str {
    jid.split('@').next().unwrap_or(jid)
}

fn build(user_id: Option<&str>, text: Option<&str>) -> Normalized {
    let user_id = user_id.map(str::trim).filter(|s| !s.is_empty());
    let text = text.map(str::trim).filter(|s| !s.is_empty());
    match (user_id, text) {
        (Some(user_id), Some(text)) => Normalized::Message(InboundMessage::new(user_id, text)),
        _ => Normalized::Ignored(IgnoreReason::MissingData),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: serde_json::Value) -> WebhookPayload {
        serde_json::from_value(json).unwrap()
    }

    fn expect_message(normalized: Normalized) -> InboundMessage {
        match normalized {
            Normalized::Message(msg) => msg,
            other => panic!("expected a message, got {other:?}"),
        }
    }

    #[test]
    fn relay_event_with_conversation_text() {
        let payload = parse(serde_json::json!({
            "event": "messages.upsert",
            "instance": "atb",
            "data": {
                "key": {"remoteJid": "15551234567@s.whatsapp.net", "fromMe": false, "id": "ABC"},
                "pushName": "Ada",
                "message": {"conversation": "  I am sick today  "}
            }
        }));
        let msg = expect_message(normalize(payload));
        assert_eq!(msg.user_id, "15551234567");
        assert_eq!(msg.text, "I am sick today");
    }

    #[test]
    fn relay_event_with_extended_text() {
        let payload = parse(serde_json::json!({
            "data": {
                "key": {"remoteJid": "2348012345678@s.whatsapp.net"},
                "message": {"extendedTextMessage": {"text": "thanks"}}
            }
        }));
        let msg = expect_message(normalize(payload));
        assert_eq!(msg.user_id, "2348012345678");
        assert_eq!(msg.text, "thanks");
    }

    #[test]
    fn blank_conversation_falls_back_to_extended_text() {
        let payload = parse(serde_json::json!({
            "data": {
                "key": {"remoteJid": "1@s.whatsapp.net"},
                "message": {"conversation": "  ", "extendedTextMessage": {"text": "see link"}}
            }
        }));
        assert_eq!(expect_message(normalize(payload)).text, "see link");
    }

    #[test]
    fn user_id_is_everything_before_the_at() {
        for (jid, expected) in [
            ("15551234567@s.whatsapp.net", "15551234567"),
            ("120363041234567890@g.us", "120363041234567890"),
            ("abc@def@ghi", "abc"),
            ("no-domain", "no-domain"),
        ] {
            assert_eq!(user_id_from_jid(jid), expected);
        }
    }

    #[test]
    fn relay_event_without_remote_jid_is_ignored() {
        let payload = parse(serde_json::json!({
            "data": {"key": {}, "message": {"conversation": "hello"}}
        }));
        assert_eq!(normalize(payload), Normalized::Ignored(IgnoreReason::MissingData));
    }

    #[test]
    fn relay_event_without_text_is_ignored() {
        let payload = parse(serde_json::json!({
            "data": {
                "key": {"remoteJid": "1555@s.whatsapp.net"},
                "message": {"imageMessage": {"url": "https://example.com/x.jpg"}}
            }
        }));
        assert_eq!(normalize(payload), Normalized::Ignored(IgnoreReason::MissingData));
    }

    #[test]
    fn own_messages_are_ignored() {
        let payload = parse(serde_json::json!({
            "data": {
                "key": {"remoteJid": "1555@s.whatsapp.net", "fromMe": true},
                "message": {"conversation": "Our own reply"}
            }
        }));
        assert_eq!(normalize(payload), Normalized::Ignored(IgnoreReason::OwnMessage));
    }

    #[test]
    fn direct_shape() {
        let payload = parse(serde_json::json!({
            "phone_number": " 15551234567 ",
            "message": "I am sick today"
        }));
        let msg = expect_message(normalize(payload));
        assert_eq!(msg.user_id, "15551234567");
        assert_eq!(msg.text, "I am sick today");
    }

    #[test]
    fn direct_shape_missing_fields_is_ignored() {
        for json in [
            serde_json::json!({}),
            serde_json::json!({"phone_number": "1555"}),
            serde_json::json!({"message": "hello"}),
            serde_json::json!({"phone_number": "1555", "message": "   "}),
            serde_json::json!({"phone_number": "", "message": "hello"}),
        ] {
            assert_eq!(
                normalize(parse(json.clone())),
                Normalized::Ignored(IgnoreReason::MissingData),
                "payload: {json}"
            );
        }
    }

    #[test]
    fn relay_envelope_takes_precedence_over_direct_fields() {
        let payload = parse(serde_json::json!({
            "phone_number": "999",
            "message": "direct text",
            "data": {
                "key": {"remoteJid": "1555@s.whatsapp.net"},
                "message": {"conversation": "relay text"}
            }
        }));
        let msg = expect_message(normalize(payload));
        assert_eq!(msg.user_id, "1555");
        assert_eq!(msg.text, "relay text");
    }

    #[test]
    fn malformed_envelope_fails_schema() {
        let result: Result<WebhookPayload, _> =
            serde_json::from_value(serde_json::json!({"data": "not an object"}));
        assert!(result.is_err());
    }

    #[test]
    fn ignore_reasons_render_for_callers() {
        assert_eq!(IgnoreReason::MissingData.as_str(), "Missing data");
        assert_eq!(IgnoreReason::OwnMessage.as_str(), "Outgoing message");
    }
}
