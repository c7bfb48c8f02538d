//! Typed view of the WhatsApp Cloud API webhook payload.
//!
//! The platform delivers a deeply nested envelope where every level may be
//! absent. The nesting is modelled with defaulted `Vec`s and the message body
//! as an internally-tagged enum, so classification happens exactly once at
//! the boundary and the dispatcher can match exhaustively.

use serde::Deserialize;

/// Full webhook POST body: `entry[].changes[].value.messages[]`.
#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: ChangeValue,
}

/// Change payload. Status-only deliveries carry no `messages` array, and the
/// value object itself may be absent entirely.
#[derive(Debug, Default, Deserialize)]
pub struct ChangeValue {
    pub messages: Option<Vec<InboundMessage>>,
}

/// A single inbound message, classified by its `type` tag.
#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    /// Sender phone number (digits as a string).
    pub from: String,
    /// Platform message id (`wamid.…`).
    pub id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(flatten)]
    pub kind: MessageKind,
}

/// The type-specific payload. Exactly one variant matches the `type` field;
/// anything the relay does not handle collapses to `Unsupported`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageKind {
    Text { text: TextBody },
    Audio { audio: MediaReference },
    Image { image: MediaReference },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub body: String,
}

/// Opaque media id + MIME type, resolved via a separate metadata call.
#[derive(Debug, Deserialize)]
pub struct MediaReference {
    pub id: String,
    pub mime_type: String,
    /// Only images carry a user caption.
    pub caption: Option<String>,
}

impl WebhookEnvelope {
    /// Walk `entry[0].changes[0].value.messages[0]`.
    ///
    /// Absence at any nesting level means "no actionable message" — a no-op
    /// for the caller, never an error.
    pub fn into_first_message(self) -> Option<InboundMessage> {
        self.entry
            .into_iter()
            .next()?
            .changes
            .into_iter()
            .next()?
            .value
            .messages?
            .into_iter()
            .next()
    }
}
