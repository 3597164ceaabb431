//! # WhatsApp Webhook Schemas
//!
//! Data structures for the JSON payload WhatsApp sends when webhook events
//! occur (incoming messages, status updates).
//!
//! Every level of the envelope is optional so that a payload missing a field
//! still deserializes; the handler then walks it with explicit accessors and
//! rejects incomplete envelopes instead of failing on parse.

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Raw message object, kept untyped so it can be classified by its keys
pub type RawMessage = serde_json::Map<String, serde_json::Value>;

/// Root webhook payload from WhatsApp
///
/// Only the levels the dispatcher walks are typed. Everything else stays a
/// loose [`serde_json::Value`] so an unexpected type in a field nobody reads
/// never turns a delivery into a parse failure.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct WebhookPayload {
    /// The object type, typically "whatsapp_business_account"
    pub object: Option<serde_json::Value>,
    /// Array of entry objects containing the actual data
    pub entry: Option<Vec<Entry>>,
}

/// Entry object containing changes
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Entry {
    /// Array of changes that occurred
    pub changes: Option<Vec<Change>>,
}

/// Change object containing the actual webhook data
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Change {
    /// The value containing the actual data
    pub value: Option<Value>,
}

/// Value object containing messages, senders and delivery statuses
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Value {
    /// Array of contacts (senders)
    pub contacts: Option<Vec<serde_json::Value>>,
    /// Array of messages received
    pub messages: Option<serde_json::Value>,
    /// Array of statuses (for sent messages)
    pub statuses: Option<serde_json::Value>,
}

impl Value {
    /// Sender of the first message, as reported in `contacts[0].wa_id`
    ///
    /// Returned as-is: a `wa_id` that is not a string is still a sender, it
    /// just never matches the configured recipient.
    pub fn sender_wa_id(&self) -> Option<&serde_json::Value> {
        self.contacts.as_deref()?.first()?.get("wa_id")
    }

    /// First entry of `messages`, if it is a JSON object
    pub fn first_message(&self) -> Option<&RawMessage> {
        self.messages.as_ref()?.as_array()?.first()?.as_object()
    }
}

/// JSON truthiness: `null`, `false`, `0`, `""`, `[]` and `{}` are all falsy
pub fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(a) => !a.is_empty(),
        serde_json::Value::Object(o) => !o.is_empty(),
    }
}

/// The message kinds the bot knows how to answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncomingMessage {
    /// Plain text; its content is never used for a reply
    Text { body: String },
    /// Voice note or audio file identified by its media id
    Audio { media_id: String },
    /// Anything else (image, sticker, reaction, ...)
    Unsupported,
}

impl TryFrom<&RawMessage> for IncomingMessage {
    type Error = anyhow::Error;

    /// `text` wins over `audio` when both keys are present.
    fn try_from(message: &RawMessage) -> anyhow::Result<Self> {
        if let Some(text) = message.get("text") {
            let body = text
                .get("body")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Ok(Self::Text { body });
        }

        if let Some(audio) = message.get("audio") {
            let media_id = audio
                .get("id")
                .and_then(serde_json::Value::as_str)
                .context("audio message without media id")?;
            return Ok(Self::Audio {
                media_id: media_id.to_string(),
            });
        }

        Ok(Self::Unsupported)
    }
}
