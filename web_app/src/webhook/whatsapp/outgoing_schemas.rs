//! # WhatsApp Outgoing Message Schemas
//!
//! JSON payloads sent to the WhatsApp Business API and the responses it
//! returns.

use serde::{Deserialize, Serialize};

/// Text message to send to WhatsApp
#[derive(Debug, Serialize, Deserialize)]
pub struct OutgoingTextMessage {
    /// Messaging product, always "whatsapp"
    pub messaging_product: String,
    /// Always "individual"
    pub recipient_type: String,
    /// Recipient's WhatsApp ID (phone number)
    pub to: String,
    /// Message type
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Text content
    pub text: OutgoingTextContent,
}

impl OutgoingTextMessage {
    /// Creates a new text message
    pub fn new(to: String, body: String) -> Self {
        Self {
            messaging_product: "whatsapp".to_string(),
            recipient_type: "individual".to_string(),
            to,
            msg_type: "text".to_string(),
            text: OutgoingTextContent {
                preview_url: false,
                body,
            },
        }
    }
}

/// Text content for outgoing messages
#[derive(Debug, Serialize, Deserialize)]
pub struct OutgoingTextContent {
    /// Render link previews; the bot never does
    pub preview_url: bool,
    /// Message body text
    pub body: String,
}

/// Response from WhatsApp API when sending a message
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsAppMessageResponse {
    pub messaging_product: String,
    pub contacts: Vec<WhatsAppContact>,
    pub messages: Vec<WhatsAppMessageStatus>,
}

/// Contact information in response
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsAppContact {
    pub wa_id: String,
    pub input: String,
}

/// Message status in response
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsAppMessageStatus {
    pub id: String,
}

/// Response from the media endpoint when resolving a media id
#[derive(Debug, Deserialize)]
pub struct MediaUrlResponse {
    /// Short-lived download url, requires the same bearer token
    pub url: String,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
}
