use std::time::Duration;

/// Upper bound for every outbound HTTP call (Graph API and transcription).
pub const OUTBOUND_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const WHATSAPP_WEBHOOK_PATH: &str = "/webhook/whatsapp";
pub const HUB_SIGNATURE_HEADER: &str = "X-Hub-Signature-256";
pub const SUBSCRIBE_MODE: &str = "subscribe";

pub const BOT_INFO_MESSAGE: &str =
    "Hi, I am an AI assistant. I can help you transcribe WhatsApp voice messages.";
pub const TRANSCRIBING_MESSAGE: &str = "Transcribing your message...";
pub const TRANSCRIPTION_PREFIX: &str = "*Transcription:*";

pub const VOICE_NOTE_FILE_PREFIX: &str = "voice_message";
pub const VOICE_NOTE_EXTENSION: &str = "ogg";
pub const VOICE_NOTE_MIME_TYPE: &str = "audio/ogg";
