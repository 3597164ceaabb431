//! # WhatsApp Webhook Handler
//!
//! Business logic behind the webhook endpoints: subscription verification,
//! envelope validation, sender authorization and message routing, plus the
//! voice note transcription flow.

use super::{
    client::ImplWhatsAppApi,
    routes::VerifyQuery,
    schemas::{IncomingMessage, RawMessage, Value, WebhookPayload, is_truthy},
};
use crate::{
    config, consts, metric,
    services::{ImplTranscriptionService, voice_note::VoiceNoteFile},
    webhook::errors::WebhookError,
};
use anyhow::{Context, Result};
use std::path::Path;
use subtle::ConstantTimeEq;

/// What an incoming webhook payload turned out to be
#[derive(Debug)]
pub enum WebhookEvent<'a> {
    /// Delivery/read receipts for messages the bot sent
    StatusUpdate(&'a serde_json::Value),
    /// A well formed envelope carrying at least one message
    Message {
        value: &'a Value,
        message: &'a RawMessage,
    },
    /// Anything missing one of the required envelope levels
    NotWhatsAppEvent,
}

/// Validates a subscription handshake and returns the challenge to echo back
///
/// Empty parameters count as missing.
pub fn verify_subscription(
    query: &VerifyQuery,
    verify_token: &str,
) -> Result<String, WebhookError> {
    let non_empty = |param: &Option<String>| param.clone().filter(|p| !p.is_empty());

    let (Some(mode), Some(token)) = (non_empty(&query.mode), non_empty(&query.verify_token))
    else {
        return Err(WebhookError::MissingParameters);
    };

    let token_matches: bool = token.as_bytes().ct_eq(verify_token.as_bytes()).into();
    if mode != consts::SUBSCRIBE_MODE || !token_matches {
        return Err(WebhookError::VerificationFailed);
    }

    Ok(query.challenge.clone().unwrap_or_default())
}

/// Parses the raw request body
///
/// Bodies that are not a JSON object are a processing failure, an object
/// whose envelope levels have the wrong shape is not a WhatsApp event.
pub fn parse_payload(body: &[u8]) -> Result<WebhookPayload, WebhookError> {
    let json: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| WebhookError::ProcessingFailed(format!("invalid webhook body: {e}")))?;

    if !json.is_object() {
        return Err(WebhookError::ProcessingFailed(
            "webhook body is not a JSON object".to_string(),
        ));
    }

    serde_json::from_value(json).map_err(|e| {
        logfire::warn!(
            "Webhook payload does not match the envelope: {error}",
            error = e.to_string()
        );
        WebhookError::NotWhatsAppEvent
    })
}

fn first_value(payload: &WebhookPayload) -> Option<&Value> {
    payload
        .entry
        .as_deref()?
        .first()?
        .changes
        .as_deref()?
        .first()?
        .value
        .as_ref()
}

/// Walks `object`, `entry[0]`, `changes[0]`, `value`, `messages[0]` in that order
fn first_message(payload: &WebhookPayload) -> Option<(&Value, &RawMessage)> {
    payload.object.as_ref().filter(|object| is_truthy(object))?;
    let entry = payload.entry.as_deref()?.first()?;
    let change = entry.changes.as_deref()?.first()?;
    let value = change.value.as_ref()?;
    let message = value.first_message()?;

    (!message.is_empty()).then_some((value, message))
}

/// Classifies a payload. Status updates are recognised before any structural
/// check so they never reach message processing.
pub fn classify_webhook(payload: &WebhookPayload) -> WebhookEvent<'_> {
    if let Some(statuses) = first_value(payload)
        .and_then(|value| value.statuses.as_ref())
        .filter(|statuses| is_truthy(statuses))
    {
        return WebhookEvent::StatusUpdate(statuses);
    }

    match first_message(payload) {
        Some((value, message)) => WebhookEvent::Message { value, message },
        None => WebhookEvent::NotWhatsAppEvent,
    }
}

/// Downloads a voice note, transcribes it and replies with the transcription
///
/// # Arguments
///
/// * `media_id` - Media id from the incoming audio message
/// * `to` - WhatsApp ID that sent the voice note
/// * `client` - WhatsApp API client
/// * `transcription_service` - Speech to text service
/// * `voice_notes_dir` - Where the audio is kept while it is transcribed
#[tracing::instrument(skip_all)]
pub async fn handle_voice_message(
    media_id: String,
    to: &str,
    client: &ImplWhatsAppApi,
    transcription_service: &ImplTranscriptionService,
    voice_notes_dir: &Path,
) -> Result<()> {
    let media_url = client
        .get_media_url(media_id)
        .await
        .context("failed to resolve voice note url")?;

    let audio = client
        .download_media(media_url)
        .await
        .context("failed to download voice note")?;

    let voice_note = VoiceNoteFile::persist(voice_notes_dir, &audio).await?;

    let transcription = transcription_service
        .transcribe_file(voice_note.path().to_path_buf())
        .await
        .context("failed to transcribe voice note")?;

    if let Err(e) = voice_note.remove().await {
        logfire::warn!("Voice note cleanup failed: {error}", error = format!("{e:#}"));
    }

    if transcription.is_empty() {
        logfire::info!("Transcription came back empty, nothing to reply");
        metric::incr_transcription_statds("empty");
        return Ok(());
    }

    client
        .send_text_message(
            to.to_string(),
            format!("{}\n{}", consts::TRANSCRIPTION_PREFIX, transcription),
        )
        .await?;
    metric::incr_transcription_statds("sent");

    Ok(())
}

/// Handles a validated message
///
/// Only the configured recipient gets an answer; anybody else is dropped
/// without a reply.
#[tracing::instrument(skip_all)]
pub async fn handle_user_message(
    value: &Value,
    message: &RawMessage,
    client: &ImplWhatsAppApi,
    transcription_service: &ImplTranscriptionService,
    app_config: &config::AppConfig,
) -> Result<()> {
    let sender = value
        .sender_wa_id()
        .context("webhook message without sender contact")?;

    let Some(wa_id) = sender
        .as_str()
        .filter(|wa_id| *wa_id == app_config.whatsapp_recipient_waid)
    else {
        logfire::error!("Unauthorized user");
        metric::incr_webhook_event_statds("unauthorized");
        return Ok(());
    };

    match IncomingMessage::try_from(message)? {
        IncomingMessage::Text { body } => {
            metric::incr_webhook_event_statds("text");
            logfire::info!(
                "Text message of {len} chars received, replying with bot info",
                len = body.chars().count().to_string()
            );
            client
                .send_text_message(wa_id.to_string(), consts::BOT_INFO_MESSAGE.to_string())
                .await?;
        }
        IncomingMessage::Audio { media_id } => {
            metric::incr_webhook_event_statds("audio");
            client
                .send_text_message(wa_id.to_string(), consts::TRANSCRIBING_MESSAGE.to_string())
                .await?;

            handle_voice_message(
                media_id,
                wa_id,
                client,
                transcription_service,
                Path::new(&app_config.voice_notes_dir),
            )
            .await?;
        }
        IncomingMessage::Unsupported => {
            metric::incr_webhook_event_statds("unsupported");
            logfire::warn!("Unsupported message type received");
        }
    }

    Ok(())
}

/// Main webhook processor
///
/// # Returns
///
/// * `Ok(())` - status update, dropped sender or handled message
/// * `Err(WebhookError::NotWhatsAppEvent)` - incomplete envelope
/// * `Err(WebhookError::ProcessingFailed)` - any outbound call failed
pub async fn process_webhook(
    payload: &WebhookPayload,
    client: &ImplWhatsAppApi,
    transcription_service: &ImplTranscriptionService,
    app_config: &config::AppConfig,
) -> Result<(), WebhookError> {
    match classify_webhook(payload) {
        WebhookEvent::StatusUpdate(statuses) => {
            metric::incr_webhook_event_statds("status");
            logfire::info!(
                "Received {count} status updates",
                count = statuses.as_array().map_or(1, Vec::len).to_string()
            );
            Ok(())
        }
        WebhookEvent::NotWhatsAppEvent => {
            metric::incr_webhook_event_statds("not_whatsapp_event");
            Err(WebhookError::NotWhatsAppEvent)
        }
        WebhookEvent::Message { value, message } => {
            handle_user_message(value, message, client, transcription_service, app_config)
                .await
                .map_err(|e| {
                    metric::incr_webhook_event_statds("failed");
                    logfire::error!("Failed to handle message: {error}", error = format!("{e:#}"));
                    WebhookError::ProcessingFailed(format!("{e:#}"))
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        services::MockTranscriptionService,
        webhook::whatsapp::{client::MockWhatsAppApi, outgoing_schemas::WhatsAppMessageResponse},
    };
    use mockall::{Sequence, predicate::eq};
    use serde_json::json;

    const SENDER: &str = "5215512345678";

    fn payload(value: serde_json::Value) -> WebhookPayload {
        serde_json::from_value(value).unwrap()
    }

    fn message_payload(from: &str, message: serde_json::Value) -> WebhookPayload {
        payload(json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "102290129340398",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "metadata": {
                            "display_phone_number": "15550783881",
                            "phone_number_id": "106540352242922"
                        },
                        "contacts": [{"profile": {"name": "Ana"}, "wa_id": from}],
                        "messages": [message]
                    }
                }]
            }]
        }))
    }

    fn query(mode: Option<&str>, token: Option<&str>, challenge: Option<&str>) -> VerifyQuery {
        VerifyQuery {
            mode: mode.map(String::from),
            verify_token: token.map(String::from),
            challenge: challenge.map(String::from),
        }
    }

    fn boxed(
        client: MockWhatsAppApi,
        transcription: MockTranscriptionService,
    ) -> (ImplWhatsAppApi, ImplTranscriptionService) {
        (Box::new(client), Box::new(transcription))
    }

    fn sent() -> Result<WhatsAppMessageResponse> {
        Ok(WhatsAppMessageResponse::default())
    }

    #[test]
    fn test_verify_subscription_echoes_challenge() {
        let result = verify_subscription(
            &query(Some("subscribe"), Some("verify-secret"), Some("1158201444")),
            "verify-secret",
        );

        assert_eq!(result.unwrap(), "1158201444");
    }

    #[test]
    fn test_verify_subscription_rejects_wrong_mode_or_token() {
        assert!(matches!(
            verify_subscription(
                &query(Some("unsubscribe"), Some("verify-secret"), Some("c")),
                "verify-secret"
            ),
            Err(WebhookError::VerificationFailed)
        ));
        assert!(matches!(
            verify_subscription(&query(Some("subscribe"), Some("nope"), Some("c")), "verify-secret"),
            Err(WebhookError::VerificationFailed)
        ));
    }

    #[test]
    fn test_verify_subscription_missing_parameters() {
        for q in [
            query(None, Some("verify-secret"), Some("c")),
            query(Some("subscribe"), None, Some("c")),
            query(None, None, None),
            query(Some(""), Some("verify-secret"), Some("c")),
        ] {
            assert!(matches!(
                verify_subscription(&q, "verify-secret"),
                Err(WebhookError::MissingParameters)
            ));
        }
    }

    #[test]
    fn test_verify_subscription_without_challenge_echoes_nothing() {
        let result =
            verify_subscription(&query(Some("subscribe"), Some("verify-secret"), None), "verify-secret");

        assert_eq!(result.unwrap(), "");
    }

    #[test]
    fn test_parse_payload_error_kinds() {
        assert!(matches!(
            parse_payload(b"{not json"),
            Err(WebhookError::ProcessingFailed(_))
        ));
        for not_an_object in ["[]", r#""x""#, "42", "null"] {
            assert!(matches!(
                parse_payload(not_an_object.as_bytes()),
                Err(WebhookError::ProcessingFailed(_))
            ));
        }
        assert!(matches!(
            parse_payload(br#"{"object": "whatsapp_business_account", "entry": 5}"#),
            Err(WebhookError::NotWhatsAppEvent)
        ));
        assert!(parse_payload(br#"{"object": "whatsapp_business_account"}"#).is_ok());
    }

    #[ntex::test]
    async fn test_status_envelopes_are_acknowledged_whatever_the_other_fields_hold() {
        let (client, transcription) = boxed(MockWhatsAppApi::new(), MockTranscriptionService::new());
        let app_config = config::AppConfig::for_tests("http://localhost");
        let bodies = [
            json!({"object": "whatsapp_business_account", "entry": [{"id": 102290129340398_u64,
                "changes": [{"value": {"statuses": [{"id": "wamid.1", "status": "read"}]}}]}]}),
            json!({"object": "whatsapp_business_account", "entry": [{"changes": [{"value": {
                "statuses": [{"id": "wamid.1", "status": "sent", "timestamp": 1700000000}]}}]}]}),
            json!({"object": 1, "entry": [{"changes": [{"value": {
                "statuses": [{"id": "wamid.1", "status": "delivered"}]}}]}]}),
            json!({"object": "whatsapp_business_account", "entry": [{"changes": [{"value": {
                "contacts": [{"wa_id": 5215512345678_u64}],
                "statuses": [{"id": "wamid.1", "status": "read"}]}}]}]}),
            json!({"entry": [{"changes": [{"field": 3, "value": {
                "metadata": "n/a", "messages": "garbage", "statuses": [{}]}}]}]}),
        ];

        for body in bodies {
            let event = parse_payload(body.to_string().as_bytes()).unwrap();
            assert!(
                matches!(classify_webhook(&event), WebhookEvent::StatusUpdate(_)),
                "expected a status update for {body}"
            );
            assert!(
                process_webhook(&event, &client, &transcription, &app_config)
                    .await
                    .is_ok()
            );
        }
    }

    #[ntex::test]
    async fn test_non_string_sender_is_dropped_silently() {
        let (client, transcription) = boxed(MockWhatsAppApi::new(), MockTranscriptionService::new());
        let event = payload(json!({
            "object": "whatsapp_business_account",
            "entry": [{"changes": [{"value": {
                "contacts": [{"wa_id": 5215512345678_u64}],
                "messages": [{"audio": {"id": "M1"}}]
            }}]}]
        }));

        let result = process_webhook(
            &event,
            &client,
            &transcription,
            &config::AppConfig::for_tests("http://localhost"),
        )
        .await;

        assert!(result.is_ok());
    }

    #[test]
    fn test_classify_status_update_wins_over_everything() {
        let status = payload(json!({
            "entry": [{"changes": [{"value": {
                "statuses": [{"id": "wamid.1", "status": "delivered", "recipient_id": SENDER}],
                "messages": [{"text": {"body": "hi"}}]
            }}]}]
        }));

        assert!(matches!(
            classify_webhook(&status),
            WebhookEvent::StatusUpdate(statuses) if statuses[0]["status"] == "delivered"
        ));
    }

    #[test]
    fn test_classify_rejects_each_missing_level() {
        let incomplete = [
            json!({}),
            json!({"entry": [{"changes": [{"value": {"messages": [{"text": {}}]}}]}]}),
            json!({"object": "", "entry": [{"changes": [{"value": {"messages": [{"text": {}}]}}]}]}),
            json!({"object": 0, "entry": [{"changes": [{"value": {"messages": [{"text": {}}]}}]}]}),
            json!({"object": "whatsapp_business_account"}),
            json!({"object": "whatsapp_business_account", "entry": []}),
            json!({"object": "whatsapp_business_account", "entry": [{}]}),
            json!({"object": "whatsapp_business_account", "entry": [{"changes": []}]}),
            json!({"object": "whatsapp_business_account", "entry": [{"changes": [{}]}]}),
            json!({"object": "whatsapp_business_account", "entry": [{"changes": [{"value": {}}]}]}),
            json!({"object": "whatsapp_business_account", "entry": [{"changes": [{"value": {"messages": []}}]}]}),
            json!({"object": "whatsapp_business_account", "entry": [{"changes": [{"value": {"messages": [{}]}}]}]}),
            json!({"object": "whatsapp_business_account", "entry": [{"changes": [{"value": {"statuses": [], "messages": []}}]}]}),
        ];

        for value in incomplete {
            assert!(
                matches!(classify_webhook(&payload(value.clone())), WebhookEvent::NotWhatsAppEvent),
                "expected rejection for {value}"
            );
        }
    }

    #[test]
    fn test_classify_message() {
        let event = message_payload(SENDER, json!({"text": {"body": "hello"}}));

        assert!(matches!(
            classify_webhook(&event),
            WebhookEvent::Message { value, .. }
                if value.sender_wa_id().and_then(|id| id.as_str()) == Some(SENDER)
        ));
    }

    #[ntex::test]
    async fn test_status_update_makes_no_outbound_calls() {
        let (client, transcription) = boxed(MockWhatsAppApi::new(), MockTranscriptionService::new());
        let status = payload(json!({
            "object": "whatsapp_business_account",
            "entry": [{"changes": [{"value": {"statuses": [{"id": "wamid.1", "status": "read"}]}}]}]
        }));

        let result = process_webhook(
            &status,
            &client,
            &transcription,
            &config::AppConfig::for_tests("http://localhost"),
        )
        .await;

        assert!(result.is_ok());
    }

    #[ntex::test]
    async fn test_invalid_envelope_makes_no_outbound_calls() {
        let (client, transcription) = boxed(MockWhatsAppApi::new(), MockTranscriptionService::new());

        let result = process_webhook(
            &payload(json!({"object": "whatsapp_business_account", "entry": []})),
            &client,
            &transcription,
            &config::AppConfig::for_tests("http://localhost"),
        )
        .await;

        assert!(matches!(result, Err(WebhookError::NotWhatsAppEvent)));
    }

    #[ntex::test]
    async fn test_unauthorized_sender_is_dropped_silently() {
        let (client, transcription) = boxed(MockWhatsAppApi::new(), MockTranscriptionService::new());

        let result = process_webhook(
            &message_payload("5219999999999", json!({"audio": {"id": "M1"}})),
            &client,
            &transcription,
            &config::AppConfig::for_tests("http://localhost"),
        )
        .await;

        assert!(result.is_ok());
    }

    #[ntex::test]
    async fn test_missing_sender_contact_is_a_processing_failure() {
        let (client, transcription) = boxed(MockWhatsAppApi::new(), MockTranscriptionService::new());
        let event = payload(json!({
            "object": "whatsapp_business_account",
            "entry": [{"changes": [{"value": {"messages": [{"text": {"body": "hi"}}]}}]}]
        }));

        let result = process_webhook(
            &event,
            &client,
            &transcription,
            &config::AppConfig::for_tests("http://localhost"),
        )
        .await;

        assert!(matches!(result, Err(WebhookError::ProcessingFailed(_))));
    }

    #[ntex::test]
    async fn test_text_message_gets_bot_info_reply_only() {
        let mut client = MockWhatsAppApi::new();
        client
            .expect_send_text_message()
            .with(eq(SENDER.to_string()), eq(consts::BOT_INFO_MESSAGE.to_string()))
            .times(1)
            .returning(|_, _| sent());
        let (client, transcription) = boxed(client, MockTranscriptionService::new());

        let result = process_webhook(
            &message_payload(SENDER, json!({"type": "text", "text": {"body": "hello"}})),
            &client,
            &transcription,
            &config::AppConfig::for_tests("http://localhost"),
        )
        .await;

        assert!(result.is_ok());
    }

    #[ntex::test]
    async fn test_unsupported_message_makes_no_outbound_calls() {
        let (client, transcription) = boxed(MockWhatsAppApi::new(), MockTranscriptionService::new());

        let result = process_webhook(
            &message_payload(SENDER, json!({"type": "image", "image": {"id": "IMG1"}})),
            &client,
            &transcription,
            &config::AppConfig::for_tests("http://localhost"),
        )
        .await;

        assert!(result.is_ok());
    }

    #[ntex::test]
    async fn test_audio_message_full_flow_in_order() {
        let mut seq = Sequence::new();
        let mut client = MockWhatsAppApi::new();
        let mut transcription = MockTranscriptionService::new();

        client
            .expect_send_text_message()
            .with(eq(SENDER.to_string()), eq(consts::TRANSCRIBING_MESSAGE.to_string()))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| sent());
        client
            .expect_get_media_url()
            .with(eq("M1".to_string()))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("https://lookaside.fbsbx.com/M1".into()));
        client
            .expect_download_media()
            .with(eq("https://lookaside.fbsbx.com/M1".to_string()))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(b"OggS-voice".to_vec()));
        transcription
            .expect_transcribe_file()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|path| {
                assert_eq!(std::fs::read(&path).unwrap(), b"OggS-voice".to_vec());
                Ok("hola, nos vemos mañana".into())
            });
        client
            .expect_send_text_message()
            .with(
                eq(SENDER.to_string()),
                eq("*Transcription:*\nhola, nos vemos mañana".to_string()),
            )
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| sent());
        let (client, transcription) = boxed(client, transcription);

        let result = process_webhook(
            &message_payload(SENDER, json!({"type": "audio", "audio": {"id": "M1"}})),
            &client,
            &transcription,
            &config::AppConfig::for_tests("http://localhost"),
        )
        .await;

        assert!(result.is_ok());
    }

    #[ntex::test]
    async fn test_empty_transcription_sends_no_reply() {
        let mut client = MockWhatsAppApi::new();
        let mut transcription = MockTranscriptionService::new();

        client
            .expect_send_text_message()
            .with(eq(SENDER.to_string()), eq(consts::TRANSCRIBING_MESSAGE.to_string()))
            .times(1)
            .returning(|_, _| sent());
        client
            .expect_get_media_url()
            .times(1)
            .returning(|_| Ok("https://lookaside.fbsbx.com/M1".into()));
        client
            .expect_download_media()
            .times(1)
            .returning(|_| Ok(b"silence".to_vec()));
        transcription
            .expect_transcribe_file()
            .times(1)
            .returning(|_| Ok(String::new()));
        let (client, transcription) = boxed(client, transcription);

        let result = process_webhook(
            &message_payload(SENDER, json!({"audio": {"id": "M1"}})),
            &client,
            &transcription,
            &config::AppConfig::for_tests("http://localhost"),
        )
        .await;

        assert!(result.is_ok());
    }

    #[ntex::test]
    async fn test_media_lookup_failure_keeps_ack_and_skips_reply() {
        let mut client = MockWhatsAppApi::new();

        client
            .expect_send_text_message()
            .with(eq(SENDER.to_string()), eq(consts::TRANSCRIBING_MESSAGE.to_string()))
            .times(1)
            .returning(|_, _| sent());
        client
            .expect_get_media_url()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("WhatsApp media lookup returned error status 404")));
        client.expect_download_media().never();
        let (client, transcription) = boxed(client, MockTranscriptionService::new());

        let result = process_webhook(
            &message_payload(SENDER, json!({"audio": {"id": "M1"}})),
            &client,
            &transcription,
            &config::AppConfig::for_tests("http://localhost"),
        )
        .await;

        assert!(matches!(result, Err(WebhookError::ProcessingFailed(_))));
    }

    #[ntex::test]
    async fn test_media_download_failure_skips_transcription_and_reply() {
        let mut client = MockWhatsAppApi::new();
        let mut transcription = MockTranscriptionService::new();

        client
            .expect_send_text_message()
            .with(eq(SENDER.to_string()), eq(consts::TRANSCRIBING_MESSAGE.to_string()))
            .times(1)
            .returning(|_, _| sent());
        client
            .expect_get_media_url()
            .times(1)
            .returning(|_| Ok("https://lookaside.fbsbx.com/M1".into()));
        client
            .expect_download_media()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("WhatsApp media download returned error status 403")));
        transcription.expect_transcribe_file().never();
        let (client, transcription) = boxed(client, transcription);

        let result = process_webhook(
            &message_payload(SENDER, json!({"audio": {"id": "M1"}})),
            &client,
            &transcription,
            &config::AppConfig::for_tests("http://localhost"),
        )
        .await;

        assert!(matches!(result, Err(WebhookError::ProcessingFailed(_))));
    }

    #[ntex::test]
    async fn test_transcription_failure_is_a_processing_failure() {
        let mut client = MockWhatsAppApi::new();
        let mut transcription = MockTranscriptionService::new();

        client
            .expect_send_text_message()
            .times(1)
            .returning(|_, _| sent());
        client
            .expect_get_media_url()
            .returning(|_| Ok("https://lookaside.fbsbx.com/M1".into()));
        client
            .expect_download_media()
            .returning(|_| Ok(b"audio".to_vec()));
        transcription
            .expect_transcribe_file()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("transcription service returned error status 500")));
        let (client, transcription) = boxed(client, transcription);

        let result = process_webhook(
            &message_payload(SENDER, json!({"audio": {"id": "M1"}})),
            &client,
            &transcription,
            &config::AppConfig::for_tests("http://localhost"),
        )
        .await;

        assert!(matches!(result, Err(WebhookError::ProcessingFailed(_))));
    }

    #[ntex::test]
    async fn test_failed_acknowledgement_stops_voice_flow() {
        let mut client = MockWhatsAppApi::new();

        client
            .expect_send_text_message()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("WhatsApp send message returned error status 401")));
        client.expect_get_media_url().never();
        let (client, transcription) = boxed(client, MockTranscriptionService::new());

        let result = process_webhook(
            &message_payload(SENDER, json!({"audio": {"id": "M1"}})),
            &client,
            &transcription,
            &config::AppConfig::for_tests("http://localhost"),
        )
        .await;

        assert!(matches!(result, Err(WebhookError::ProcessingFailed(_))));
    }

    #[ntex::test]
    async fn test_same_event_twice_is_handled_twice() {
        let mut client = MockWhatsAppApi::new();
        client
            .expect_send_text_message()
            .with(eq(SENDER.to_string()), eq(consts::BOT_INFO_MESSAGE.to_string()))
            .times(2)
            .returning(|_, _| sent());
        let (client, transcription) = boxed(client, MockTranscriptionService::new());
        let app_config = config::AppConfig::for_tests("http://localhost");
        let event = message_payload(SENDER, json!({"text": {"body": "hello"}}));

        for _ in 0..2 {
            assert!(
                process_webhook(&event, &client, &transcription, &app_config)
                    .await
                    .is_ok()
            );
        }
    }

    #[ntex::test]
    async fn test_voice_note_file_is_removed_after_transcription() {
        let mut client = MockWhatsAppApi::new();
        let mut transcription = MockTranscriptionService::new();
        let seen_path = std::sync::Arc::new(std::sync::Mutex::new(None));
        let seen_path_clone = seen_path.clone();

        client
            .expect_get_media_url()
            .returning(|_| Ok("https://lookaside.fbsbx.com/M1".into()));
        client
            .expect_download_media()
            .returning(|_| Ok(b"audio".to_vec()));
        client.expect_send_text_message().returning(|_, _| sent());
        transcription.expect_transcribe_file().returning(move |path| {
            *seen_path_clone.lock().unwrap() = Some(path);
            Ok("hola".into())
        });
        let (client, transcription) = boxed(client, transcription);

        handle_voice_message(
            "M1".into(),
            SENDER,
            &client,
            &transcription,
            &std::env::temp_dir(),
        )
        .await
        .unwrap();

        let path = seen_path.lock().unwrap().clone().unwrap();
        assert!(!path.exists());
    }
}
