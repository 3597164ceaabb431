//! WhatsApp webhook endpoint handlers
//!
//! Both endpoints share the same path; the HTTP method selects between the
//! verification handshake (GET) and event delivery (POST).
//!
//! # Security
//!
//! When `WHATSAPP_APP_SECRET` is configured the POST endpoint rejects any body
//! whose `X-Hub-Signature-256` header does not match before parsing it.

use super::{handler, security};
use crate::{
    consts,
    webhook::{AppState, errors::WebhookError},
};
use ntex::{util::Bytes, web};
use serde::Deserialize;

/// Query parameters for webhook verification
///
/// All optional: a missing parameter is a bad request, not an extractor error.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    /// The mode parameter, should be "subscribe"
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    /// The verification token from WhatsApp
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    /// The challenge string to echo back
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Webhook verification endpoint (GET)
///
/// # Returns
/// - 200 with challenge string if verification succeeds
/// - 403 if mode or token do not match
/// - 400 if mode or token are missing
#[web::get("")]
pub async fn verify(
    query: web::types::Query<VerifyQuery>,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    let challenge =
        handler::verify_subscription(&query, &app_state.app_config.whatsapp_verify_token)?;

    logfire::info!("Webhook verification successful");

    Ok(web::HttpResponse::Ok()
        .content_type("text/plain")
        .body(challenge))
}

/// Webhook receiver endpoint (POST)
///
/// Processed synchronously: the response is only written once every
/// outbound call for the event has finished.
///
/// # Returns
/// - 200 "OK" for status updates and handled (or dropped) messages
/// - 404 if the body is not a WhatsApp message event
/// - 500 if handling the message failed
#[web::post("")]
pub async fn receive(
    req: web::HttpRequest,
    body: Bytes,
    app_state: web::types::State<AppState>,
) -> Result<impl web::Responder, web::Error> {
    if let Some(app_secret) = &app_state.app_config.whatsapp_app_secret {
        let signature_header = req
            .headers()
            .get(consts::HUB_SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok());

        if let Err(e) = security::verify_request_signature(signature_header, &body[..], app_secret)
        {
            logfire::warn!(
                "Webhook signature verification failed: {error}",
                error = e.to_string()
            );
            return Err(WebhookError::InvalidSignature.into());
        }
    }

    let payload = handler::parse_payload(&body[..])?;

    handler::process_webhook(
        &payload,
        &app_state.whatsapp_client,
        &app_state.transcription_service,
        &app_state.app_config,
    )
    .await?;

    Ok(web::HttpResponse::Ok().content_type("text/plain").body("OK"))
}
