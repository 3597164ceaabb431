//! # WhatsApp API Client
//!
//! This module provides a client for the WhatsApp Business API.
//! It handles authentication, text message sending and voice note retrieval.

use super::outgoing_schemas::{MediaUrlResponse, OutgoingTextMessage, WhatsAppMessageResponse};
use crate::{config, consts};
use anyhow::{Context, Result};
use async_trait::async_trait;

/// Operations the webhook needs from the WhatsApp Business API
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WhatsAppApi {
    /// Sends a text message to `to`
    async fn send_text_message(&self, to: String, body: String)
    -> Result<WhatsAppMessageResponse>;

    /// Resolves a media id into its temporary download url
    async fn get_media_url(&self, media_id: String) -> Result<String>;

    /// Downloads the binary content behind a url returned by [`WhatsAppApi::get_media_url`]
    async fn download_media(&self, url: String) -> Result<Vec<u8>>;
}

pub type ImplWhatsAppApi = Box<dyn WhatsAppApi + Send + Sync>;

/// WhatsApp API client for sending messages and downloading media
#[derive(Clone)]
pub struct WhatsAppClient {
    /// HTTP client for making API requests
    client: reqwest::Client,
    /// WhatsApp Business API endpoint for sending messages
    send_msg_endpoint: String,
    /// Versioned Graph API root, media ids are resolved under it
    graph_api_root: String,
    /// Bearer token for every Graph API call
    auth_token: String,
}

impl WhatsAppClient {
    /// Creates a new WhatsApp client
    pub fn new(app_config: &config::AppConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(consts::OUTBOUND_REQUEST_TIMEOUT)
            .build()
            .context("failed to build WhatsApp http client")?;

        Ok(Self {
            client,
            send_msg_endpoint: app_config.whatsapp_send_msg_endpoint(),
            graph_api_root: app_config.graph_api_root(),
            auth_token: app_config.whatsapp_business_auth.clone(),
        })
    }

    /// Fails with the response body when the API answers a non 2xx status
    async fn ensure_success(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response body".to_string());

        logfire::error!(
            "Request failed: {action} returned {status}",
            action = action.to_string(),
            status = status.to_string()
        );
        anyhow::bail!("WhatsApp {} returned error status {}: {}", action, status, body);
    }
}

#[async_trait]
impl WhatsAppApi for WhatsAppClient {
    async fn send_text_message(
        &self,
        to: String,
        body: String,
    ) -> Result<WhatsAppMessageResponse> {
        let message = OutgoingTextMessage::new(to, body);

        let response = self
            .client
            .post(&self.send_msg_endpoint)
            .bearer_auth(&self.auth_token)
            .header("Content-Type", "application/json")
            .json(&message)
            .send()
            .await
            .context("Failed to send request to WhatsApp API")?;

        Self::ensure_success(response, "send message")
            .await?
            .json()
            .await
            .context("Failed to parse WhatsApp API response")
    }

    async fn get_media_url(&self, media_id: String) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/{}", self.graph_api_root, media_id))
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .with_context(|| format!("Failed to look up WhatsApp media {media_id}"))?;

        let media: MediaUrlResponse = Self::ensure_success(response, "media lookup")
            .await?
            .json()
            .await
            .context("Failed to parse WhatsApp media lookup response")?;

        logfire::info!(
            "Resolved media {media_id} ({mime_type}, {file_size} bytes)",
            media_id = media_id,
            mime_type = media.mime_type.unwrap_or_default(),
            file_size = media.file_size.unwrap_or_default().to_string()
        );

        Ok(media.url)
    }

    async fn download_media(&self, url: String) -> Result<Vec<u8>> {
        // reqwest follows redirects by default
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .context("Failed to download WhatsApp media")?;

        let bytes = Self::ensure_success(response, "media download")
            .await?
            .bytes()
            .await
            .context("Failed to read WhatsApp media body")?;

        Ok(bytes.to_vec())
    }
}
