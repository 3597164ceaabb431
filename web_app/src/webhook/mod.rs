//! Webhook handlers for external integrations
//!
//! - [`whatsapp`] - WhatsApp Business API webhook handlers

pub mod errors;
pub mod routes;
pub mod whatsapp;

use crate::{config, services};

/// Shared state for every worker of the web server
pub struct AppState {
    pub app_config: config::AppConfig,
    pub whatsapp_client: whatsapp::client::ImplWhatsAppApi,
    pub transcription_service: services::ImplTranscriptionService,
}
