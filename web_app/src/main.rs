//! # WhatsApp Transcriber
//!
//! Webhook bridge between the WhatsApp Business Platform and an Azure OpenAI
//! Whisper deployment: voice notes sent by the configured recipient are
//! downloaded, transcribed and answered with the transcription text.

pub mod config;
pub mod consts;
pub mod logger;
pub mod metric;
pub mod services;
pub mod webhook;

use anyhow::Context;
use envconfig::Envconfig;
use logfire::config::{MetricsOptions, SendToLogfire};
use ntex::web;
use openssl::ssl::{SslAcceptor, SslFiletype, SslMethod};

#[ntex::main]
async fn main() -> anyhow::Result<()> {
    // Configuration is read once and handed to every worker
    let app_config =
        config::AppConfig::init_from_env().context("failed to load app config from environment")?;

    // Initialize logging and metrics
    let mut logfire_config = logfire::configure()
        .install_panic_handler()
        .with_metrics(Some(MetricsOptions::default()))
        .send_to_logfire(SendToLogfire::IfTokenPresent);
    if let Some(token) = &app_config.logfire_token {
        logfire_config = logfire_config.with_token(token);
    }
    let shutdown_handler = logfire_config.finish()?;

    if let Err(e) = logger::setup_simple_logger() {
        logfire::warn!(
            "Access log disabled, logger already set: {error}",
            error = e.to_string()
        );
    }

    let whatsapp_client = webhook::whatsapp::client::WhatsAppClient::new(&app_config)?;
    let transcription_service = services::transcription::AzureWhisperHandler::new(&app_config)?;

    configure_and_run_server(app_config, whatsapp_client, transcription_service).await?;

    shutdown_handler.shutdown()?;

    Ok(())
}

/// Configures SSL acceptor for production environments
fn setup_ssl_acceptor(
    app_config: &config::AppConfig,
) -> anyhow::Result<openssl::ssl::SslAcceptorBuilder> {
    let mut ssl_acceptor = SslAcceptor::mozilla_intermediate(SslMethod::tls_server())
        .map_err(|e| anyhow::anyhow!("Failed to create SSL acceptor: {}", e))?;

    ssl_acceptor
        .set_private_key_file(&app_config.private_key_path, SslFiletype::PEM)
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to load private key from {}: {}",
                app_config.private_key_path,
                e
            )
        })?;

    ssl_acceptor
        .set_certificate_file(&app_config.certificate_path, SslFiletype::PEM)
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to load certificate from {}: {}",
                app_config.certificate_path,
                e
            )
        })?;

    Ok(ssl_acceptor)
}

/// Creates application state from the provided services
fn create_app_state(
    app_config: config::AppConfig,
    whatsapp_client: webhook::whatsapp::client::WhatsAppClient,
    transcription_service: services::transcription::AzureWhisperHandler,
) -> webhook::AppState {
    webhook::AppState {
        app_config,
        whatsapp_client: Box::new(whatsapp_client),
        transcription_service: Box::new(transcription_service),
    }
}

/// Configures and starts the web server with appropriate SSL settings
async fn configure_and_run_server(
    app_config: config::AppConfig,
    whatsapp_client: webhook::whatsapp::client::WhatsAppClient,
    transcription_service: services::transcription::AzureWhisperHandler,
) -> anyhow::Result<()> {
    let server_addr = (
        app_config.web_server_host.clone(),
        app_config.web_server_port,
    );
    let is_prod = app_config.is_prod();
    let ssl_acceptor = if is_prod {
        Some(setup_ssl_acceptor(&app_config)?)
    } else {
        None
    };

    logfire::info!(
        "Starting webhook server on {host}:{port}",
        host = server_addr.0.clone(),
        port = server_addr.1.to_string()
    );

    let server = web::server(move || {
        web::App::new()
            .wrap(web::middleware::Logger::default())
            .state(create_app_state(
                app_config.clone(),
                whatsapp_client.clone(),
                transcription_service.clone(),
            ))
            .configure(webhook::routes::whatsapp)
            .default_service(web::route().to(webhook::routes::serve_not_found))
    });

    let bound_server = match ssl_acceptor {
        Some(ssl_acceptor) => server.bind_openssl(server_addr, ssl_acceptor)?,
        None => server.bind(server_addr)?,
    };

    bound_server
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
