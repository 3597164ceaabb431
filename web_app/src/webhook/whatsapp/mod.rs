//! WhatsApp webhook integration module
//!
//! ## Submodules
//!
//! - [`handler`] - Verification, validation, routing and voice note transcription
//! - [`routes`] - HTTP endpoint handlers for the WhatsApp webhook
//! - [`schemas`] - Incoming webhook payloads
//! - [`outgoing_schemas`] - Payloads sent to the WhatsApp Business API
//! - [`client`] - WhatsApp API client for sending messages and fetching media
//! - [`security`] - `X-Hub-Signature-256` verification

pub mod client;
pub mod handler;
pub mod outgoing_schemas;
pub mod routes;
pub mod schemas;
pub mod security;

pub use routes::{receive, verify};
