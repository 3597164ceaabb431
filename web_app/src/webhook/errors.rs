use derive_more::{Display, Error};
use log::{error, warn};
use ntex::{http, web};

/// Errors surfaced to whoever called the webhook.
///
/// The response body is always the fixed display text; details only reach the logs.
#[derive(Debug, Display, Error)]
pub enum WebhookError {
    #[display("Missing parameters")]
    MissingParameters,
    #[display("Verification failed")]
    VerificationFailed,
    #[display("Invalid signature")]
    InvalidSignature,
    #[display("Not a WhatsApp API event")]
    NotWhatsAppEvent,
    #[display("Error processing message")]
    ProcessingFailed(#[error(not(source))] String),
}

impl web::error::WebResponseError for WebhookError {
    fn error_response(&self, _: &web::HttpRequest) -> web::HttpResponse {
        match self {
            WebhookError::ProcessingFailed(details) => {
                error!("Error processing message: {}", details)
            }
            _ => warn!("{:?}", self),
        }

        web::HttpResponse::build(self.status_code())
            .set_header("content-type", "text/plain; charset=utf-8")
            .body(self.to_string())
    }

    fn status_code(&self) -> http::StatusCode {
        match *self {
            WebhookError::MissingParameters => http::StatusCode::BAD_REQUEST,
            WebhookError::VerificationFailed | WebhookError::InvalidSignature => {
                http::StatusCode::FORBIDDEN
            }
            WebhookError::NotWhatsAppEvent => http::StatusCode::NOT_FOUND,
            WebhookError::ProcessingFailed(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
