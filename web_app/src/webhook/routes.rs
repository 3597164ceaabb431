use crate::consts;
use ntex::web;

/// Configures the WhatsApp webhook routes.
///
/// These routes are public endpoints; requests are authenticated by the
/// verify token, the optional payload signature and the sender check.
///
/// # Routes
/// - `GET /webhook/whatsapp` - WhatsApp webhook verification
/// - `POST /webhook/whatsapp` - WhatsApp webhook receiver
pub fn whatsapp(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope(consts::WHATSAPP_WEBHOOK_PATH)
            .service((super::whatsapp::verify, super::whatsapp::receive)),
    );
}

/// Plain 404 for urls not defined
pub async fn serve_not_found() -> web::HttpResponse {
    web::HttpResponse::NotFound()
        .content_type("text/plain")
        .body("Not Found")
}
