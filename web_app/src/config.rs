//! Application configuration management with security considerations.
//!
//! All values are read from the environment once at startup and then carried
//! around as an immutable [`AppConfig`] inside the web application state.
//!
//! # Security Notes
//! - Sensitive fields are clearly marked and should never be logged
//! - Production environments should use secure secret management systems

use envconfig::Envconfig;

/// Application configuration with security-aware field management.
///
/// Sensitive fields are clearly marked and include security guidance.
#[derive(Envconfig, Clone)]
pub struct AppConfig {
    /// Environment name to deploy the app (NON-SENSITIVE)
    /// Values: "local", "dev", "prod"
    #[envconfig(default = "local")]
    pub env: String,

    /// Host address for web server binding (NON-SENSITIVE)
    #[envconfig(default = "0.0.0.0")]
    pub web_server_host: String,

    /// Port for web server binding (NON-SENSITIVE)
    #[envconfig(default = "8080")]
    pub web_server_port: u16,

    /// Path to SSL private key file (SENSITIVE PATH)
    /// Security: File should have 600 permissions
    #[envconfig(default = "server.key")]
    pub private_key_path: String,

    /// Path to SSL certificate file (NON-SENSITIVE)
    #[envconfig(default = "server.crt")]
    pub certificate_path: String,

    /// 🔒 SENSITIVE: Logfire write token. Telemetry is only exported when set.
    pub logfire_token: Option<String>,

    /// 🔒 SENSITIVE: Shared secret echoed by Meta during webhook verification
    pub whatsapp_verify_token: String,

    /// 🔒 SENSITIVE: WhatsApp Business authentication token (bearer)
    /// Security: Store in secure secret management system
    pub whatsapp_business_auth: String,

    /// WhatsApp ID allowed to use the bot (SEMI-SENSITIVE)
    /// Messages from any other sender are dropped.
    pub whatsapp_recipient_waid: String,

    /// Graph API version used in every WhatsApp URL (NON-SENSITIVE)
    #[envconfig(default = "v22.0")]
    pub whatsapp_api_version: String,

    /// WhatsApp Business phone number ID (SEMI-SENSITIVE)
    /// Security: Restrict access, don't log in production
    pub whatsapp_business_phone_number_id: u64,

    /// 🔒 SENSITIVE: Meta app secret. When set, `X-Hub-Signature-256` is
    /// checked on every incoming event.
    pub whatsapp_app_secret: Option<String>,

    /// Graph API base URL (NON-SENSITIVE)
    #[envconfig(default = "https://graph.facebook.com")]
    pub graph_api_base_url: String,

    /// Azure OpenAI resource endpoint (NON-SENSITIVE)
    /// Example: "https://my-resource.openai.azure.com"
    #[envconfig(from = "AZURE_OPENAI_ENDPOINT")]
    pub azure_openai_endpoint: String,

    /// 🔒 SENSITIVE: Azure OpenAI api key
    #[envconfig(from = "AZURE_OPENAI_API_KEY")]
    pub azure_openai_api_key: String,

    /// Azure OpenAI REST api version (NON-SENSITIVE)
    #[envconfig(from = "AZURE_OPENAI_API_VERSION", default = "2024-06-01")]
    pub azure_openai_api_version: String,

    /// Name of the Whisper deployment in the Azure resource (NON-SENSITIVE)
    #[envconfig(from = "AZURE_OPENAI_WHISPER_DEPLOYMENT", default = "whisper-1")]
    pub azure_openai_whisper_deployment: String,

    /// Directory where downloaded voice notes live while being transcribed
    #[envconfig(default = "/tmp")]
    pub voice_notes_dir: String,
}

impl AppConfig {
    /// Checks if running in production environment
    pub fn is_prod(&self) -> bool {
        self.env.to_lowercase() == "prod"
    }

    /// Graph API root including the version, e.g. `https://graph.facebook.com/v22.0`
    pub fn graph_api_root(&self) -> String {
        format!(
            "{base}/{version}",
            base = self.graph_api_base_url.trim_end_matches('/'),
            version = self.whatsapp_api_version
        )
    }

    /// Constructs the WhatsApp Business API endpoint for sending messages
    pub fn whatsapp_send_msg_endpoint(&self) -> String {
        format!(
            "{root}/{id}/messages",
            root = self.graph_api_root(),
            id = self.whatsapp_business_phone_number_id
        )
    }

    /// Constructs the Azure OpenAI audio transcription endpoint
    pub fn azure_transcriptions_endpoint(&self) -> String {
        format!(
            "{endpoint}/openai/deployments/{deployment}/audio/transcriptions?api-version={version}",
            endpoint = self.azure_openai_endpoint.trim_end_matches('/'),
            deployment = self.azure_openai_whisper_deployment,
            version = self.azure_openai_api_version
        )
    }
}

#[cfg(test)]
impl AppConfig {
    /// Configuration pointing every external service at `base_url`.
    pub fn for_tests(base_url: &str) -> Self {
        Self {
            env: "local".into(),
            web_server_host: "127.0.0.1".into(),
            web_server_port: 8080,
            private_key_path: "server.key".into(),
            certificate_path: "server.crt".into(),
            logfire_token: None,
            whatsapp_verify_token: "verify-secret".into(),
            whatsapp_business_auth: "graph-token".into(),
            whatsapp_recipient_waid: "5215512345678".into(),
            whatsapp_api_version: "v22.0".into(),
            whatsapp_business_phone_number_id: 1234567890,
            whatsapp_app_secret: None,
            graph_api_base_url: base_url.into(),
            azure_openai_endpoint: base_url.into(),
            azure_openai_api_key: "azure-key".into(),
            azure_openai_api_version: "2024-06-01".into(),
            azure_openai_whisper_deployment: "whisper-1".into(),
            voice_notes_dir: std::env::temp_dir().to_string_lossy().into_owned(),
        }
    }
}
