use crate::{config, consts};
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;

/// Azure OpenAI Whisper deployment
#[derive(Clone)]
pub struct AzureWhisperHandler {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

impl AzureWhisperHandler {
    pub fn new(app_config: &config::AppConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(consts::OUTBOUND_REQUEST_TIMEOUT)
            .build()
            .context("failed to build transcription http client")?;

        Ok(Self {
            client,
            endpoint: app_config.azure_transcriptions_endpoint(),
            api_key: app_config.azure_openai_api_key.clone(),
            model: app_config.azure_openai_whisper_deployment.clone(),
        })
    }
}

#[async_trait]
impl crate::services::TranscriptionService for AzureWhisperHandler {
    async fn transcribe_file(&self, audio_path: PathBuf) -> anyhow::Result<String> {
        let audio = tokio::fs::read(&audio_path)
            .await
            .with_context(|| format!("failed to read voice note {}", audio_path.display()))?;

        let file_name = audio_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| {
                format!(
                    "{}.{}",
                    consts::VOICE_NOTE_FILE_PREFIX,
                    consts::VOICE_NOTE_EXTENSION
                )
            });

        let file_part = reqwest::multipart::Part::bytes(audio)
            .file_name(file_name)
            .mime_str(consts::VOICE_NOTE_MIME_TYPE)?;

        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "json")
            .part("file", file_part);

        let response = self
            .client
            .post(&self.endpoint)
            .header("api-key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .context("Failed to send audio to transcription service")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());

            anyhow::bail!(
                "transcription service returned error status {}: {}",
                status,
                body
            );
        }

        let transcription: TranscriptionResponse = response
            .json()
            .await
            .context("Failed to parse transcription response")?;

        Ok(transcription.text)
    }
}
