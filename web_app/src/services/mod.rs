pub mod transcription;
pub mod voice_note;

use async_trait::async_trait;
use std::path::PathBuf;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptionService {
    /// Transcribes the audio file at `audio_path`. An empty string means the
    /// service heard nothing worth replying with.
    async fn transcribe_file(&self, audio_path: PathBuf) -> anyhow::Result<String>;
}

pub type ImplTranscriptionService = Box<dyn TranscriptionService + Send + Sync>;
