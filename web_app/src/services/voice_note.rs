//! Transient storage for downloaded voice notes.
//!
//! Each voice note gets its own file so concurrent requests never write to
//! the same path. [`VoiceNoteFile::remove`] deletes it once it is no longer
//! needed; dropping the guard without calling it removes the file as well.

use crate::consts;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

#[derive(Debug)]
pub struct VoiceNoteFile {
    path: PathBuf,
}

impl VoiceNoteFile {
    /// Writes `audio` in full to a new uniquely named file inside `dir`
    pub async fn persist(dir: &Path, audio: &[u8]) -> anyhow::Result<Self> {
        let voice_note = Self {
            path: dir.join(format!(
                "{}_{}.{}",
                consts::VOICE_NOTE_FILE_PREFIX,
                uuid::Uuid::new_v4(),
                consts::VOICE_NOTE_EXTENSION
            )),
        };

        // the guard exists before the file so a failed write is cleaned up too
        let mut file = tokio::fs::File::create(&voice_note.path)
            .await
            .with_context(|| format!("failed to create {}", voice_note.path.display()))?;
        file.write_all(audio)
            .await
            .with_context(|| format!("failed to write {}", voice_note.path.display()))?;
        file.flush()
            .await
            .with_context(|| format!("failed to flush {}", voice_note.path.display()))?;

        Ok(voice_note)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the file without blocking the worker thread
    pub async fn remove(mut self) -> anyhow::Result<()> {
        let path = std::mem::take(&mut self.path);

        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("failed to remove voice note {}", path.display()))
    }
}

impl Drop for VoiceNoteFile {
    fn drop(&mut self) {
        // already removed
        if self.path.as_os_str().is_empty() {
            return;
        }

        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                logfire::warn!(
                    "Failed to remove voice note {path}: {error}",
                    path = self.path.display().to_string(),
                    error = e.to_string()
                );
            }
        }
    }
}
