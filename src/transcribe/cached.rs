use crate::cache::{hash_file, ResultCache};
use crate::error::{Result, TrimError};
use crate::transcribe::{Transcriber, Transcript};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Transcriber decorator that memoizes results by audio content hash.
///
/// Cache files are `{sha256(file bytes)}_{model}.json`.
pub struct CachedTranscriber {
    inner: Box<dyn Transcriber>,
    cache: ResultCache,
}

impl CachedTranscriber {
    pub fn new(inner: Box<dyn Transcriber>, cache: ResultCache) -> Self {
        Self { inner, cache }
    }

    async fn content_key(audio: &Path) -> Result<String> {
        let path: PathBuf = audio.to_path_buf();
        tokio::task::spawn_blocking(move || hash_file(&path))
            .await
            .map_err(|e| TrimError::Io(std::io::Error::other(format!("Hash task failed: {e}"))))?
    }
}

#[async_trait]
impl Transcriber for CachedTranscriber {
    async fn transcribe(&self, audio: &Path) -> Result<Transcript> {
        let key = Self::content_key(audio).await?;
        let kind = self.inner.model_id();

        if let Some(transcript) = self.cache.get::<Transcript>(&key, kind) {
            debug!("Using cached transcript for {}", audio.display());
            return Ok(transcript);
        }

        let transcript = self.inner.transcribe(audio).await?;

        // A failed cache write must not discard a finished transcription
        if let Err(e) = self.cache.put(&key, kind, &transcript) {
            warn!("Failed to cache transcript: {}", e);
        }

        Ok(transcript)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}
