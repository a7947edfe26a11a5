pub mod cached;
pub mod whisper;

pub use cached::CachedTranscriber;
pub use whisper::WhisperClient;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Ordered transcript segments. This is also the transcript cache document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Transcript {
    pub segments: Vec<TranscriptSegment>,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Transcript {
    /// Canonical `[start-end] text` rendering, one segment per line.
    ///
    /// This exact text is what the classifier sees and what the ad-analysis
    /// cache key is derived from.
    pub fn timestamped_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| format!("[{:.2}-{:.2}] {}\n", s.start, s.end, s.text))
            .collect()
    }
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<Transcript>;
    fn name(&self) -> &'static str;
    /// Model identifier; distinguishes transcripts of the same file in the cache.
    fn model_id(&self) -> &str;
}
