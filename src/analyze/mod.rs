pub mod cached;
pub mod gemini;

pub use cached::{analysis_key, CachedClassifier};
pub use gemini::GeminiClassifier;

use crate::error::Result;
use crate::splice::Interval;
use crate::transcribe::Transcript;
use async_trait::async_trait;

/// Classifier output.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Classification {
    /// Ad intervals in whatever order the backend produced them.
    pub ads: Vec<Interval>,
    /// The backend answered but its payload could not be decoded. `ads` is
    /// empty and the result must not be cached.
    pub degraded: bool,
}

impl Classification {
    pub fn new(ads: Vec<Interval>) -> Self {
        Self {
            ads,
            degraded: false,
        }
    }

    pub fn degraded() -> Self {
        Self {
            ads: Vec::new(),
            degraded: true,
        }
    }
}

#[async_trait]
pub trait AdClassifier: Send + Sync {
    async fn classify(&self, transcript: &Transcript) -> Result<Classification>;
    fn name(&self) -> &'static str;
    /// Model identifier; part of the analysis cache key.
    fn model_id(&self) -> &str;
}
