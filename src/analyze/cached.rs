use crate::analyze::{AdClassifier, Classification};
use crate::cache::{hash_text, ResultCache};
use crate::error::Result;
use crate::splice::Interval;
use crate::transcribe::Transcript;
use async_trait::async_trait;
use tracing::{debug, warn};

const ADS_KIND: &str = "ads";

/// Cache key for an ad analysis: the timestamped transcript text followed
/// by the classifier model identifier.
pub fn analysis_key(transcript: &Transcript, model_id: &str) -> String {
    let mut content = transcript.timestamped_text();
    content.push_str(model_id);
    hash_text(&content)
}

/// Classifier decorator that memoizes results in `{key}_ads.json`.
pub struct CachedClassifier {
    inner: Box<dyn AdClassifier>,
    cache: ResultCache,
}

impl CachedClassifier {
    pub fn new(inner: Box<dyn AdClassifier>, cache: ResultCache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl AdClassifier for CachedClassifier {
    async fn classify(&self, transcript: &Transcript) -> Result<Classification> {
        let key = analysis_key(transcript, self.inner.model_id());

        if let Some(ads) = self.cache.get::<Vec<Interval>>(&key, ADS_KIND) {
            debug!("Using cached ad analysis ({} ads)", ads.len());
            return Ok(Classification::new(ads));
        }

        let classification = self.inner.classify(transcript).await?;

        if classification.degraded {
            debug!("Not caching undecodable classifier output");
        } else if let Err(e) = self.cache.put(&key, ADS_KIND, &classification.ads) {
            warn!("Failed to cache ad analysis: {}", e);
        }

        Ok(classification)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}
