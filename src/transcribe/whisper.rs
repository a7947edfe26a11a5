use crate::error::{Result, TrimError};
use crate::transcribe::{Transcriber, Transcript, TranscriptSegment};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

/// OpenAI-compatible API root.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Maximum upload size for the transcription endpoint (25 MB).
const MAX_FILE_SIZE: usize = 25 * 1024 * 1024;

/// Maximum retries for API calls.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds).
const BASE_DELAY_MS: u64 = 1000;

/// Whisper transcription client.
pub struct WhisperClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    retry_delay_ms: u64,
}

enum Failure {
    Retry(TrimError),
    Fatal(TrimError),
}

impl WhisperClient {
    pub fn new(api_key: String, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            retry_delay_ms: BASE_DELAY_MS,
        }
    }

    /// Point the client at a different API root (proxies, local servers, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    async fn build_form(&self, audio_path: &Path) -> Result<Form> {
        let file_bytes = fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let mime_type = match audio_path.extension().and_then(|e| e.to_str()) {
            Some("wav") => "audio/wav",
            Some("mp3") => "audio/mpeg",
            Some("m4a") => "audio/mp4",
            Some("flac") => "audio/flac",
            Some("ogg") => "audio/ogg",
            Some("webm") => "audio/webm",
            _ => "application/octet-stream",
        };

        let file_part = Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str(mime_type)?;

        Ok(Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment"))
    }

    async fn call_api(&self, form: Form) -> std::result::Result<WhisperResponse, Failure> {
        let url = format!("{}/audio/transcriptions", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| Failure::Retry(e.into()))?;

        let status = response.status();
        debug!("Whisper API response status: {}", status);

        if status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| Failure::Retry(e.into()))?;
            return serde_json::from_str(&body).map_err(|e| {
                Failure::Fatal(TrimError::Transcription(format!(
                    "Malformed Whisper response: {e}"
                )))
            });
        }

        let error_body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ApiErrorResponse>(&error_body) {
            Ok(api_error) => format!(
                "Whisper API error ({}): {} ({})",
                status, api_error.error.message, api_error.error.r#type
            ),
            Err(_) => format!("Whisper API error ({}): {}", status, error_body),
        };

        // Client errors will not fix themselves on retry
        if status.is_client_error() {
            Err(Failure::Fatal(TrimError::Api(message)))
        } else {
            Err(Failure::Retry(TrimError::Api(message)))
        }
    }

    /// Rebuilds the multipart form on each attempt since sending consumes it.
    async fn transcribe_with_retry(&self, audio: &Path) -> Result<WhisperResponse> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = self.retry_delay_ms * 2u64.pow(attempt - 1);
                debug!("Retry attempt {} after {}ms delay", attempt, delay);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            let form = self.build_form(audio).await?;

            match self.call_api(form).await {
                Ok(response) => return Ok(response),
                Err(Failure::Fatal(e)) => return Err(e),
                Err(Failure::Retry(e)) => {
                    warn!("Attempt {} failed: {}", attempt + 1, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| TrimError::Api("Unknown error".to_string())))
    }

    fn parse_response(&self, response: WhisperResponse) -> Transcript {
        let segments = match response.segments {
            Some(api_segments) => api_segments
                .into_iter()
                .map(|seg| TranscriptSegment {
                    start: seg.start,
                    end: seg.end,
                    text: seg.text.trim().to_string(),
                })
                .collect(),
            None if !response.text.trim().is_empty() => vec![TranscriptSegment {
                start: 0.0,
                end: response.duration.unwrap_or(0.0),
                text: response.text.trim().to_string(),
            }],
            None => Vec::new(),
        };

        Transcript {
            segments,
            text: response.text,
            language: response.language,
        }
    }
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(&self, audio: &Path) -> Result<Transcript> {
        let metadata = fs::metadata(audio).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => TrimError::FileNotFound(audio.display().to_string()),
            _ => TrimError::Io(e),
        })?;

        if metadata.len() as usize > MAX_FILE_SIZE {
            return Err(TrimError::Transcription(format!(
                "File too large for Whisper API: {} bytes (max {} bytes)",
                metadata.len(),
                MAX_FILE_SIZE
            )));
        }

        info!("Transcribing {} with {} (this may take a while)...", audio.display(), self.model);
        let response = self.transcribe_with_retry(audio).await?;
        let transcript = self.parse_response(response);

        debug!("Whisper returned {} segments", transcript.segments.len());
        Ok(transcript)
    }

    fn name(&self) -> &'static str {
        "OpenAI Whisper"
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// API response types

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    segments: Option<Vec<WhisperSegment>>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    r#type: String,
}
