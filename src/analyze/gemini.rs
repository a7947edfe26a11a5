//! Ad classification with the Gemini `generateContent` API.

use crate::analyze::{AdClassifier, Classification};
use crate::error::{Result, TrimError};
use crate::splice::Interval;
use crate::transcribe::Transcript;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The key travels in this header so it never appears in request URLs,
/// which reqwest includes in its error messages.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Maximum retries for API calls.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds).
const BASE_DELAY_MS: u64 = 1000;

pub struct GeminiClassifier {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    retry_delay_ms: u64,
}

impl GeminiClassifier {
    pub fn new(api_key: String, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            retry_delay_ms: BASE_DELAY_MS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Accepts both `gemini-flash-latest` and `models/gemini-flash-latest`.
    fn endpoint(&self) -> String {
        let model = self.model.trim_start_matches("models/");
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    fn build_prompt(transcript: &Transcript) -> String {
        format!(
            r#"You are an expert audio editor. Identify the advertisement segments in the following podcast transcript.
Each line of the transcript is formatted as: [start_time-end_time] text

Look for:
- The host reading a sponsor message ("This episode is brought to you by...", "Use code...", "Go to website.com").
- Pre-recorded ad spots (judge by content, the tone is not available).
- Breaks around sponsor content, even though you only have text.

Return a JSON list of objects, each with a "start" and "end" float value giving the start and end time of one ad block in seconds.
If there are no ads, return an empty list.

Example output:
[
    {{"start": 120.5, "end": 180.0}},
    {{"start": 450.0, "end": 510.5}}
]

Transcript:
{}"#,
            transcript.timestamped_text()
        )
    }

    async fn call_generate_content(&self, request: &GenerateContentRequest) -> Result<String> {
        let url = self.endpoint();
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = self.retry_delay_ms * 2u64.pow(attempt - 1);
                debug!("Retry attempt {} after {}ms delay", attempt, delay);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            let response = self
                .client
                .post(&url)
                .header(API_KEY_HEADER, &self.api_key)
                .header("Content-Type", "application/json")
                .json(request)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    debug!("Gemini API response status: {}", status);

                    if status.is_success() {
                        let body = resp.text().await?;
                        debug!("Gemini API response: {}", preview(&body));
                        let parsed: GenerateContentResponse = serde_json::from_str(&body)
                            .map_err(|e| {
                                TrimError::Analysis(format!("Malformed Gemini response: {e}"))
                            })?;
                        return Self::response_text(parsed);
                    }

                    let error_body = resp.text().await.unwrap_or_default();

                    // Don't retry on client errors
                    if status.is_client_error() {
                        return Err(TrimError::Api(format!(
                            "Gemini API error ({}): {}",
                            status, error_body
                        )));
                    }

                    warn!("Gemini API server error ({}): {}", status, error_body);
                    last_error = Some(TrimError::Api(format!(
                        "Gemini API server error: {}",
                        status
                    )));
                }
                Err(e) => {
                    warn!("Gemini API request failed: {}", e);
                    last_error = Some(e.into());
                }
            }
        }

        Err(last_error.unwrap_or_else(|| TrimError::Api("Unknown error".to_string())))
    }

    fn response_text(response: GenerateContentResponse) -> Result<String> {
        response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .ok_or_else(|| TrimError::Analysis("Gemini returned no candidates".to_string()))
    }
}

fn preview(text: &str) -> String {
    text.chars().take(500).collect()
}

/// Decode the model's answer into ad intervals. `None` when the text is not
/// a recognizable ad list.
pub fn parse_ad_list(text: &str) -> Option<Vec<Interval>> {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| {
        Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").expect("valid fence regex")
    });

    let body = fence
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or(text, |m| m.as_str());

    match serde_json::from_str::<AdPayload>(body).ok()? {
        AdPayload::List(ads) | AdPayload::Wrapped { ads } => Some(ads),
    }
}

#[async_trait]
impl AdClassifier for GeminiClassifier {
    async fn classify(&self, transcript: &Transcript) -> Result<Classification> {
        info!(
            "Analyzing {} transcript segments for ads using {}",
            transcript.segments.len(),
            self.model
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Self::build_prompt(transcript),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                temperature: Some(0.0),
            },
        };

        let text = self.call_generate_content(&request).await?;

        match parse_ad_list(&text) {
            Some(ads) => {
                debug!("Gemini reported {} ad segments", ads.len());
                Ok(Classification::new(ads))
            }
            None => {
                warn!(
                    "Error decoding JSON from Gemini response, treating as no ads: {}",
                    preview(&text)
                );
                Ok(Classification::degraded())
            }
        }
    }

    fn name(&self) -> &'static str {
        "Google Gemini"
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// Request/Response types

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    response_mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AdPayload {
    List(Vec<Interval>),
    Wrapped { ads: Vec<Interval> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcribe::TranscriptSegment;

    #[test]
    fn test_parse_plain_list() {
        let ads = parse_ad_list(r#"[{"start": 120.5, "end": 180.0}]"#).unwrap();
        assert_eq!(ads, vec![Interval { start: 120.5, end: 180.0 }]);
    }

    #[test]
    fn test_parse_empty_list() {
        assert_eq!(parse_ad_list("[]"), Some(Vec::new()));
    }

    #[test]
    fn test_parse_fenced_list() {
        let text = "```json\n[{\"start\": 1.0, \"end\": 2.0}]\n```";
        assert_eq!(
            parse_ad_list(text),
            Some(vec![Interval { start: 1.0, end: 2.0 }])
        );
    }

    #[test]
    fn test_parse_wrapped_object() {
        let ads = parse_ad_list(r#"{"ads": [{"start": 3.0, "end": 9.0}]}"#).unwrap();
        assert_eq!(ads.len(), 1);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_ad_list("Sorry, I cannot help with that.").is_none());
        assert!(parse_ad_list(r#"[{"begin": 1}]"#).is_none());
    }

    #[test]
    fn test_endpoint_strips_models_prefix() {
        let classifier = GeminiClassifier::new("key".to_string(), "models/gemini-flash-latest")
            .with_base_url("http://localhost:1234/v1beta/");
        assert_eq!(
            classifier.endpoint(),
            "http://localhost:1234/v1beta/models/gemini-flash-latest:generateContent"
        );
    }

    #[test]
    fn test_prompt_contains_timestamped_transcript() {
        let transcript = Transcript {
            segments: vec![TranscriptSegment {
                start: 10.0,
                end: 30.0,
                text: "This episode is sponsored by MattressCo.".to_string(),
            }],
            ..Default::default()
        };
        let prompt = GeminiClassifier::build_prompt(&transcript);
        assert!(prompt.contains("[10.00-30.00] This episode is sponsored by MattressCo."));
        assert!(prompt.contains(r#"{"start": 120.5, "end": 180.0}"#));
    }
}
