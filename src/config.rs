use crate::error::{Result, TrimError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_WHISPER_MODEL: &str = "whisper-1";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-flash-latest";
pub const DEFAULT_CACHE_DIR: &str = ".cache";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    /// Transcription model identifier. Also names the transcript cache kind.
    pub whisper_model: String,
    /// Classifier model identifier. Part of the ad-analysis cache key.
    pub gemini_model: String,
    pub cache_dir: PathBuf,
    pub use_cache: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            gemini_api_key: None,
            whisper_model: DEFAULT_WHISPER_MODEL.to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            use_cache: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                if let Ok(file_config) = toml::from_str::<Config>(&contents) {
                    config = file_config;
                }
            }
        }

        // Override with environment variables
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.openai_api_key = Some(key);
        }
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            config.gemini_api_key = Some(key);
        }
        if let Ok(model) = std::env::var("PODTRIM_WHISPER_MODEL") {
            config.whisper_model = model;
        }
        if let Ok(model) = std::env::var("PODTRIM_GEMINI_MODEL") {
            config.gemini_model = model;
        }
        if let Ok(dir) = std::env::var("PODTRIM_CACHE_DIR") {
            config.cache_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    /// Both backends need credentials; fail here rather than at the first request.
    pub fn validate(&self) -> Result<()> {
        if self.openai_api_key.as_deref().map_or(true, str::is_empty) {
            return Err(TrimError::Config(
                "OPENAI_API_KEY not set. Export it with: export OPENAI_API_KEY=sk-...".to_string(),
            ));
        }

        if self.gemini_api_key.as_deref().map_or(true, str::is_empty) {
            return Err(TrimError::Config(
                "GEMINI_API_KEY not set. Pass --api_key or get one at https://aistudio.google.com/apikey"
                    .to_string(),
            ));
        }

        if self.whisper_model.trim().is_empty() || self.gemini_model.trim().is_empty() {
            return Err(TrimError::Config(
                "Model identifiers must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("podtrim").join("config.toml"))
    }
}
