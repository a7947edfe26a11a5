use thiserror::Error;

/// Pipeline stage in which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Transcribing,
    Analyzing,
    Splicing,
    Rendering,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Transcribing => write!(f, "Transcription"),
            Stage::Analyzing => write!(f, "Ad analysis"),
            Stage::Splicing => write!(f, "Splicing"),
            Stage::Rendering => write!(f, "Rendering"),
        }
    }
}

#[derive(Error, Debug)]
pub enum TrimError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Ad analysis failed: {0}")]
    Analysis(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Nothing to render: segment list is empty")]
    NothingToRender,

    #[error("Invalid interval [{start}, {end}): {reason}")]
    InvalidInterval { start: f64, end: f64, reason: String },

    #[error("Pipeline cancelled")]
    Cancelled,

    #[error("{stage} failed: {cause}")]
    Stage { stage: Stage, cause: Box<TrimError> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TrimError {
    /// Attach the failing stage to an error. Already-qualified errors are kept as-is.
    pub fn at(self, stage: Stage) -> Self {
        match self {
            TrimError::Stage { .. } => self,
            other => TrimError::Stage {
                stage,
                cause: Box::new(other),
            },
        }
    }

    /// The underlying error without its stage qualification.
    pub fn root(&self) -> &TrimError {
        match self {
            TrimError::Stage { cause, .. } => cause,
            other => other,
        }
    }

    /// The stage this error was raised in, if known.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            TrimError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TrimError>;
