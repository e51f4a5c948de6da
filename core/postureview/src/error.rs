use thiserror::Error;

/// Errors raised while ingesting and re-encoding a photo.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to decode image: {0}")]
    DecodeError(String),

    #[error("image dimensions are zero")]
    ZeroDimensions,

    #[error("failed to encode image: {0}")]
    EncodeError(String),

    #[error("quality must be between 0.0 and 1.0, got {0}")]
    InvalidQuality(f32),

    #[error("max dimension must be > 0")]
    InvalidMaxDimension,

    #[error("malformed data URL: {0}")]
    InvalidDataUrl(String),
}

/// Failures of the external analysis call.
///
/// Only [`AnalysisError::TransientFailure`] is retried by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("API credential is missing or malformed")]
    MissingCredential,

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("model response does not match the analysis contract: {0}")]
    InvalidResponseFormat(String),

    #[error("request quota exhausted, try again later")]
    RateLimited,

    #[error("transient failure: {0}")]
    TransientFailure(String),

    #[error("request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl AnalysisError {
    /// Network and server-side failures that may succeed on another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AnalysisError::TransientFailure(_))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AnalysisError::RateLimited)
    }

    /// Classify an HTTP status returned by the collaborator.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            429 => AnalysisError::RateLimited,
            408 | 500..=599 => AnalysisError::TransientFailure(format!("HTTP {status}: {message}")),
            _ => AnalysisError::Rejected { status, message },
        }
    }
}

/// Errors raised while assembling a before/after comparison scene.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComparisonError {
    #[error("missing {0} photo for the active view")]
    MissingPhoto(&'static str),
}

/// Errors raised by the in-memory session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("an analysis is already in progress")]
    AnalysisPending,

    #[error("no analysis is in progress")]
    NotPending,

    #[error("session already has an analysis outcome; reset to start over")]
    AnalysisFinished,

    #[error("missing {0} photo")]
    MissingPhoto(String),

    #[error("photo is not a usable data URL: {0}")]
    InvalidPhoto(String),

    #[error("no analysis result to display")]
    NoResult,

    #[error(transparent)]
    Display(#[from] ComparisonError),
}

/// Errors raised while loading analyzer configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
