use std::fmt;
use thiserror::Error;

/// Which of the two documents in a comparison an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentSide {
    Reference,
    Candidate,
}

impl fmt::Display for DocumentSide {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DocumentSide::Reference => write!(f, "reference"),
            DocumentSide::Candidate => write!(f, "candidate"),
        }
    }
}

/// Fatal errors: any of these aborts a verification run.
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Insufficient content in {side} document: {length} characters extracted")]
    InsufficientContent { side: DocumentSide, length: usize },

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failures of the vision analysis service. Never fatal; the orchestrator
/// turns every variant into a fallback to the OCR-only path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AiServiceError {
    #[error("AI service quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("AI service rejected credentials: {0}")]
    InvalidCredentials(String),

    #[error("AI service unavailable: {0}")]
    Unavailable(String),

    #[error("AI service returned no usable JSON: {0}")]
    MalformedResponse(String),

    #[error("AI service not configured")]
    NotConfigured,
}

impl From<reqwest::Error> for AiServiceError {
    fn from(err: reqwest::Error) -> Self {
        AiServiceError::Unavailable(err.to_string())
    }
}
