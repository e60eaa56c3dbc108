use thiserror::Error;

/// Failure taxonomy for recovering structured data from generator output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecoveryError {
    #[error("Upstream failure: {0}")]
    Upstream(String),
    #[error("Empty response")]
    EmptyResponse,
    #[error("No JSON content found in response")]
    Extraction,
    #[error("Failed to parse response: {0}")]
    Parse(String),
    #[error("Unsupported response type: {0}")]
    UnsupportedInput(&'static str),
}
