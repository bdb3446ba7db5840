use thiserror::Error;

/// Failures surfaced by the fetch layer. Cloned to every caller that shared
/// a de-duplicated request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("authentication required: {0}")]
    Auth(String),
    #[error("request rejected: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unknown(String),
}

impl FetchError {
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = if body.is_empty() {
            format!("status {status}")
        } else {
            format!("status {status}: {body}")
        };
        match status {
            401 | 403 => FetchError::Auth(detail),
            400 | 404 | 422 => FetchError::Validation(detail),
            408 | 429 | 500..=599 => FetchError::Network(detail),
            _ => FetchError::Unknown(detail),
        }
    }

    pub fn timeout(after_ms: u128) -> Self {
        FetchError::Network(format!("request timed out after {after_ms}ms"))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Network(_))
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, FetchError::Auth(_))
    }
}

impl From<validator::ValidationErrors> for FetchError {
    fn from(errors: validator::ValidationErrors) -> Self {
        FetchError::Validation(errors.to_string())
    }
}
