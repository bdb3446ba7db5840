use crate::errors::ConfigurationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to build reqwest client: {0}")]
    FailedClient(#[from] reqwest::Error),
    #[error("failed to parse base url: {0}")]
    UrlParseError(#[from] url::ParseError),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("failed to read with serde: {0}")]
    SerdeError(#[from] serde_json::error::Error),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
