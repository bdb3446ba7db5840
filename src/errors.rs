use crate::backend::BackendError;
use crate::fetch::FetchError;
use crate::query::QueryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read with serde: {0}")]
    SerdeError(#[from] serde_json::error::Error),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("failed to load configuration: {0}")]
    ConfigError(#[from] config::ConfigError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    AppErrors(#[from] AppErrors),
}

#[derive(Error, Debug)]
pub enum AppErrors {
    #[error("backend unavailable: {0}")]
    Backend(#[from] BackendError),
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("invalid query: {0}")]
    Query(#[from] QueryError),
}

impl From<BackendError> for Error {
    fn from(error: BackendError) -> Self {
        Error::AppErrors(error.into())
    }
}

impl From<FetchError> for Error {
    fn from(error: FetchError) -> Self {
        Error::AppErrors(error.into())
    }
}

impl From<QueryError> for Error {
    fn from(error: QueryError) -> Self {
        Error::AppErrors(error.into())
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigurationError {
    #[error("unknown backend type: {0}")]
    UnknownBackendType(String),
    #[error("data file for the in-memory backend not found")]
    DataFileNotFound,
    #[error("http backend requires a base_url")]
    MissingBaseUrl,
    #[error("{0}")]
    UnknownEnvironment(String),
    #[error("price bounds must be finite with 0 <= floor <= ceiling, got {floor}..{ceiling}")]
    InvalidPriceBounds { floor: f64, ceiling: f64 },
    #[error("per_page must be within 1..=100, got {0}")]
    InvalidPerPage(u32),
}
