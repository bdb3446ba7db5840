use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("price must not be negative")]
    NegativePrice,
    #[error("price must be a finite number")]
    PriceNotFinite,
    #[error("minimum price {min} is above maximum price {max}")]
    InvertedPriceRange { min: f64, max: f64 },
    #[error("unknown sort preset: {0}")]
    UnknownSortPreset(String),
    #[error("category id is empty")]
    EmptyCategoryId,
    #[error("unknown product status: {0}")]
    UnknownStatus(String),
    #[error("items per page must be within 1..={max}, got {got}")]
    InvalidPerPage { got: u32, max: u32 },
}
