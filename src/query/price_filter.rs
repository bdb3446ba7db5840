use crate::query::errors::QueryError;
use serde::{Deserialize, Serialize};

/// Absolute range every price bound is clamped into before it is sent.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBounds {
    pub floor: f64,
    pub ceiling: f64,
}

impl Default for PriceBounds {
    fn default() -> Self {
        Self {
            floor: 0.0,
            ceiling: 1000.0,
        }
    }
}

impl PriceBounds {
    /// Never panics: with an inverted range the ceiling wins.
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.floor).min(self.ceiling)
    }

    pub fn is_valid(&self) -> bool {
        self.floor.is_finite() && self.ceiling.is_finite() && 0.0 <= self.floor && self.floor <= self.ceiling
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceFilter {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl PriceFilter {
    /// Validates a user supplied range and clamps it into `bounds`.
    pub fn try_new(
        min_price: Option<f64>,
        max_price: Option<f64>,
        bounds: &PriceBounds,
    ) -> Result<Self, QueryError> {
        for value in [min_price, max_price].into_iter().flatten() {
            if !value.is_finite() {
                return Err(QueryError::PriceNotFinite);
            }
            if value < 0.0 {
                return Err(QueryError::NegativePrice);
            }
        }
        if let (Some(min), Some(max)) = (min_price, max_price) {
            if min > max {
                return Err(QueryError::InvertedPriceRange { min, max });
            }
        }
        Ok(Self {
            min_price: min_price.map(|value| bounds.clamp(value)),
            max_price: max_price.map(|value| bounds.clamp(value)),
        })
    }
}
