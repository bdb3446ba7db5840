use crate::query::errors::QueryError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    Price,
    Title,
}

impl Display for SortField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SortField::CreatedAt => write!(f, "created_at"),
            SortField::Price => write!(f, "price"),
            SortField::Title => write!(f, "title"),
        }
    }
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl Display for SortOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

/// Named sort options offered by the UI. Only the expanded `(field, order)`
/// pair ever goes over the wire.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SortPreset {
    #[default]
    Newest,
    Oldest,
    PriceLow,
    PriceHigh,
    TitleAz,
    TitleZa,
}

impl SortPreset {
    pub const ALL: [SortPreset; 6] = [
        SortPreset::Newest,
        SortPreset::Oldest,
        SortPreset::PriceLow,
        SortPreset::PriceHigh,
        SortPreset::TitleAz,
        SortPreset::TitleZa,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            SortPreset::Newest => "newest",
            SortPreset::Oldest => "oldest",
            SortPreset::PriceLow => "price-low",
            SortPreset::PriceHigh => "price-high",
            SortPreset::TitleAz => "title-az",
            SortPreset::TitleZa => "title-za",
        }
    }

    pub fn expand(&self) -> (SortField, SortOrder) {
        match self {
            SortPreset::Newest => (SortField::CreatedAt, SortOrder::Desc),
            SortPreset::Oldest => (SortField::CreatedAt, SortOrder::Asc),
            SortPreset::PriceLow => (SortField::Price, SortOrder::Asc),
            SortPreset::PriceHigh => (SortField::Price, SortOrder::Desc),
            SortPreset::TitleAz => (SortField::Title, SortOrder::Asc),
            SortPreset::TitleZa => (SortField::Title, SortOrder::Desc),
        }
    }

    pub fn matching(field: SortField, order: SortOrder) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.expand() == (field, order))
    }
}

impl Display for SortPreset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for SortPreset {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.key() == s)
            .ok_or_else(|| QueryError::UnknownSortPreset(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_from_str_works() {
        for preset in SortPreset::ALL {
            assert_eq!(SortPreset::from_str(preset.key()), Ok(preset));
        }
    }

    #[test]
    fn preset_from_str_fails() {
        let result = SortPreset::from_str("cheapest");
        assert_eq!(
            result,
            Err(QueryError::UnknownSortPreset("cheapest".to_string()))
        );
    }

    #[test]
    fn price_low_expands_to_price_asc() {
        assert_eq!(
            SortPreset::PriceLow.expand(),
            (SortField::Price, SortOrder::Asc)
        );
        assert_eq!(
            SortPreset::matching(SortField::Price, SortOrder::Asc),
            Some(SortPreset::PriceLow)
        );
    }

    #[test]
    fn sort_wire_names_work() {
        assert_eq!(SortField::CreatedAt.to_string(), "created_at".to_string());
        assert_eq!(SortOrder::Desc.to_string(), "desc".to_string());
    }
}
