use crate::data_models::ProductStatus;
use crate::query::sort::{SortField, SortOrder};
use std::collections::BTreeMap;
use validator::Validate;

pub const MAX_PER_PAGE: u32 = 100;

/// Backend-ready form of [`crate::query::QueryFilters`]: the sort preset is
/// expanded and the implicit `available` status made explicit.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct ProductQuery {
    #[validate(length(min = 1, max = 100))]
    pub search: Option<String>,
    #[validate(length(min = 1))]
    pub category_id: Option<String>,
    #[validate(range(min = 0.0))]
    pub min_price: Option<f64>,
    #[validate(range(min = 0.0))]
    pub max_price: Option<f64>,
    pub status: ProductStatus,
    #[validate(length(min = 1))]
    pub seller_id: Option<String>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    #[validate(range(min = 1))]
    pub page: u32,
    #[validate(range(min = 1, max = 100))]
    pub per_page: u32,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            search: None,
            category_id: None,
            min_price: None,
            max_price: None,
            status: ProductStatus::Available,
            seller_id: None,
            sort_by: SortField::CreatedAt,
            sort_order: SortOrder::Desc,
            page: 1,
            per_page: 12,
        }
    }
}

impl ProductQuery {
    /// Query string parameters, ordered by name. Absent constraints are omitted.
    pub fn pairs(&self) -> BTreeMap<&'static str, String> {
        let mut pairs = BTreeMap::new();
        if let Some(search) = &self.search {
            pairs.insert("search", search.to_string());
        }
        if let Some(category_id) = &self.category_id {
            pairs.insert("category_id", category_id.to_string());
        }
        if let Some(min_price) = self.min_price {
            pairs.insert("min_price", min_price.to_string());
        }
        if let Some(max_price) = self.max_price {
            pairs.insert("max_price", max_price.to_string());
        }
        if let Some(seller_id) = &self.seller_id {
            pairs.insert("seller_id", seller_id.to_string());
        }
        pairs.insert("status", self.status.to_string());
        pairs.insert("sort_by", self.sort_by.to_string());
        pairs.insert("sort_order", self.sort_order.to_string());
        pairs.insert("page", self.page.to_string());
        pairs.insert("per_page", self.per_page.to_string());
        pairs
    }

    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.per_page as usize
    }
}
