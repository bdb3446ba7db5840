use crate::data_models::ProductStatus;
use crate::fetch::CacheKey;
use serde::{Deserialize, Serialize};

pub mod debounce;
mod errors;
mod price_filter;
mod product_query;
mod search_query;
mod sort;
pub mod state;
mod traits;

pub use errors::QueryError;
pub use price_filter::{PriceBounds, PriceFilter};
pub use product_query::{ProductQuery, MAX_PER_PAGE};
pub use search_query::{SearchQuery, MAX_SEARCH_LEN};
pub use sort::{SortField, SortOrder, SortPreset};
pub use state::QueryStateManager;

pub const DEFAULT_PER_PAGE: u32 = 12;

/// Which listings a view is showing. Part of the context, never of the
/// user-editable filters.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewScope {
    #[default]
    Marketplace,
    OwnListings(String),
    SellerListings(String),
}

impl ViewScope {
    pub fn seller_id(&self) -> Option<&str> {
        match self {
            ViewScope::Marketplace => None,
            ViewScope::OwnListings(id) | ViewScope::SellerListings(id) => Some(id),
        }
    }

    pub fn is_foreign(&self) -> bool {
        matches!(self, ViewScope::SellerListings(_))
    }
}

/// The normalized filters driving every fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFilters {
    pub search: Option<String>,
    pub category_id: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub status: Option<ProductStatus>,
    pub seller_id: Option<String>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub page: u32,
    pub per_page: u32,
}

impl Default for QueryFilters {
    fn default() -> Self {
        Self::for_scope(&ViewScope::Marketplace, DEFAULT_PER_PAGE)
    }
}

impl QueryFilters {
    pub fn for_scope(scope: &ViewScope, per_page: u32) -> Self {
        let (sort_by, sort_order) = SortPreset::default().expand();
        Self {
            search: None,
            category_id: None,
            min_price: None,
            max_price: None,
            status: None,
            seller_id: scope.seller_id().map(str::to_string),
            sort_by,
            sort_order,
            page: 1,
            per_page,
        }
    }

    pub fn sort_preset(&self) -> Option<SortPreset> {
        SortPreset::matching(self.sort_by, self.sort_order)
    }

    pub fn price_filter(&self) -> PriceFilter {
        PriceFilter {
            min_price: self.min_price,
            max_price: self.max_price,
        }
    }

    /// True when anything the user can clear narrows the result set.
    pub fn has_active_filters(&self) -> bool {
        self.search.is_some()
            || self.category_id.is_some()
            || self.min_price.is_some()
            || self.max_price.is_some()
            || self
                .status
                .is_some_and(|status| status != ProductStatus::Available)
    }

    pub fn to_query(&self) -> ProductQuery {
        ProductQuery {
            search: self.search.clone(),
            category_id: self.category_id.clone(),
            min_price: self.min_price,
            max_price: self.max_price,
            status: self.status.unwrap_or_default(),
            seller_id: self.seller_id.clone(),
            sort_by: self.sort_by,
            sort_order: self.sort_order,
            page: self.page,
            per_page: self.per_page,
        }
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::products(&self.to_query())
    }
}
