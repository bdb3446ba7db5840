use crate::query::QueryError;
use chrono::{DateTime, Utc};
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Available,
    Sold,
    Pending,
}

impl Display for ProductStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductStatus::Available => write!(f, "available"),
            ProductStatus::Sold => write!(f, "sold"),
            ProductStatus::Pending => write!(f, "pending"),
        }
    }
}

impl FromStr for ProductStatus {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(ProductStatus::Available),
            "sold" => Ok(ProductStatus::Sold),
            "pending" => Ok(ProductStatus::Pending),
            other => Err(QueryError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub status: ProductStatus,
    pub category_id: String,
    pub seller_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn dummy() -> Self {
        let mut rng = thread_rng();
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: "test title".to_string(),
            description: Some("test description".to_string()),
            price: rng.gen_range(1.0..100.0),
            image_url: None,
            images: vec![],
            status: ProductStatus::Available,
            category_id: "category".to_string(),
            seller_id: "seller".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_count: Option<u64>,
}

/// Body of `GET /products`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductListResponse {
    pub products: Vec<Product>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

pub fn total_pages_for(total: u64, per_page: u32) -> u32 {
    if total == 0 || per_page == 0 {
        return 0;
    }
    total.div_ceil(per_page as u64) as u32
}

/// One fetched page of products. Replaced wholesale on every successful fetch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultPage {
    pub items: Vec<Product>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl ResultPage {
    pub fn new(mut items: Vec<Product>, total: u64, page: u32, per_page: u32) -> Self {
        items.truncate(per_page as usize);
        Self {
            items,
            total,
            page,
            per_page,
            total_pages: total_pages_for(total, per_page),
        }
    }

    pub fn empty(page: u32, per_page: u32) -> Self {
        Self::new(vec![], 0, page, per_page)
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

impl From<ProductListResponse> for ResultPage {
    fn from(response: ProductListResponse) -> Self {
        let page = ResultPage::new(
            response.products,
            response.total,
            response.page,
            response.per_page,
        );
        if page.total_pages != response.total_pages {
            debug!(
                reported = response.total_pages,
                computed = page.total_pages,
                "backend total_pages disagrees with total/per_page"
            );
        }
        page
    }
}
