use crate::backend::{BackendError, ProductsBackend};
use crate::data_models::{total_pages_for, Category, Product, ProductListResponse, ProductStatus};
use crate::fetch::FetchError;
use crate::query::{ProductQuery, SortField, SortOrder};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FileStructure {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub products: Vec<Product>,
}

/// Serves the products REST contract from memory, with the same filtering,
/// ordering and paging rules as the real backend.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    pub categories: RwLock<Vec<Category>>,
    pub products: RwLock<Vec<Product>>,
}

impl TryFrom<String> for InMemoryBackend {
    type Error = BackendError;

    fn try_from(file_path: String) -> Result<Self, Self::Error> {
        let data = fs::read_to_string(file_path)?;
        let file: FileStructure = serde_json::from_str(&data)?;
        Ok(Self::init(file.categories, file.products))
    }
}

impl InMemoryBackend {
    pub fn init(categories: Vec<Category>, products: Vec<Product>) -> Self {
        Self {
            categories: RwLock::new(categories),
            products: RwLock::new(products),
        }
    }

    pub fn upsert_product(&self, product: Product) {
        let mut products = self.products.write();
        match products.iter_mut().find(|current| current.id == product.id) {
            Some(current) => *current = product,
            None => products.push(product),
        }
    }

    pub fn remove_product(&self, id: Uuid) -> Option<Product> {
        let mut products = self.products.write();
        let index = products.iter().position(|product| product.id == id)?;
        Some(products.remove(index))
    }

    fn matches(product: &Product, query: &ProductQuery, needle: &Option<String>) -> bool {
        if product.status != query.status {
            return false;
        }
        if let Some(category_id) = &query.category_id {
            if &product.category_id != category_id {
                return false;
            }
        }
        if let Some(seller_id) = &query.seller_id {
            if &product.seller_id != seller_id {
                return false;
            }
        }
        if query.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if query.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        match needle {
            None => true,
            Some(needle) => {
                product.title.to_lowercase().contains(needle)
                    || product
                        .description
                        .as_ref()
                        .is_some_and(|text| text.to_lowercase().contains(needle))
            }
        }
    }

    fn compare(a: &Product, b: &Product, field: SortField) -> Ordering {
        match field {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::Price => a.price.total_cmp(&b.price),
            SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        }
    }

    pub fn search(&self, query: &ProductQuery) -> Result<ProductListResponse, FetchError> {
        query.validate()?;
        let needle = query.search.as_ref().map(|search| search.to_lowercase());
        let mut selected = self
            .products
            .read()
            .iter()
            .filter(|product| Self::matches(product, query, &needle))
            .cloned()
            .collect::<Vec<_>>();
        selected.sort_by(|a, b| {
            let ordering = Self::compare(a, b, query.sort_by);
            match query.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
        let total = selected.len() as u64;
        let products = selected
            .into_iter()
            .skip(query.offset())
            .take(query.per_page as usize)
            .collect();
        Ok(ProductListResponse {
            products,
            total,
            page: query.page,
            per_page: query.per_page,
            total_pages: total_pages_for(total, query.per_page),
        })
    }

    pub fn categories_with_count(&self) -> Vec<Category> {
        let products = self.products.read();
        self.categories
            .read()
            .iter()
            .map(|category| {
                let count = products
                    .iter()
                    .filter(|product| {
                        product.category_id == category.id
                            && product.status == ProductStatus::Available
                    })
                    .count();
                Category {
                    product_count: Some(count as u64),
                    ..category.clone()
                }
            })
            .collect()
    }
}

#[async_trait]
impl ProductsBackend for InMemoryBackend {
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductListResponse, FetchError> {
        self.search(query)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, FetchError> {
        Ok(self.categories.read().clone())
    }

    async fn list_categories_with_count(&self) -> Result<Vec<Category>, FetchError> {
        Ok(self.categories_with_count())
    }
}
