use crate::configuration::{BackendSettings, BackendType};
use crate::data_models::{Category, ProductListResponse};
use crate::fetch::FetchError;
use crate::query::ProductQuery;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

mod errors;
pub mod http;
pub mod in_memory;

pub use errors::BackendError;
pub use http::HttpBackend;
pub use in_memory::InMemoryBackend;

/// The REST collaborator the fetch layer talks to.
#[async_trait]
pub trait ProductsBackend: Debug + Send + Sync {
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductListResponse, FetchError>;

    async fn list_categories(&self) -> Result<Vec<Category>, FetchError>;

    async fn list_categories_with_count(&self) -> Result<Vec<Category>, FetchError>;
}

pub fn create_backend(settings: &BackendSettings) -> Result<Arc<dyn ProductsBackend>, BackendError> {
    settings.check_if_valid()?;
    match settings.backend_type {
        BackendType::InMemory => {
            let backend = InMemoryBackend::try_from(settings.data_file_unchecked())?;
            Ok(Arc::new(backend))
        }
        BackendType::Http => Ok(Arc::new(HttpBackend::try_from(settings)?)),
    }
}
