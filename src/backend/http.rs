use crate::backend::{BackendError, ProductsBackend};
use crate::configuration::BackendSettings;
use crate::data_models::{Category, ProductListResponse};
use crate::errors::ConfigurationError;
use crate::fetch::FetchError;
use crate::query::ProductQuery;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

const USER_AGENT: &str = concat!("campus-market/", env!("CARGO_PKG_VERSION"));

#[derive(Deserialize)]
#[serde(untagged)]
enum CategoryList {
    Envelope { categories: Vec<Category> },
    Bare(Vec<Category>),
}

impl From<CategoryList> for Vec<Category> {
    fn from(list: CategoryList) -> Self {
        match list {
            CategoryList::Envelope { categories } => categories,
            CategoryList::Bare(categories) => categories,
        }
    }
}

/// Talks to the marketplace REST API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, FetchError> {
        self.base_url
            .join(path)
            .map_err(|e| FetchError::Unknown(format!("invalid endpoint {path}: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Option<&BTreeMap<&'static str, String>>,
    ) -> Result<T, FetchError> {
        let url = self.endpoint(path)?;
        debug!(%url, ?params, "GET");
        let mut request = self.client.get(url);
        if let Some(params) = params {
            request = request.query(params);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::from_status(status.as_u16(), &body));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| FetchError::Unknown(format!("malformed response body: {e}")))
    }
}

impl TryFrom<&BackendSettings> for HttpBackend {
    type Error = BackendError;

    fn try_from(settings: &BackendSettings) -> Result<Self, Self::Error> {
        let base_url = settings
            .base_url
            .as_deref()
            .ok_or(ConfigurationError::MissingBaseUrl)?;
        let backend = HttpBackend::new(base_url, Duration::from_millis(settings.timeout_ms))?;
        Ok(backend.with_token(settings.token.clone()))
    }
}

fn classify(error: reqwest::Error) -> FetchError {
    if error.is_timeout() || error.is_connect() || error.is_request() {
        return FetchError::Network(error.to_string());
    }
    match error.status() {
        Some(status) => FetchError::from_status(status.as_u16(), ""),
        None => FetchError::Unknown(error.to_string()),
    }
}

#[async_trait]
impl ProductsBackend for HttpBackend {
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductListResponse, FetchError> {
        self.get_json("products", Some(&query.pairs())).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, FetchError> {
        let list: CategoryList = self.get_json("categories", None).await?;
        Ok(list.into())
    }

    async fn list_categories_with_count(&self) -> Result<Vec<Category>, FetchError> {
        let list: CategoryList = self.get_json("categories/with-count", None).await?;
        Ok(list.into())
    }
}
