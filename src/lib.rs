pub mod app_state;
pub mod backend;
pub mod configuration;
pub mod data_models;
pub mod errors;
pub mod fetch;
pub mod query;
pub mod render;
pub mod telemetry;

use crate::app_state::AppState;
use crate::backend::{create_backend, ProductsBackend};
use crate::configuration::Settings;
use crate::errors::Error;
use crate::fetch::{FetchOrchestrator, PageCache, RetryPolicy, Staleness};
use crate::query::state::QuerySettings;
use crate::query::{QueryStateManager, ViewScope};
use std::sync::Arc;

pub fn create_app(settings: &Settings, scope: ViewScope) -> Result<AppState, Error> {
    settings.check_if_valid()?;
    let backend = create_backend(&settings.backend)?;
    Ok(create_app_with_backend(settings, scope, backend))
}

/// Wires the pipeline around an already built backend. Needs a tokio runtime.
pub fn create_app_with_backend(
    settings: &Settings,
    scope: ViewScope,
    backend: Arc<dyn ProductsBackend>,
) -> AppState {
    let retry = RetryPolicy::from_settings(&settings.retry, settings.backend.timeout());
    let orchestrator = FetchOrchestrator::new(
        backend,
        PageCache::default(),
        Staleness::from(&settings.cache),
        retry,
    );
    let queries = QueryStateManager::new(QuerySettings::from(&settings.query), scope);
    AppState::init(queries, orchestrator)
}
