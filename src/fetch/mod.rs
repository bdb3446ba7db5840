use crate::backend::ProductsBackend;
use crate::configuration::{CacheSettings, RetrySettings};
use crate::data_models::{Category, ResultPage};
use crate::query::{ProductQuery, QueryFilters};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, OnceCell};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use validator::Validate;

mod cache;
mod errors;
mod retry;

pub use cache::{CacheKey, CacheStats, MemoryCache, CATEGORIES_PREFIX, PRODUCTS_PREFIX};
pub use errors::FetchError;
pub use retry::RetryPolicy;

/// How long a cached result is served before it is fetched again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Staleness {
    pub browse: Duration,
    pub search: Duration,
    pub categories: Duration,
}

impl Default for Staleness {
    fn default() -> Self {
        Self {
            browse: Duration::from_secs(300),
            search: Duration::from_secs(30),
            categories: Duration::from_secs(600),
        }
    }
}

impl Staleness {
    pub fn for_query(&self, query: &ProductQuery) -> Duration {
        if query.search.is_some() {
            self.search
        } else {
            self.browse
        }
    }
}

impl From<&CacheSettings> for Staleness {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            browse: Duration::from_secs(settings.browse_staleness_secs),
            search: Duration::from_secs(settings.search_staleness_secs),
            categories: Duration::from_secs(settings.categories_staleness_secs),
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &RetrySettings, attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            attempt_timeout,
        }
    }
}

/// Storage owned by one orchestrator. Build a fresh one per test or per
/// session; cloning shares the entries.
#[derive(Debug, Clone, Default)]
pub struct PageCache {
    pages: MemoryCache<ResultPage>,
    categories: MemoryCache<Vec<Category>>,
}

/// A response that made it into the visible slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Committed {
    pub key: CacheKey,
    pub filters: QueryFilters,
    pub outcome: Result<ResultPage, FetchError>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Committed(Result<ResultPage, FetchError>),
    Superseded,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    key: Option<CacheKey>,
    cancel: CancellationToken,
}

type InFlight = Arc<OnceCell<Result<ResultPage, FetchError>>>;

/// One caller waiting on a shared load. The map entry goes away once the load
/// finished, or when the last waiter gives up before it did.
struct InFlightWaiter<'a> {
    in_flight: &'a Mutex<HashMap<CacheKey, InFlight>>,
    key: &'a CacheKey,
    cell: InFlight,
}

impl Drop for InFlightWaiter<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock();
        let Some(current) = in_flight.get(self.key) else {
            return;
        };
        if !Arc::ptr_eq(current, &self.cell) {
            return;
        }
        // The map and this waiter hold the only references.
        if self.cell.initialized() || Arc::strong_count(&self.cell) == 2 {
            in_flight.remove(self.key);
        }
    }
}

/// Turns filter snapshots into backend requests, with caching, request
/// de-duplication, bounded retries and stale-response protection.
#[derive(Debug)]
pub struct FetchOrchestrator {
    backend: Arc<dyn ProductsBackend>,
    cache: PageCache,
    staleness: Staleness,
    retry: RetryPolicy,
    in_flight: Mutex<HashMap<CacheKey, InFlight>>,
    epoch: AtomicU64,
    slot: Mutex<Slot>,
    committed: watch::Sender<Option<Committed>>,
}

impl FetchOrchestrator {
    pub fn new(
        backend: Arc<dyn ProductsBackend>,
        cache: PageCache,
        staleness: Staleness,
        retry: RetryPolicy,
    ) -> Self {
        let (committed, _) = watch::channel(None);
        Self {
            backend,
            cache,
            staleness,
            retry,
            in_flight: Mutex::new(HashMap::new()),
            epoch: AtomicU64::new(0),
            slot: Mutex::new(Slot::default()),
            committed,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Committed>> {
        self.committed.subscribe()
    }

    pub fn latest(&self) -> Option<Committed> {
        self.committed.borrow().clone()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.pages.stats()
    }

    /// Returns the page for `filters` from cache or backend. Concurrent calls
    /// for the same key share a single backend request. Never touches the
    /// visible slot.
    pub async fn fetch(&self, filters: &QueryFilters) -> Result<ResultPage, FetchError> {
        let query = filters.to_query();
        query.validate()?;
        let key = CacheKey::products(&query);
        if let Some(page) = self.cache.pages.get(&key) {
            debug!(%key, "cache hit");
            return Ok(page);
        }
        debug!(%key, "cache miss");

        let cell = self
            .in_flight
            .lock()
            .entry(key.clone())
            .or_default()
            .clone();
        let waiter = InFlightWaiter {
            in_flight: &self.in_flight,
            key: &key,
            cell,
        };
        let outcome = waiter
            .cell
            .get_or_init(|| self.load_page(&key, &query))
            .await
            .clone();
        drop(waiter);
        outcome
    }

    async fn load_page(&self, key: &CacheKey, query: &ProductQuery) -> Result<ResultPage, FetchError> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let response = self
            .retry
            .run(|| self.backend.list_products(query))
            .await;
        match response {
            Ok(response) => {
                let page = ResultPage::from(response);
                if self.epoch.load(Ordering::SeqCst) == epoch {
                    let expired = self.cache.pages.cleanup_expired();
                    if expired > 0 {
                        debug!(expired, "dropped expired pages");
                    }
                    let ttl = self.staleness.for_query(query);
                    self.cache.pages.set_with_ttl(key.clone(), page.clone(), ttl);
                } else {
                    debug!(%key, "cache invalidated while loading, result not cached");
                }
                Ok(page)
            }
            Err(e) => {
                match &e {
                    FetchError::Unknown(_) => error!(%key, error = %e, "products request failed"),
                    FetchError::Network(_) => warn!(%key, error = %e, "products request gave up"),
                    FetchError::Auth(_) | FetchError::Validation(_) => {
                        info!(%key, error = %e, "products request rejected")
                    }
                }
                Err(e)
            }
        }
    }

    /// Fetches `filters` for the visible slot. A later `resolve` with a
    /// different key cancels this one; whatever happens, a response is only
    /// committed while it still belongs to the newest call.
    pub async fn resolve(&self, filters: QueryFilters) -> Resolution {
        let key = filters.cache_key();
        let (generation, cancel) = self.claim_slot(&key);
        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(%key, "request superseded, cancelled");
                return Resolution::Superseded;
            }
            outcome = self.fetch(&filters) => outcome,
        };
        self.commit(generation, key, filters, outcome)
    }

    fn claim_slot(&self, key: &CacheKey) -> (u64, CancellationToken) {
        let mut slot = self.slot.lock();
        if slot.key.as_ref() != Some(key) {
            slot.cancel.cancel();
            slot.cancel = CancellationToken::new();
            slot.key = Some(key.clone());
        }
        slot.generation += 1;
        (slot.generation, slot.cancel.clone())
    }

    fn commit(
        &self,
        generation: u64,
        key: CacheKey,
        filters: QueryFilters,
        outcome: Result<ResultPage, FetchError>,
    ) -> Resolution {
        let slot = self.slot.lock();
        if slot.generation != generation {
            debug!(%key, "discarding stale response");
            return Resolution::Superseded;
        }
        if let Ok(page) = &outcome {
            info!(%key, total = page.total, page = page.page, "page committed");
        }
        self.committed.send_replace(Some(Committed {
            key,
            filters,
            outcome: outcome.clone(),
        }));
        drop(slot);
        Resolution::Committed(outcome)
    }

    /// Warms the cache for `filters` without touching the visible slot.
    pub async fn prefetch(&self, filters: &QueryFilters) -> Result<(), FetchError> {
        self.fetch(filters).await.map(|_| ())
    }

    /// Drops every cached page whose key matches `predicate`. Loads already in
    /// flight will not repopulate the cache, and later fetches for a matching
    /// key do not join them.
    pub fn invalidate<P>(&self, mut predicate: P) -> usize
    where
        P: FnMut(&CacheKey) -> bool,
    {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.in_flight.lock().retain(|key, _| !predicate(key));
        let dropped = self.cache.pages.retain(|key| !predicate(key));
        info!(dropped, "invalidated cached pages");
        dropped
    }

    /// Called after a product is created, updated or deleted.
    pub fn invalidate_products(&self) -> usize {
        self.cache.categories.remove(&CacheKey::categories(true));
        self.invalidate(CacheKey::is_products)
    }

    pub fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.in_flight.lock().clear();
        self.cache.pages.clear();
        self.cache.categories.clear();
    }

    /// Category options for the filter controls.
    pub async fn categories(&self, with_count: bool) -> Result<Vec<Category>, FetchError> {
        let key = CacheKey::categories(with_count);
        if let Some(categories) = self.cache.categories.get(&key) {
            return Ok(categories);
        }
        let categories = self
            .retry
            .run(|| {
                if with_count {
                    self.backend.list_categories_with_count()
                } else {
                    self.backend.list_categories()
                }
            })
            .await?;
        self.cache
            .categories
            .set_with_ttl(key, categories.clone(), self.staleness.categories);
        Ok(categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::{Product, ProductListResponse};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::time::sleep;

    #[derive(Debug, Default)]
    struct ScriptedBackend {
        calls: Mutex<Vec<ProductQuery>>,
        delays: HashMap<String, Duration>,
        failures: Mutex<VecDeque<FetchError>>,
    }

    impl ScriptedBackend {
        fn with_delays(delays: &[(&str, u64)]) -> Self {
            Self {
                delays: delays
                    .iter()
                    .map(|(term, ms)| (term.to_string(), Duration::from_millis(*ms)))
                    .collect(),
                ..Default::default()
            }
        }

        fn failing(failures: Vec<FetchError>) -> Self {
            Self {
                failures: Mutex::new(failures.into()),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.lock().len()
        }
    }

    #[async_trait]
    impl ProductsBackend for ScriptedBackend {
        async fn list_products(&self, query: &ProductQuery) -> Result<ProductListResponse, FetchError> {
            self.calls.lock().push(query.clone());
            let term = query.search.clone().unwrap_or_default();
            if let Some(delay) = self.delays.get(&term) {
                sleep(*delay).await;
            }
            if let Some(failure) = self.failures.lock().pop_front() {
                return Err(failure);
            }
            Ok(ProductListResponse {
                products: vec![Product {
                    title: term,
                    ..Product::dummy()
                }],
                total: 1,
                page: query.page,
                per_page: query.per_page,
                total_pages: 1,
            })
        }

        async fn list_categories(&self) -> Result<Vec<Category>, FetchError> {
            Ok(vec![])
        }

        async fn list_categories_with_count(&self) -> Result<Vec<Category>, FetchError> {
            Ok(vec![])
        }
    }

    fn orchestrator(backend: Arc<ScriptedBackend>) -> FetchOrchestrator {
        FetchOrchestrator::new(
            backend,
            PageCache::default(),
            Staleness::default(),
            RetryPolicy::default(),
        )
    }

    fn searching(term: &str) -> QueryFilters {
        QueryFilters {
            search: Some(term.to_string()),
            ..Default::default()
        }
    }

    fn title_of(page: &ResultPage) -> String {
        page.items[0].title.clone()
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_serves_from_cache() {
        let backend = Arc::new(ScriptedBackend::default());
        let orchestrator = orchestrator(backend.clone());
        let first = orchestrator
            .fetch(&QueryFilters::default())
            .await
            .expect("Failed to fetch");
        let second = orchestrator
            .fetch(&QueryFilters::default())
            .await
            .expect("Failed to fetch");
        assert_eq!(first, second);
        assert_eq!(backend.calls(), 1);
        assert_eq!(orchestrator.cache_stats().hits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn search_pages_go_stale_sooner() {
        let backend = Arc::new(ScriptedBackend::default());
        let orchestrator = orchestrator(backend.clone());
        orchestrator
            .fetch(&QueryFilters::default())
            .await
            .expect("Failed to fetch");
        orchestrator
            .fetch(&searching("lamp"))
            .await
            .expect("Failed to fetch");
        assert_eq!(backend.calls(), 2);

        sleep(Duration::from_secs(31)).await;
        orchestrator
            .fetch(&QueryFilters::default())
            .await
            .expect("Failed to fetch");
        orchestrator
            .fetch(&searching("lamp"))
            .await
            .expect("Failed to fetch");
        assert_eq!(backend.calls(), 3);

        sleep(Duration::from_secs(300)).await;
        orchestrator
            .fetch(&QueryFilters::default())
            .await
            .expect("Failed to fetch");
        assert_eq!(backend.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_fetches_share_one_request() {
        let backend = Arc::new(ScriptedBackend::with_delays(&[("desk", 100)]));
        let orchestrator = orchestrator(backend.clone());
        let filters = searching("desk");
        let (first, second) = tokio::join!(orchestrator.fetch(&filters), orchestrator.fetch(&filters));
        assert_eq!(first, second);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_filters_never_reach_backend() {
        let backend = Arc::new(ScriptedBackend::default());
        let orchestrator = orchestrator(backend.clone());
        let filters = QueryFilters {
            per_page: 0,
            ..Default::default()
        };
        let result = orchestrator.fetch(&filters).await;
        assert!(matches!(result, Err(FetchError::Validation(_))));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_products_forces_refetch() {
        let backend = Arc::new(ScriptedBackend::default());
        let orchestrator = orchestrator(backend.clone());
        orchestrator
            .fetch(&QueryFilters::default())
            .await
            .expect("Failed to fetch");
        assert_eq!(orchestrator.invalidate_products(), 1);
        orchestrator
            .fetch(&QueryFilters::default())
            .await
            .expect("Failed to fetch");
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidation_during_load_is_not_cached() {
        let backend = Arc::new(ScriptedBackend::with_delays(&[("desk", 100)]));
        let orchestrator = orchestrator(backend.clone());
        let filters = searching("desk");
        let (loaded, _) = tokio::join!(orchestrator.fetch(&filters), async {
            sleep(Duration::from_millis(50)).await;
            orchestrator.invalidate_products()
        });
        loaded.expect("Failed to fetch");
        orchestrator.fetch(&filters).await.expect("Failed to fetch");
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_after_invalidation_does_not_join_old_load() {
        let backend = Arc::new(ScriptedBackend::with_delays(&[("desk", 100)]));
        let orchestrator = orchestrator(backend.clone());
        let filters = searching("desk");
        let (first, second) = tokio::join!(orchestrator.fetch(&filters), async {
            sleep(Duration::from_millis(50)).await;
            orchestrator.invalidate_products();
            orchestrator.fetch(&filters).await
        });
        first.expect("Failed to fetch");
        second.expect("Failed to fetch");
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_loads_leave_no_bookkeeping() {
        let backend = Arc::new(ScriptedBackend::with_delays(&[
            ("a", 500),
            ("b", 500),
            ("c", 100),
        ]));
        let orchestrator = orchestrator(backend.clone());
        let (first, second, third) = tokio::join!(
            orchestrator.resolve(searching("a")),
            async {
                sleep(Duration::from_millis(10)).await;
                orchestrator.resolve(searching("b")).await
            },
            async {
                sleep(Duration::from_millis(20)).await;
                orchestrator.resolve(searching("c")).await
            }
        );
        assert_eq!(first, Resolution::Superseded);
        assert_eq!(second, Resolution::Superseded);
        assert!(matches!(third, Resolution::Committed(Ok(_))));
        assert!(orchestrator.in_flight.lock().is_empty());

        sleep(Duration::from_secs(3600)).await;
        orchestrator
            .fetch(&QueryFilters::default())
            .await
            .expect("Failed to fetch");
        assert_eq!(orchestrator.cache_stats().entries, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_response_is_discarded() {
        let backend = Arc::new(ScriptedBackend::with_delays(&[("lap", 500), ("laptop", 100)]));
        let orchestrator = orchestrator(backend.clone());
        let (first, second) = tokio::join!(orchestrator.resolve(searching("lap")), async {
            sleep(Duration::from_millis(10)).await;
            orchestrator.resolve(searching("laptop")).await
        });
        assert_eq!(first, Resolution::Superseded);
        let Resolution::Committed(Ok(page)) = second else {
            panic!("expected the newer request to commit");
        };
        assert_eq!(title_of(&page), "laptop".to_string());

        sleep(Duration::from_secs(1)).await;
        let latest = orchestrator.latest().expect("Nothing committed");
        assert_eq!(latest.filters.search, Some("laptop".to_string()));
        assert_eq!(latest.key, searching("laptop").cache_key());
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_resolve_for_same_key_shares_request() {
        let backend = Arc::new(ScriptedBackend::with_delays(&[("desk", 100)]));
        let orchestrator = orchestrator(backend.clone());
        let (first, second) = tokio::join!(orchestrator.resolve(searching("desk")), async {
            sleep(Duration::from_millis(10)).await;
            orchestrator.resolve(searching("desk")).await
        });
        assert_eq!(first, Resolution::Superseded);
        assert!(matches!(second, Resolution::Committed(Ok(_))));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn auth_failure_is_not_retried() {
        let backend = Arc::new(ScriptedBackend::failing(vec![FetchError::Auth(
            "missing token".to_string(),
        )]));
        let orchestrator = orchestrator(backend.clone());
        let resolution = orchestrator.resolve(QueryFilters::default()).await;
        assert!(matches!(resolution, Resolution::Committed(Err(FetchError::Auth(_)))));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn network_failure_is_retried() {
        let backend = Arc::new(ScriptedBackend::failing(vec![
            FetchError::Network("reset".to_string()),
            FetchError::Network("reset".to_string()),
        ]));
        let orchestrator = orchestrator(backend.clone());
        let resolution = orchestrator.resolve(QueryFilters::default()).await;
        assert!(matches!(resolution, Resolution::Committed(Ok(_))));
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_not_cached() {
        let backend = Arc::new(ScriptedBackend::failing(vec![FetchError::Validation(
            "bad".to_string(),
        )]));
        let orchestrator = orchestrator(backend.clone());
        assert!(orchestrator.fetch(&QueryFilters::default()).await.is_err());
        assert!(orchestrator.fetch(&QueryFilters::default()).await.is_ok());
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn prefetch_does_not_commit() {
        let backend = Arc::new(ScriptedBackend::default());
        let orchestrator = orchestrator(backend.clone());
        let next_page = QueryFilters {
            page: 2,
            ..Default::default()
        };
        orchestrator
            .prefetch(&next_page)
            .await
            .expect("Failed to prefetch");
        assert!(orchestrator.latest().is_none());
        orchestrator.resolve(next_page).await;
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn categories_are_cached() {
        let backend = Arc::new(ScriptedBackend::default());
        let orchestrator = orchestrator(backend.clone());
        orchestrator
            .categories(true)
            .await
            .expect("Failed to load categories");
        assert!(orchestrator
            .cache
            .categories
            .get(&CacheKey::categories(true))
            .is_some());
        orchestrator.invalidate_products();
        assert!(orchestrator
            .cache
            .categories
            .get(&CacheKey::categories(true))
            .is_none());
    }
}
