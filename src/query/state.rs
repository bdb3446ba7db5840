use crate::data_models::{ProductStatus, ResultPage};
use crate::query::debounce::Debouncer;
use crate::query::errors::QueryError;
use crate::query::price_filter::{PriceBounds, PriceFilter};
use crate::query::product_query::MAX_PER_PAGE;
use crate::query::search_query::SearchQuery;
use crate::query::sort::SortPreset;
use crate::query::{QueryFilters, ViewScope};
use parking_lot::Mutex;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct QuerySettings {
    pub debounce: Duration,
    pub per_page: u32,
    pub price_bounds: PriceBounds,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            per_page: crate::query::DEFAULT_PER_PAGE,
            price_bounds: PriceBounds::default(),
        }
    }
}

#[derive(Debug)]
struct QueryState {
    raw_search: String,
    scope: ViewScope,
    defaults: QueryFilters,
    filters: QueryFilters,
    total_pages: Option<u32>,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<QueryState>,
    publisher: watch::Sender<QueryFilters>,
}

impl Shared {
    /// Applies `change` to a copy of the filters and commits it only when it
    /// succeeds, so a rejected input never leaves partial state behind.
    fn update<F>(&self, change: F) -> Result<(), QueryError>
    where
        F: FnOnce(&mut QueryState, &mut QueryFilters) -> Result<(), QueryError>,
    {
        let mut state = self.state.lock();
        let mut next = state.filters.clone();
        change(&mut *state, &mut next)?;
        state.filters = next.clone();
        drop(state);
        self.publish(next);
        Ok(())
    }

    fn publish(&self, next: QueryFilters) {
        self.publisher.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    fn apply_search(&self, raw: String) {
        let term = SearchQuery::new(&raw).into_term();
        debug!(search = ?term, "search term settled");
        let _ = self.update(|_, filters| {
            filters.search = term;
            filters.page = 1;
            Ok(())
        });
    }
}

/// Single source of truth for what the user currently wants to see.
///
/// Every filter change resets `page` to 1. Free text goes through a debouncer
/// before it reaches the filters; subscribers only ever see settled values.
#[derive(Debug)]
pub struct QueryStateManager {
    shared: Arc<Shared>,
    search: Debouncer<String>,
    settings: QuerySettings,
}

impl QueryStateManager {
    pub fn new(settings: QuerySettings, scope: ViewScope) -> Self {
        let defaults = QueryFilters::for_scope(&scope, settings.per_page);
        let (publisher, _) = watch::channel(defaults.clone());
        let shared = Arc::new(Shared {
            state: Mutex::new(QueryState {
                raw_search: String::new(),
                scope,
                defaults: defaults.clone(),
                filters: defaults,
                total_pages: None,
            }),
            publisher,
        });
        let settled = Arc::downgrade(&shared);
        let search = Debouncer::spawn(settings.debounce, move |raw: String| {
            if let Some(shared) = settled.upgrade() {
                shared.apply_search(raw);
            }
        });
        Self {
            shared,
            search,
            settings,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryFilters> {
        self.shared.publisher.subscribe()
    }

    pub fn filters(&self) -> QueryFilters {
        self.shared.state.lock().filters.clone()
    }

    pub fn defaults(&self) -> QueryFilters {
        self.shared.state.lock().defaults.clone()
    }

    pub fn raw_search(&self) -> String {
        self.shared.state.lock().raw_search.clone()
    }

    pub fn scope(&self) -> ViewScope {
        self.shared.state.lock().scope.clone()
    }

    pub fn total_pages(&self) -> Option<u32> {
        self.shared.state.lock().total_pages
    }

    /// Echoes `raw` immediately; the effective search follows once typing
    /// has been quiet for the debounce window.
    pub fn set_search_term(&self, raw: &str) {
        self.shared.state.lock().raw_search = raw.to_string();
        self.search.push(raw.to_string());
    }

    /// True while the search box holds text the filters have not caught up with.
    pub fn is_search_pending(&self) -> bool {
        let state = self.shared.state.lock();
        SearchQuery::new(&state.raw_search).into_term() != state.filters.search
    }

    /// Commits the current search box value without waiting for the window.
    pub fn submit_search(&self) {
        self.search.cancel();
        let raw = self.raw_search();
        self.shared.apply_search(raw);
    }

    pub fn set_category(&self, category_id: Option<&str>) -> Result<(), QueryError> {
        let category_id = match category_id {
            Some(id) if id.trim().is_empty() => return Err(QueryError::EmptyCategoryId),
            Some(id) => Some(id.trim().to_string()),
            None => None,
        };
        self.shared.update(|_, filters| {
            filters.category_id = category_id;
            filters.page = 1;
            Ok(())
        })
    }

    pub fn set_status(&self, status: Option<ProductStatus>) -> Result<(), QueryError> {
        self.shared.update(|_, filters| {
            filters.status = status;
            filters.page = 1;
            Ok(())
        })
    }

    pub fn set_status_key(&self, status: Option<&str>) -> Result<(), QueryError> {
        let status = status.map(ProductStatus::from_str).transpose()?;
        self.set_status(status)
    }

    pub fn set_price_range(
        &self,
        min_price: Option<f64>,
        max_price: Option<f64>,
    ) -> Result<(), QueryError> {
        let price = PriceFilter::try_new(min_price, max_price, &self.settings.price_bounds)?;
        self.shared.update(|_, filters| {
            filters.min_price = price.min_price;
            filters.max_price = price.max_price;
            filters.page = 1;
            Ok(())
        })
    }

    pub fn set_sort(&self, preset_key: &str) -> Result<(), QueryError> {
        let preset = SortPreset::from_str(preset_key)?;
        let (sort_by, sort_order) = preset.expand();
        self.shared.update(|_, filters| {
            filters.sort_by = sort_by;
            filters.sort_order = sort_order;
            filters.page = 1;
            Ok(())
        })
    }

    pub fn set_per_page(&self, per_page: u32) -> Result<(), QueryError> {
        if per_page == 0 || per_page > MAX_PER_PAGE {
            return Err(QueryError::InvalidPerPage {
                got: per_page,
                max: MAX_PER_PAGE,
            });
        }
        self.shared.update(|_, filters| {
            filters.per_page = per_page;
            filters.page = 1;
            Ok(())
        })
    }

    /// Moves to page `n`, clamped into `[1, total_pages]` of the last
    /// successful page. Returns the page actually selected.
    pub fn set_page(&self, n: u32) -> u32 {
        let mut selected = 1;
        let _ = self.shared.update(|state, filters| {
            let last = state.total_pages.unwrap_or(u32::MAX).max(1);
            selected = n.clamp(1, last);
            filters.page = selected;
            Ok(())
        });
        selected
    }

    /// Restores the initial mount state, including the search box.
    pub fn clear_all(&self) {
        self.search.cancel();
        let _ = self.shared.update(|state, filters| {
            state.raw_search.clear();
            *filters = state.defaults.clone();
            Ok(())
        });
    }

    /// Clears every filter but keeps the current search.
    pub fn clear_filters(&self) {
        let _ = self.shared.update(|state, filters| {
            let search = filters.search.take();
            *filters = QueryFilters {
                search,
                ..state.defaults.clone()
            };
            Ok(())
        });
    }

    /// Switches to another parent context, e.g. a different seller's page.
    pub fn reset_for_context(&self, scope: ViewScope) {
        self.search.cancel();
        let per_page = self.settings.per_page;
        let _ = self.shared.update(|state, filters| {
            state.raw_search.clear();
            state.defaults = QueryFilters::for_scope(&scope, per_page);
            state.scope = scope;
            state.total_pages = None;
            *filters = state.defaults.clone();
            Ok(())
        });
    }

    /// Remembers the page count of the latest committed result for `set_page`.
    pub fn record_result(&self, page: &ResultPage) {
        self.shared.state.lock().total_pages = Some(page.total_pages);
    }
}
