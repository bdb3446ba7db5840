use crate::data_models::ResultPage;
use crate::fetch::FetchError;
use crate::query::{QueryFilters, QueryStateManager, ViewScope};
use std::fmt::Write;
use tracing::debug;

mod empty_state;
mod pagination;
mod rows;

pub use empty_state::EmptyState;
pub use pagination::{page_window, PageItem, MAX_UNFOLDED_PAGES};
pub use rows::{format_price, ProductRow};

#[derive(Debug, Clone, PartialEq)]
pub enum ViewPhase {
    Idle,
    Loading,
    Success,
    Failure(FetchError),
}

/// What the user is offered after a failed fetch.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Affordance {
    Retry,
    Reauthenticate,
    FixFilters,
}

impl From<&FetchError> for Affordance {
    fn from(error: &FetchError) -> Self {
        match error {
            FetchError::Network(_) | FetchError::Unknown(_) => Affordance::Retry,
            FetchError::Auth(_) => Affordance::Reauthenticate,
            FetchError::Validation(_) => Affordance::FixFilters,
        }
    }
}

/// Projects fetch outcomes into rows, pagination controls and failure
/// affordances. A failed fetch keeps the last good page on screen.
#[derive(Debug)]
pub struct ResultView {
    scope: ViewScope,
    phase: ViewPhase,
    page: Option<ResultPage>,
    filters: Option<QueryFilters>,
}

impl ResultView {
    pub fn new(scope: ViewScope) -> Self {
        Self {
            scope,
            phase: ViewPhase::Idle,
            page: None,
            filters: None,
        }
    }

    pub fn phase(&self) -> &ViewPhase {
        &self.phase
    }

    pub fn page(&self) -> Option<&ResultPage> {
        self.page.as_ref()
    }

    pub fn filters(&self) -> Option<&QueryFilters> {
        self.filters.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.phase == ViewPhase::Loading
    }

    /// Switches to another listing context and forgets what was shown.
    pub fn reset(&mut self, scope: ViewScope) {
        *self = Self::new(scope);
    }

    /// A shown success settles to `Idle` before the next cycle starts.
    pub fn begin_loading(&mut self) {
        self.settle();
        if self.phase != ViewPhase::Loading {
            debug!(from = ?self.phase, "view loading");
            self.phase = ViewPhase::Loading;
        }
    }

    pub fn apply(&mut self, filters: QueryFilters, outcome: Result<ResultPage, FetchError>) {
        match outcome {
            Ok(page) => {
                self.page = Some(page);
                self.filters = Some(filters);
                self.phase = ViewPhase::Success;
            }
            Err(error) => {
                if self.page.is_none() {
                    self.filters = Some(filters);
                }
                self.phase = ViewPhase::Failure(error);
            }
        }
    }

    /// Re-enters `Loading` after a failure. Returns false in any other phase.
    pub fn retry(&mut self) -> bool {
        if !matches!(self.phase, ViewPhase::Failure(_)) {
            return false;
        }
        self.phase = ViewPhase::Loading;
        true
    }

    pub fn settle(&mut self) {
        if self.phase == ViewPhase::Success {
            self.phase = ViewPhase::Idle;
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match &self.phase {
            ViewPhase::Failure(error) => Some(error),
            _ => None,
        }
    }

    pub fn affordance(&self) -> Option<Affordance> {
        self.error().map(Affordance::from)
    }

    pub fn rows(&self) -> Vec<ProductRow> {
        self.page
            .iter()
            .flat_map(|page| page.items.iter())
            .map(ProductRow::from)
            .collect()
    }

    pub fn page_items(&self) -> Vec<PageItem> {
        self.page
            .as_ref()
            .map(|page| page_window(page.page, page.total_pages))
            .unwrap_or_default()
    }

    pub fn empty_state(&self) -> Option<EmptyState> {
        let page = self.page.as_ref()?;
        let filters = self.filters.as_ref()?;
        if !page.is_empty() {
            return None;
        }
        Some(EmptyState::for_view(filters, &self.scope))
    }

    /// Hands a pagination click back to the query state. Returns the page
    /// that was actually selected after clamping.
    pub fn go_to(&mut self, queries: &QueryStateManager, page: u32) -> u32 {
        self.settle();
        queries.set_page(page)
    }

    pub fn next_page(&mut self, queries: &QueryStateManager) -> Option<u32> {
        let page = self.page.as_ref()?;
        if page.page >= page.total_pages {
            return None;
        }
        let next = page.page + 1;
        Some(self.go_to(queries, next))
    }

    pub fn previous_page(&mut self, queries: &QueryStateManager) -> Option<u32> {
        let page = self.page.as_ref()?;
        if page.page <= 1 {
            return None;
        }
        let previous = page.page - 1;
        Some(self.go_to(queries, previous))
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        match &self.page {
            None => match &self.phase {
                ViewPhase::Failure(error) => {
                    let _ = writeln!(out, "Could not load products: {error}");
                }
                ViewPhase::Loading => out.push_str("Loading...\n"),
                ViewPhase::Idle | ViewPhase::Success => {}
            },
            Some(page) => {
                if let Some(empty) = self.empty_state() {
                    let _ = writeln!(out, "{empty}");
                }
                for row in self.rows() {
                    let _ = writeln!(out, "{row}");
                }
                if page.total_pages > 0 {
                    let controls = self
                        .page_items()
                        .iter()
                        .map(|item| match item {
                            PageItem::Page(n) if *n == page.page => format!("[{n}]"),
                            item => item.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(" ");
                    let _ = writeln!(
                        out,
                        "Page {} of {} ({} results)  {controls}",
                        page.page, page.total_pages, page.total
                    );
                }
                if let Some(error) = self.error() {
                    let _ = writeln!(out, "! {error}");
                }
            }
        }
        match self.affordance() {
            Some(Affordance::Retry) => out.push_str("[retry]\n"),
            Some(Affordance::Reauthenticate) => out.push_str("[log in again]\n"),
            Some(Affordance::FixFilters) => out.push_str("[adjust filters]\n"),
            None => {}
        }
        out
    }
}
