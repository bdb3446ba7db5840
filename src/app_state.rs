use crate::fetch::{Committed, FetchOrchestrator};
use crate::query::{QueryFilters, QueryStateManager, ViewScope};
use crate::render::ResultView;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::debug;

/// Owns the three pipeline components and the task that keeps them in step:
/// every published filter change triggers a `resolve`, and every committed
/// outcome is applied to the view.
#[derive(Debug)]
pub struct AppState {
    pub queries: Arc<QueryStateManager>,
    pub orchestrator: Arc<FetchOrchestrator>,
    pub view: Arc<Mutex<ResultView>>,
    refresh: UnboundedSender<()>,
    applied: watch::Receiver<Option<QueryFilters>>,
    driver: JoinHandle<()>,
}

impl AppState {
    pub fn init(queries: QueryStateManager, orchestrator: FetchOrchestrator) -> Self {
        let queries = Arc::new(queries);
        let orchestrator = Arc::new(orchestrator);
        let view = Arc::new(Mutex::new(ResultView::new(queries.scope())));
        let (refresh, refresh_requests) = unbounded_channel();
        let (applied_tx, applied) = watch::channel(None);
        let driver = tokio::spawn(drive(
            queries.clone(),
            orchestrator.clone(),
            view.clone(),
            refresh_requests,
            applied_tx,
        ));
        Self {
            queries,
            orchestrator,
            view,
            refresh,
            applied,
            driver,
        }
    }

    /// Fetches the current filters again, e.g. after the cache was dropped.
    pub fn refresh(&self) {
        self.view.lock().begin_loading();
        let _ = self.refresh.send(());
    }

    /// Manual retry after a failed fetch. Returns false when nothing failed.
    pub fn retry(&self) -> bool {
        if !self.view.lock().retry() {
            return false;
        }
        let _ = self.refresh.send(());
        true
    }

    /// Call after a product was created, updated or deleted.
    pub fn invalidate_products(&self) -> usize {
        let dropped = self.orchestrator.invalidate_products();
        self.refresh();
        dropped
    }

    pub fn reset_for_context(&self, scope: ViewScope) {
        self.view.lock().reset(scope.clone());
        self.queries.reset_for_context(scope);
        self.refresh();
    }

    pub fn go_to_page(&self, page: u32) -> u32 {
        self.view.lock().go_to(&self.queries, page)
    }

    pub fn render_text(&self) -> String {
        self.view.lock().render_text()
    }

    /// Waits until pending search input has settled and the view shows the
    /// outcome for the current filters.
    pub async fn settled(&self) {
        let mut applied = self.applied.clone();
        loop {
            let current = self.queries.filters();
            let shown = applied.borrow_and_update().as_ref() == Some(&current);
            if shown && !self.queries.is_search_pending() && !self.view.lock().is_loading() {
                return;
            }
            if applied.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

fn spawn_resolve(
    tasks: &mut JoinSet<()>,
    orchestrator: &Arc<FetchOrchestrator>,
    view: &Mutex<ResultView>,
    filters: QueryFilters,
) {
    {
        let mut view = view.lock();
        view.settle();
        view.begin_loading();
    }
    let orchestrator = orchestrator.clone();
    tasks.spawn(async move {
        orchestrator.resolve(filters).await;
    });
}

fn apply_committed(
    committed: Committed,
    queries: &QueryStateManager,
    view: &Mutex<ResultView>,
    applied: &watch::Sender<Option<QueryFilters>>,
) {
    if let Ok(page) = &committed.outcome {
        queries.record_result(page);
    }
    view.lock().apply(committed.filters.clone(), committed.outcome);
    applied.send_replace(Some(committed.filters));
}

async fn drive(
    queries: Arc<QueryStateManager>,
    orchestrator: Arc<FetchOrchestrator>,
    view: Arc<Mutex<ResultView>>,
    mut refresh_requests: UnboundedReceiver<()>,
    applied: watch::Sender<Option<QueryFilters>>,
) {
    let mut filters = queries.subscribe();
    let mut committed = orchestrator.subscribe();
    let mut tasks = JoinSet::new();

    let initial = filters.borrow_and_update().clone();
    spawn_resolve(&mut tasks, &orchestrator, &view, initial);

    loop {
        tokio::select! {
            changed = filters.changed() => {
                if changed.is_err() {
                    break;
                }
                let next = filters.borrow_and_update().clone();
                debug!(key = %next.cache_key(), "filters changed");
                spawn_resolve(&mut tasks, &orchestrator, &view, next);
            }
            request = refresh_requests.recv() => {
                if request.is_none() {
                    break;
                }
                spawn_resolve(&mut tasks, &orchestrator, &view, queries.filters());
            }
            changed = committed.changed() => {
                if changed.is_err() {
                    break;
                }
                let latest = committed.borrow_and_update().clone();
                if let Some(latest) = latest {
                    apply_committed(latest, &queries, &view, &applied);
                }
            }
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }
}
