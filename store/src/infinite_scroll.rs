//! Infinite scroll: a [`ListWindow`] driven by a sentinel record.
//!
//! The sentinel is a record a few positions before the end of the displayed
//! slice. When it becomes visible the window grows, fetching the next page from
//! the store first if the window is close to the end of what is materialized.
//! A sentinel fires at most once: until that fetch resolves, further visibility
//! events are ignored, and the sentinel is bound again afterwards.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use common::search_const::DEFAULT_SENTINEL_OFFSET;
use tracing::debug;

use crate::collection_store::CollectionStore;
use crate::config::StoreKind;
use crate::group_store::SearchGroupStore;
use crate::pagination::{ListWindow, WindowChange, sentinel_index};
use crate::selection::RecordRef;
use crate::store_error::StoreError;


/// Something an [`InfiniteScroll`] can page through.
pub trait Paginated: Clone + Send + Sync + 'static {
    type Record: Send + Sync + 'static;

    fn kind(&self) -> StoreKind;
    fn records(&self) -> Vec<Arc<Self::Record>>;
    /// `(current_count, total_count)`
    fn counts(&self) -> (usize, usize);
    fn wait_until_idle(&self) -> impl Future<Output = ()> + Send;
    fn fetch_more(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

impl<T: Send + Sync + 'static> Paginated for CollectionStore<T> {
    type Record = T;

    fn kind(&self) -> StoreKind {
        CollectionStore::kind(self)
    }

    fn records(&self) -> Vec<Arc<T>> {
        self.list()
    }

    fn counts(&self) -> (usize, usize) {
        self.read(|s| (s.current_count, s.total_count))
    }

    fn wait_until_idle(&self) -> impl Future<Output = ()> + Send {
        CollectionStore::wait_until_idle(self)
    }

    fn fetch_more(&self) -> impl Future<Output = Result<(), StoreError>> + Send {
        self.search(true)
    }
}

impl<T: Send + Sync + 'static> Paginated for SearchGroupStore<T> {
    type Record = T;

    fn kind(&self) -> StoreKind {
        SearchGroupStore::kind(self)
    }

    fn records(&self) -> Vec<Arc<T>> {
        self.list()
    }

    fn counts(&self) -> (usize, usize) {
        (self.current_count(), self.total_count())
    }

    fn wait_until_idle(&self) -> impl Future<Output = ()> + Send {
        self.parent().wait_until_idle()
    }

    fn fetch_more(&self) -> impl Future<Output = Result<(), StoreError>> + Send {
        self.load_more()
    }
}

/// The window keys records by owning handle, so an address seen by the window
/// cannot be reused by a later allocation.
struct ScrollState<R> {
    window: ListWindow<RecordRef<R>>,
    sentinel: Option<usize>,
    pending: bool,
}

/// Clears the pending flag even if the fetch future is dropped.
struct PendingGuard<'a, R> {
    state: &'a Mutex<ScrollState<R>>,
}

impl<R> Drop for PendingGuard<'_, R> {
    fn drop(&mut self) {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).pending = false;
    }
}

pub struct InfiniteScroll<S: Paginated> {
    source: S,
    state: Arc<Mutex<ScrollState<S::Record>>>,
    sentinel_offset: usize,
}

impl<S: Paginated> Clone for InfiniteScroll<S> {
    fn clone(&self) -> Self {
        Self { source: self.source.clone(), state: self.state.clone(), sentinel_offset: self.sentinel_offset }
    }
}

impl<S: Paginated> InfiniteScroll<S> {
    pub fn new(source: S, window: ListWindow<RecordRef<S::Record>>) -> Self {
        Self {
            source,
            state: Arc::new(Mutex::new(ScrollState { window, sentinel: None, pending: false })),
            sentinel_offset: DEFAULT_SENTINEL_OFFSET,
        }
    }

    /// Number of records between the sentinel and the end of the displayed slice.
    pub fn with_sentinel_offset(mut self, offset: usize) -> Self {
        self.sentinel_offset = offset;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn lock(&self) -> MutexGuard<'_, ScrollState<S::Record>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn window(&self) -> ListWindow<RecordRef<S::Record>> {
        self.lock().window.clone()
    }

    /// Compares the source with what the window last saw, resetting the window
    /// when the records were replaced rather than appended.
    pub fn sync_source(&self) -> WindowChange {
        let records = self.source.records();
        self.observe(&records)
    }

    fn observe(&self, records: &[Arc<S::Record>]) -> WindowChange {
        let mut state = self.lock();
        let change = state.window.observe(records, |record| RecordRef(record.clone()));
        if change == WindowChange::Replace {
            state.sentinel = None;
        }
        change
    }

    /// The records currently in the window.
    pub fn displayed(&self) -> Vec<Arc<S::Record>> {
        let records = self.source.records();
        self.observe(&records);
        self.lock().window.displayed(&records).to_vec()
    }

    pub fn has_more_before(&self) -> bool {
        self.lock().window.has_more_before()
    }

    /// Whether "next" would show anything, locally or by fetching.
    pub fn has_more_after(&self) -> bool {
        let records = self.source.records();
        let (current, total) = self.source.counts();
        let state = self.lock();
        state.window.has_more_after(records.len()) || state.window.has_more_to_load(self.source.kind(), current, total)
    }

    /// Waits for any fetch in flight, fetches the next page when the window is
    /// near the end of the materialized records, then moves the window.
    pub async fn handle_next(&self) -> Result<(), StoreError> {
        self.source.wait_until_idle().await;
        self.sync_source();

        let (current, total) = self.source.counts();
        let should_fetch = self.lock().window.has_more_to_load(self.source.kind(), current, total);
        if should_fetch {
            self.source.fetch_more().await?;
        }

        let records = self.source.records();
        self.observe(&records);
        self.lock().window.advance(records.len());
        Ok(())
    }

    pub fn handle_first(&self) {
        self.lock().window.handle_first();
    }

    pub fn handle_previous(&self) {
        self.lock().window.handle_previous();
    }

    pub fn handle_last(&self) {
        let records = self.source.records();
        self.observe(&records);
        self.lock().window.handle_last(records.len(), self.source.kind());
    }

    /// Picks the sentinel among the displayed records. Returns `None` while a
    /// sentinel fetch is pending or when nothing is displayed.
    pub fn bind_sentinel(&self) -> Option<usize> {
        let visible_count = self.displayed().len();
        let mut state = self.lock();
        if state.pending {
            return None;
        }
        state.sentinel = sentinel_index(visible_count, self.sentinel_offset);
        state.sentinel
    }

    /// Reports that the record at `index` of the displayed slice became
    /// visible. Returns whether that fired the sentinel.
    pub async fn sentinel_visible(&self, index: usize) -> Result<bool, StoreError> {
        {
            let mut state = self.lock();
            if state.pending || state.sentinel != Some(index) {
                return Ok(false);
            }
            state.pending = true;
            state.sentinel = None;
        }
        debug!("Sentinel {} visible, loading next page", index);

        let result = {
            let _pending = PendingGuard { state: &self.state };
            self.handle_next().await
        };
        self.bind_sentinel();
        result.map(|_| true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use common::search_query::SearchRequest;
    use common::search_result::{SearchResponse, SearchResults};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    /// Numbered records; every response waits for a permit from `gate`.
    fn gated_store(total: u32, top: usize, gate: Arc<Semaphore>, calls: Arc<AtomicUsize>) -> CollectionStore<u32> {
        CollectionStore::new(
            move |request: SearchRequest| {
                calls.fetch_add(1, Ordering::SeqCst);
                let gate = gate.clone();
                async move {
                    gate.acquire().await?.forget();
                    let start = request.skip as u32;
                    let end = request.top.map(|top| (start + top as u32).min(total)).unwrap_or(total);
                    anyhow::Ok(SearchResponse {
                        results: SearchResults::List((start..end).collect::<Vec<u32>>()),
                        facets: Vec::new(),
                        total_count: total as u64,
                    })
                }
            },
            StoreConfig::server().with_top(top),
        )
    }

    #[tokio::test]
    async fn test_sentinel_fires_once_per_fetch() {
        let gate = Arc::new(Semaphore::new(1));
        let calls = Arc::new(AtomicUsize::new(0));
        let store = gated_store(100, 10, gate.clone(), calls.clone());
        store.search(false).await.unwrap();

        let scroll = InfiniteScroll::new(store.clone(), ListWindow::infinite(10));
        let sentinel = scroll.bind_sentinel().unwrap();
        assert_eq!(sentinel, 4);

        let first = tokio::spawn({
            let scroll = scroll.clone();
            async move { scroll.sentinel_visible(sentinel).await }
        });
        let mut loading = store.watch_loading();
        loading.wait_for(|is_loading| *is_loading).await.unwrap();

        assert!(!scroll.sentinel_visible(sentinel).await.unwrap());
        assert!(!scroll.sentinel_visible(sentinel).await.unwrap());
        assert_eq!(scroll.bind_sentinel(), None);

        gate.add_permits(1);
        assert!(first.await.unwrap().unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(scroll.displayed().len(), 20);
        assert_eq!(scroll.bind_sentinel(), Some(14));
    }

    #[tokio::test]
    async fn test_next_uses_materialized_records_first() {
        let gate = Arc::new(Semaphore::new(100));
        let calls = Arc::new(AtomicUsize::new(0));
        let store = gated_store(100, 30, gate, calls.clone());
        store.search(false).await.unwrap();

        let scroll = InfiniteScroll::new(store.clone(), ListWindow::infinite(10));
        scroll.handle_next().await.unwrap();
        assert_eq!(scroll.displayed().len(), 20);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        scroll.handle_next().await.unwrap();
        assert_eq!(scroll.displayed().len(), 30);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // 30 materialized, 30 shown: within one page of the edge
        scroll.handle_next().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.current_count(), 60);
        assert_eq!(scroll.displayed().len(), 40);

        // server stores cannot jump to the end
        scroll.handle_last();
        assert_eq!(scroll.displayed().len(), 40);
        scroll.handle_first();
        assert_eq!(scroll.displayed().len(), 10);
    }

    #[tokio::test]
    async fn test_fresh_search_resets_window() {
        let gate = Arc::new(Semaphore::new(100));
        let store = gated_store(100, 50, gate, Arc::new(AtomicUsize::new(0)));
        store.search(false).await.unwrap();

        let scroll = InfiniteScroll::new(store.clone(), ListWindow::infinite(10));
        scroll.handle_next().await.unwrap();
        scroll.handle_next().await.unwrap();
        assert_eq!(scroll.displayed().len(), 30);

        store.search(false).await.unwrap();
        assert_eq!(scroll.sync_source(), WindowChange::Replace);
        assert_eq!(scroll.displayed().len(), 10);
        assert!(scroll.has_more_after());
    }

    #[tokio::test]
    async fn test_window_keeps_replaced_records_alive() {
        let gate = Arc::new(Semaphore::new(100));
        let store = gated_store(100, 20, gate, Arc::new(AtomicUsize::new(0)));
        store.search(false).await.unwrap();

        let scroll = InfiniteScroll::new(store.clone(), ListWindow::infinite(10));
        let first = Arc::downgrade(&scroll.displayed()[0]);

        // two fresh searches the window never saw
        store.search(false).await.unwrap();
        store.search(false).await.unwrap();
        assert!(first.upgrade().is_some());

        assert_eq!(scroll.sync_source(), WindowChange::Replace);
        assert!(first.upgrade().is_none());
    }
}
