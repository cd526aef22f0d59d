//! The collection store: query state, results, facets and selection of one
//! list or search surface.
//!
//! State lives behind a synchronous mutex that is never held across an
//! `.await`. Fetches go through a per-store async gate, so at most one request
//! is in flight and responses are applied in the order requests were issued.
//! A response is applied under a single lock: readers never see the new total
//! next to the old list.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use common::search_query::{Criteria, FacetMode, InputFacet, InputFacets, SearchRequest, SortSpec};
use common::search_result::{FacetOutput, GroupResult, SearchResponse, SearchResults};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::{StoreConfig, StoreKind};
use crate::facet_engine;
use crate::group_store::SearchGroupStore;
use crate::pagination::ListWindow;
use crate::search_service::SearchService;
use crate::selection::{RecordRef, SelectionStatus, SelectionTracker};
use crate::store_error::StoreError;
use crate::subscription::{self, Listeners, Subscription, lock_listeners};


/// Partial update merged by [`CollectionStore::set_properties`]. `None` fields
/// are left as they are; `grouping_key: Some(None)` clears the grouping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreProperties {
    pub query: Option<String>,
    pub criteria: Option<Criteria>,
    pub sort: Option<SortSpec>,
    pub grouping_key: Option<Option<String>>,
    pub input_facets: Option<InputFacets>,
}

/// Everything a consumer can observe about a store. Derived values are methods
/// so they are always computed from the current fields.
pub struct StoreState<T> {
    pub query: String,
    pub criteria: Criteria,
    pub sort: SortSpec,
    pub grouping_key: Option<String>,
    pub input_facets: InputFacets,
    pub facets: Vec<FacetOutput>,
    pub results: SearchResults<Arc<T>>,
    pub total_count: usize,
    pub current_count: usize,
    pub is_loading: bool,
    pub selection: SelectionTracker<T>,
    /// Request (without paging) the materialized results answer.
    results_request: Option<SearchRequest>,
    config: Arc<StoreConfig<T>>,
}

impl<T> Clone for StoreState<T> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            criteria: self.criteria.clone(),
            sort: self.sort.clone(),
            grouping_key: self.grouping_key.clone(),
            input_facets: self.input_facets.clone(),
            facets: self.facets.clone(),
            results: self.results.clone(),
            total_count: self.total_count,
            current_count: self.current_count,
            is_loading: self.is_loading,
            selection: self.selection.clone(),
            results_request: self.results_request.clone(),
            config: self.config.clone(),
        }
    }
}

impl<T> StoreState<T> {
    fn new(config: Arc<StoreConfig<T>>) -> Self {
        Self {
            query: String::new(),
            criteria: Criteria::new(),
            sort: SortSpec::new(),
            grouping_key: None,
            input_facets: InputFacets::new(),
            facets: Vec::new(),
            results: SearchResults::default(),
            total_count: 0,
            current_count: 0,
            is_loading: false,
            selection: SelectionTracker::new(),
            results_request: None,
            config,
        }
    }

    pub fn kind(&self) -> StoreKind {
        self.config.kind
    }

    /// Flat results; empty while grouped.
    pub fn list(&self) -> &[Arc<T>] {
        match &self.results {
            SearchResults::List(list) => list,
            SearchResults::Groups(_) => &[],
        }
    }

    /// Grouped results; empty while flat.
    pub fn groups(&self) -> &[GroupResult<Arc<T>>] {
        match &self.results {
            SearchResults::List(_) => &[],
            SearchResults::Groups(groups) => groups,
        }
    }

    pub fn group(&self, code: &str) -> Option<&GroupResult<Arc<T>>> {
        self.groups().iter().find(|g| g.code == code)
    }

    /// Every materialized record, across groups.
    pub fn records(&self) -> Vec<Arc<T>> {
        match &self.results {
            SearchResults::List(list) => list.clone(),
            SearchResults::Groups(groups) => groups.iter().flat_map(|g| g.list.iter().cloned()).collect(),
        }
    }

    /// Materialized records that "select all" may select.
    pub fn eligible_records(&self) -> Vec<Arc<T>> {
        self.records().into_iter().filter(|r| self.config.is_selectable(r)).collect()
    }

    pub fn selection_status(&self) -> SelectionStatus {
        self.selection.status(&self.eligible_records())
    }

    pub fn visible_facets(&self) -> Vec<&FacetOutput> {
        facet_engine::visible_facets(
            &self.facets,
            &self.input_facets,
            self.grouping_key.as_deref(),
            self.config.show_single_valued_facets,
            self.total_count,
        )
    }

    pub fn has_more_to_load<K>(&self, window: &ListWindow<K>) -> bool {
        window.has_more_to_load(self.kind(), self.current_count, self.total_count)
    }

    pub(crate) fn base_request(&self) -> SearchRequest {
        let grouped = self.grouping_key.is_some();
        SearchRequest {
            query: self.query.clone(),
            criteria: self.criteria.clone(),
            facets: self.input_facets.clone(),
            group: self.grouping_key.clone().unwrap_or_default(),
            sort: if grouped { SortSpec::new() } else { self.sort.clone() },
            skip: 0,
            top: None,
        }
    }

    pub(crate) fn results_match(&self, base: &SearchRequest) -> bool {
        self.results_request.as_ref() == Some(base)
    }

    fn is_materialized(&self, record: &Arc<T>) -> bool {
        let identity = RecordRef::identity(record);
        self.records().iter().any(|r| RecordRef::identity(r) == identity)
    }

    fn apply_sort(&mut self, mut sort: SortSpec) {
        if self.grouping_key.is_some() {
            debug!("Ignoring sort while grouped by {:?}", self.grouping_key);
            return;
        }
        sort.truncate(self.config.max_sort);
        self.sort = sort;
    }

    fn apply_grouping_key(&mut self, grouping_key: Option<String>) {
        let Some(code) = grouping_key else {
            self.grouping_key = None;
            return;
        };
        if !facet_engine::can_group_by(&self.facets, &code) {
            debug!("Ignoring grouping by {}: not a facet with several values", code);
            return;
        }
        // grouping and filtering on the same facet, or grouping and sorting, are exclusive
        self.input_facets = facet_engine::remove_facet_value(&self.input_facets, &code, None);
        self.sort = SortSpec::new();
        self.grouping_key = Some(code);
    }

    /// Grouping and filtering on the same facet are exclusive.
    fn drop_grouping_filter(&mut self) {
        let Some(code) = &self.grouping_key else {
            return;
        };
        if self.input_facets.contains_key(code) {
            debug!("Dropping filter on grouping facet {}", code);
            self.input_facets = facet_engine::remove_facet_value(&self.input_facets, code, None);
        }
    }

    fn apply_response(&mut self, response: SearchResponse<T>, is_append: bool, base: SearchRequest) {
        let SearchResponse { results, mut facets, total_count } = response;
        for facet in facets.iter_mut() {
            let dropped = facet.dedup_values();
            if dropped > 0 {
                warn!("Facet {} returned {} duplicate values", facet.code, dropped);
            }
        }

        let results = results.map(Arc::new);
        if is_append && !self.results.is_grouped() && !results.is_grouped() {
            if let (SearchResults::List(current), SearchResults::List(more)) = (&mut self.results, results) {
                current.extend(more);
            }
        } else {
            if is_append {
                warn!("Append response changed the result shape, replacing results");
            }
            self.results = results;
            let materialized = self.records().iter().map(RecordRef::identity).collect::<HashSet<_>>();
            self.selection.retain(|r| materialized.contains(&RecordRef::identity(r)));
        }

        self.facets = facets;
        self.current_count = self.results.record_count();
        let total_count = usize::try_from(total_count).unwrap_or(usize::MAX);
        if total_count < self.current_count {
            warn!("Service reported {} results but {} are materialized", total_count, self.current_count);
        }
        self.total_count = total_count.max(self.current_count);

        if let Some(key) = &self.grouping_key {
            if !self.facets.iter().any(|f| &f.code == key) {
                warn!("Grouping facet {} is gone from the response, clearing it", key);
                self.grouping_key = None;
            }
        }
        self.results_request = Some(base);
    }

    fn append_to_group(&mut self, code: &str, response: SearchResponse<T>) {
        let SearchResults::List(more) = response.results else {
            warn!("Group page for {} came back grouped, ignoring it", code);
            return;
        };
        let SearchResults::Groups(groups) = &mut self.results else {
            return;
        };
        let Some(group) = groups.iter_mut().find(|g| g.code == code) else {
            return;
        };
        group.list.extend(more.into_iter().map(Arc::new));
        group.total_count = response.total_count.max(group.list.len() as u64);
        self.current_count = self.results.record_count();
        self.total_count = self.total_count.max(self.current_count);
    }
}

struct StoreInner<T> {
    config: Arc<StoreConfig<T>>,
    service: Arc<dyn SearchService<T>>,
    state: Mutex<StoreState<T>>,
    fetch_gate: tokio::sync::Mutex<()>,
    loading: watch::Sender<bool>,
    listeners: Arc<Mutex<Listeners<StoreState<T>>>>,
}

/// Shared handle to one store. Clones point at the same state.
pub struct CollectionStore<T> {
    inner: Arc<StoreInner<T>>,
}

impl<T> Clone for CollectionStore<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T> std::fmt::Debug for CollectionStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionStore").field("config", &self.inner.config).finish_non_exhaustive()
    }
}

/// Marks a store as loading for as long as it lives, even if the fetch future
/// is dropped halfway.
struct LoadingGuard<'a, T> {
    store: &'a CollectionStore<T>,
}

impl<'a, T> LoadingGuard<'a, T> {
    fn start(store: &'a CollectionStore<T>) -> Self {
        store.lock_state().is_loading = true;
        store.inner.loading.send_replace(true);
        store.notify();
        Self { store }
    }
}

impl<T> Drop for LoadingGuard<'_, T> {
    fn drop(&mut self) {
        self.store.lock_state().is_loading = false;
        self.store.inner.loading.send_replace(false);
        self.store.notify();
    }
}

impl<T> CollectionStore<T> {
    pub fn new(service: impl SearchService<T> + 'static, config: StoreConfig<T>) -> Self {
        let config = Arc::new(config);
        let (loading, _) = watch::channel(false);
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(StoreState::new(config.clone())),
                config,
                service: Arc::new(service),
                fetch_gate: tokio::sync::Mutex::new(()),
                loading,
                listeners: Arc::new(Mutex::new(Listeners::default())),
            }),
        }
    }

    pub fn kind(&self) -> StoreKind {
        self.inner.config.kind
    }

    pub fn config(&self) -> &StoreConfig<T> {
        &self.inner.config
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, StoreState<T>> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs every listener against the current state.
    fn notify(&self) {
        let mut listeners = lock_listeners(&self.inner.listeners);
        if listeners.is_empty() {
            return;
        }
        let snapshot = self.lock_state().clone();
        listeners.notify(&snapshot);
    }

    /// Applies one synchronous change, then notifies listeners once.
    pub(crate) fn update<R>(&self, change: impl FnOnce(&mut StoreState<T>) -> R) -> R {
        let result = {
            let mut state = self.lock_state();
            change(&mut state)
        };
        self.notify();
        result
    }

    /// Reads the current state without copying it.
    pub fn read<R>(&self, read: impl FnOnce(&StoreState<T>) -> R) -> R {
        read(&self.lock_state())
    }

    pub fn snapshot(&self) -> StoreState<T> {
        self.lock_state().clone()
    }

    pub fn query(&self) -> String {
        self.read(|s| s.query.clone())
    }

    pub fn criteria(&self) -> Criteria {
        self.read(|s| s.criteria.clone())
    }

    pub fn sort(&self) -> SortSpec {
        self.read(|s| s.sort.clone())
    }

    pub fn grouping_key(&self) -> Option<String> {
        self.read(|s| s.grouping_key.clone())
    }

    pub fn input_facets(&self) -> InputFacets {
        self.read(|s| s.input_facets.clone())
    }

    pub fn facets(&self) -> Vec<FacetOutput> {
        self.read(|s| s.facets.clone())
    }

    pub fn visible_facets(&self) -> Vec<FacetOutput> {
        self.read(|s| s.visible_facets().into_iter().cloned().collect())
    }

    pub fn list(&self) -> Vec<Arc<T>> {
        self.read(|s| s.list().to_vec())
    }

    pub fn groups(&self) -> Vec<GroupResult<Arc<T>>> {
        self.read(|s| s.groups().to_vec())
    }

    pub fn records(&self) -> Vec<Arc<T>> {
        self.read(|s| s.records())
    }

    pub fn total_count(&self) -> usize {
        self.read(|s| s.total_count)
    }

    pub fn current_count(&self) -> usize {
        self.read(|s| s.current_count)
    }

    pub fn is_loading(&self) -> bool {
        self.read(|s| s.is_loading)
    }

    pub fn selection_status(&self) -> SelectionStatus {
        self.read(|s| s.selection_status())
    }

    pub fn selected_items(&self) -> Vec<Arc<T>> {
        self.read(|s| s.selection.items())
    }

    pub fn is_selected(&self, record: &Arc<T>) -> bool {
        self.read(|s| s.selection.contains(record))
    }

    pub fn has_more_to_load<K>(&self, window: &ListWindow<K>) -> bool {
        self.read(|s| s.has_more_to_load(window))
    }

    /// Whether values of the facet may currently be offered for exclusion.
    pub fn can_exclude_values(&self, facet_code: &str) -> bool {
        self.read(|s| {
            s.facets
                .iter()
                .find(|f| f.code == facet_code)
                .map(|f| facet_engine::can_exclude_values(f, &s.input_facets))
                .unwrap_or(false)
        })
    }

    /// Merges a partial update. Does not search.
    pub fn set_properties(&self, properties: StoreProperties) {
        self.update(|state| {
            let StoreProperties { query, criteria, sort, grouping_key, input_facets } = properties;
            if let Some(query) = query {
                state.query = query;
            }
            if let Some(criteria) = criteria {
                state.criteria = criteria;
            }
            if let Some(input_facets) = input_facets {
                state.input_facets = input_facets;
            }
            if let Some(grouping_key) = grouping_key {
                state.apply_grouping_key(grouping_key);
            }
            if let Some(sort) = sort {
                state.apply_sort(sort);
            }
            state.drop_grouping_filter();
        })
    }

    pub fn set_query(&self, query: impl Into<String>) {
        let query = query.into();
        self.update(|state| state.query = query)
    }

    /// Replaces the sort, truncated to `max_sort`. Ignored while grouped.
    pub fn set_sort(&self, sort: SortSpec) {
        self.update(|state| state.apply_sort(sort))
    }

    /// Groups by a facet with several values, dropping that facet's filter and
    /// the sort; `None` ungroups. Invalid keys are ignored.
    pub fn set_grouping_key(&self, grouping_key: Option<String>) {
        self.update(|state| state.apply_grouping_key(grouping_key))
    }

    pub fn add_facet_value(&self, facet_code: &str, value_code: &str, mode: FacetMode) {
        self.update(|state| {
            if state.grouping_key.as_deref() == Some(facet_code) {
                debug!("Ignoring filter on grouping facet {}", facet_code);
                return;
            }
            let Some(facet) = state.facets.iter().find(|f| f.code == facet_code) else {
                debug!("Ignoring filter on unknown facet {}", facet_code);
                return;
            };
            state.input_facets = facet_engine::add_facet_value(&state.input_facets, facet, value_code, mode);
        })
    }

    pub fn remove_facet_value(&self, facet_code: &str, value_code: Option<&str>) {
        self.update(|state| {
            state.input_facets = facet_engine::remove_facet_value(&state.input_facets, facet_code, value_code);
        })
    }

    pub fn toggle_facet_operator(&self, facet_code: &str) {
        self.update(|state| {
            let Some(facet) = state.facets.iter().find(|f| f.code == facet_code) else {
                debug!("Ignoring operator toggle on unknown facet {}", facet_code);
                return;
            };
            state.input_facets = facet_engine::toggle_facet_operator(&state.input_facets, facet);
        })
    }

    /// Selects or deselects one materialized record. Returns whether it is
    /// selected afterwards.
    pub fn toggle(&self, record: &Arc<T>) -> bool {
        self.update(|state| {
            let selectable = state.is_materialized(record) && state.config.is_selectable(record);
            if !state.selection.contains(record) && !selectable {
                debug!("Ignoring selection of a record that is not selectable");
                return false;
            }
            state.selection.toggle(record)
        })
    }

    /// Clears the selection if anything is selected, otherwise selects every
    /// eligible materialized record.
    pub fn toggle_all(&self) {
        self.update(|state| {
            let eligible = state.eligible_records();
            state.selection.toggle_all(&eligible);
        })
    }

    pub fn clear_selection(&self) {
        self.update(|state| state.selection.clear())
    }

    /// Calls `callback` each time `selector` gives a different value after a
    /// state change. Callbacks may read the store but must not mutate it.
    pub fn subscribe<V>(
        &self,
        selector: impl Fn(&StoreState<T>) -> V + Send + 'static,
        callback: impl FnMut(&V) + Send + 'static,
    ) -> Subscription
    where
        T: 'static,
        V: PartialEq + Send + 'static,
    {
        let current = self.snapshot();
        subscription::subscribe(&self.inner.listeners, &current, selector, callback)
    }

    pub fn watch_loading(&self) -> watch::Receiver<bool> {
        self.inner.loading.subscribe()
    }

    /// Resolves once no fetch is in flight.
    pub async fn wait_until_idle(&self) {
        let mut loading = self.inner.loading.subscribe();
        let _ = loading.wait_for(|is_loading| !*is_loading).await;
    }

    pub fn get_search_group_store(&self, group_code: &str) -> SearchGroupStore<T> {
        SearchGroupStore::new(self.clone(), group_code.to_string())
    }

    /// Runs a search, waiting behind any search already in flight. A fresh
    /// search replaces the results; an append adds the next page.
    pub async fn search(&self, is_append: bool) -> Result<(), StoreError> {
        let _gate = self.inner.fetch_gate.lock().await;
        self.run_search(is_append).await
    }

    /// Like [`search`](Self::search), but fails with [`StoreError::Busy`]
    /// instead of waiting.
    pub async fn try_search(&self, is_append: bool) -> Result<(), StoreError> {
        let Ok(_gate) = self.inner.fetch_gate.try_lock() else {
            return Err(StoreError::Busy);
        };
        self.run_search(is_append).await
    }

    fn prepare_request(&self, is_append: bool) -> Option<(SearchRequest, SearchRequest)> {
        let state = self.lock_state();
        let base = state.base_request();
        if is_append {
            if state.kind() == StoreKind::Local {
                debug!("Local store holds every record, nothing to append");
                return None;
            }
            if state.results.is_grouped() {
                debug!("Grouped results load more per group");
                return None;
            }
            if !state.results_match(&base) {
                debug!("Skipping append: the query changed since the results were fetched");
                return None;
            }
            if state.current_count >= state.total_count {
                return None;
            }
        }

        let mut request = base.clone();
        request.skip = if is_append { state.current_count } else { 0 };
        request.top = match state.kind() {
            StoreKind::Local => None,
            StoreKind::Server => Some(self.inner.config.top),
        };
        Some((request, base))
    }

    async fn run_search(&self, is_append: bool) -> Result<(), StoreError> {
        let Some((request, base)) = self.prepare_request(is_append) else {
            return Ok(());
        };
        let _loading = LoadingGuard::start(self);
        info!(
            "Search: query={:?} group={:?} skip={} top={:?} append={}",
            request.query, request.group, request.skip, request.top, is_append
        );

        match self.inner.service.search(request).await {
            Ok(response) => {
                let mut state = self.lock_state();
                state.apply_response(response, is_append, base);
                state.is_loading = false;
                info!("Search done: {} of {} materialized", state.current_count, state.total_count);
                Ok(())
            }
            Err(err) => {
                error!("Search failed: {:#}", err);
                Err(StoreError::Service(err))
            }
        }
    }

    /// Fetches the next page of one group, through the same gate as `search`.
    pub(crate) async fn load_group_page(&self, group_code: &str) -> Result<(), StoreError> {
        let _gate = self.inner.fetch_gate.lock().await;

        let prepared = {
            let state = self.lock_state();
            let base = state.base_request();
            match (&state.grouping_key, state.group(group_code)) {
                (Some(grouping_key), Some(group)) if state.results_match(&base) => {
                    if group.list.len() as u64 >= group.total_count {
                        None
                    } else {
                        let mut request = base.clone();
                        request.group = String::new();
                        request.facets.insert(
                            grouping_key.clone(),
                            InputFacet { selected: [group_code.to_string()].into(), ..Default::default() },
                        );
                        request.skip = group.list.len();
                        request.top = Some(self.inner.config.top);
                        Some((request, base))
                    }
                }
                _ => {
                    debug!("Group {} is not materialized, nothing to load", group_code);
                    None
                }
            }
        };
        let Some((request, base)) = prepared else {
            return Ok(());
        };

        let _loading = LoadingGuard::start(self);
        info!("Group search: group={} skip={} top={:?}", group_code, request.skip, request.top);
        match self.inner.service.search(request).await {
            Ok(response) => {
                let mut state = self.lock_state();
                if state.results_match(&base) {
                    state.append_to_group(group_code, response);
                }
                state.is_loading = false;
                Ok(())
            }
            Err(err) => {
                error!("Group search failed: {:#}", err);
                Err(StoreError::Service(err))
            }
        }
    }
}
