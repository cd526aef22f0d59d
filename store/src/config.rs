use std::sync::Arc;

use common::search_const::{DEFAULT_MAX_SORT, PAGE_SIZE};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    /// Everything is fetched in one request; paging is purely client-side.
    Local,
    /// Records are fetched page by page as the user scrolls.
    #[default]
    Server,
}

type SelectablePredicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

pub struct StoreConfig<T> {
    pub kind: StoreKind,
    /// Records requested per server page.
    pub top: usize,
    /// Maximum number of sort columns.
    pub max_sort: usize,
    pub show_single_valued_facets: bool,
    /// Records for which this returns false never get selected by "select all".
    pub is_item_selectionnable: Option<SelectablePredicate<T>>,
}

impl<T> Clone for StoreConfig<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            top: self.top,
            max_sort: self.max_sort,
            show_single_valued_facets: self.show_single_valued_facets,
            is_item_selectionnable: self.is_item_selectionnable.clone(),
        }
    }
}

impl<T> std::fmt::Debug for StoreConfig<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("kind", &self.kind)
            .field("top", &self.top)
            .field("max_sort", &self.max_sort)
            .field("show_single_valued_facets", &self.show_single_valued_facets)
            .field("is_item_selectionnable", &self.is_item_selectionnable.is_some())
            .finish()
    }
}

impl<T> Default for StoreConfig<T> {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            top: PAGE_SIZE,
            max_sort: DEFAULT_MAX_SORT,
            show_single_valued_facets: false,
            is_item_selectionnable: None,
        }
    }
}

impl<T> StoreConfig<T> {
    pub fn local() -> Self {
        Self { kind: StoreKind::Local, ..Self::default() }
    }

    pub fn server() -> Self {
        Self { kind: StoreKind::Server, ..Self::default() }
    }

    /// Defaults for `kind`, overridden by `COLLECTION_PAGE_SIZE`,
    /// `COLLECTION_MAX_SORT` and `COLLECTION_SHOW_SINGLE_VALUED_FACETS`.
    pub fn from_env(kind: StoreKind) -> Self {
        let mut config = Self { kind, ..Self::default() };
        if let Some(top) = env_parse::<usize>("COLLECTION_PAGE_SIZE").filter(|top| *top > 0) {
            config.top = top;
        }
        if let Some(max_sort) = env_parse::<usize>("COLLECTION_MAX_SORT") {
            config.max_sort = max_sort;
        }
        if let Some(show) = env_parse::<bool>("COLLECTION_SHOW_SINGLE_VALUED_FACETS") {
            config.show_single_valued_facets = show;
        }
        config
    }

    pub fn with_top(mut self, top: usize) -> Self {
        self.top = top;
        self
    }

    pub fn with_max_sort(mut self, max_sort: usize) -> Self {
        self.max_sort = max_sort;
        self
    }

    pub fn with_single_valued_facets(mut self, show: bool) -> Self {
        self.show_single_valued_facets = show;
        self
    }

    pub fn with_selectable(mut self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.is_item_selectionnable = Some(Arc::new(predicate));
        self
    }

    pub fn is_selectable(&self, record: &T) -> bool {
        self.is_item_selectionnable.as_ref().map(|p| p(record)).unwrap_or(true)
    }
}

fn env_parse<V: std::str::FromStr>(name: &str) -> Option<V> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
