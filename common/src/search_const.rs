//! Defaults shared by the store and the backends.

/// Records fetched per server page.
pub const PAGE_SIZE: usize = 50;

/// Maximum number of sort columns a store accepts.
pub const DEFAULT_MAX_SORT: usize = 1;

/// Facet values returned per facet by the in-memory backend.
pub const FACET_VALUE_LIMIT: usize = 21;

/// Distance from the end of the rendered list of the infinite-scroll sentinel.
pub const DEFAULT_SENTINEL_OFFSET: usize = 5;
