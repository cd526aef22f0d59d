//! Collection and search store: query state, facets, pagination and selection
//! over a pluggable search service.

pub mod collection_store;
pub mod config;
pub mod criteria_tokenizer;
pub mod facet_engine;
pub mod group_store;
pub mod infinite_scroll;
pub mod pagination;
pub mod search_bar;
pub mod search_service;
pub mod selection;
pub mod store_error;
pub mod subscription;

#[cfg(feature = "local")]
mod local;

pub use collection_store::{CollectionStore, StoreProperties, StoreState};
pub use config::{StoreConfig, StoreKind};
pub use group_store::SearchGroupStore;
pub use infinite_scroll::{InfiniteScroll, Paginated};
pub use pagination::{ListWindow, PaginationMode, WindowChange};
pub use search_bar::CriteriaInput;
pub use search_service::SearchService;
pub use selection::{SelectionStatus, SelectionTracker};
pub use store_error::StoreError;
pub use subscription::Subscription;
