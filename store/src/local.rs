//! Stores answered by the in-memory backend.

use backend::LocalSearchBackend;
use common::search_query::SearchRequest;

use crate::collection_store::CollectionStore;
use crate::config::StoreConfig;


impl<T: Clone + Send + Sync + 'static> CollectionStore<T> {
    /// A store whose transport function is a [`LocalSearchBackend`].
    pub fn from_local_backend(backend: LocalSearchBackend<T>, config: StoreConfig<T>) -> Self {
        Self::new(
            move |request: SearchRequest| {
                let backend = backend.clone();
                async move { backend.search(request).await }
            },
            config,
        )
    }
}
