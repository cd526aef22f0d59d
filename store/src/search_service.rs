//! The transport seam: whatever answers a [`SearchRequest`].

use std::future::Future;

use common::search_query::SearchRequest;
use common::search_result::SearchResponse;
use futures_util::future::BoxFuture;


pub trait SearchService<T>: Send + Sync {
    fn search(&self, request: SearchRequest) -> BoxFuture<'static, anyhow::Result<SearchResponse<T>>>;
}

/// Any async transport function is a search service.
impl<T, F, Fut> SearchService<T> for F
where
    F: Fn(SearchRequest) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<SearchResponse<T>>> + Send + 'static,
{
    fn search(&self, request: SearchRequest) -> BoxFuture<'static, anyhow::Result<SearchResponse<T>>> {
        Box::pin(self(request))
    }
}
