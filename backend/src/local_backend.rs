//! Search service over a [`LocalDataset`].

use std::sync::Arc;

use common::search_query::SearchRequest;
use common::search_result::SearchResponse;
use tracing::info;

use crate::api::search::{search_facets, search_for_results, search_for_results_hit_count, search_filter::validate_request};
use crate::config::LocalBackendConfig;
use crate::local_dataset::LocalDataset;


pub struct LocalSearchBackend<T> {
    dataset: Arc<LocalDataset<T>>,
    config: LocalBackendConfig,
}

impl<T> Clone for LocalSearchBackend<T> {
    fn clone(&self) -> Self {
        Self { dataset: self.dataset.clone(), config: self.config.clone() }
    }
}

impl<T: Clone> LocalSearchBackend<T> {
    pub fn new(dataset: LocalDataset<T>) -> Self {
        Self::with_config(dataset, LocalBackendConfig::default())
    }

    pub fn with_config(dataset: LocalDataset<T>, config: LocalBackendConfig) -> Self {
        Self { dataset: Arc::new(dataset), config }
    }

    pub fn dataset(&self) -> &LocalDataset<T> {
        &self.dataset
    }

    /// Answers one request: results (flat or grouped), facets and total count.
    pub async fn search(&self, request: SearchRequest) -> anyhow::Result<SearchResponse<T>> {
        if let Some(latency) = self.config.latency {
            tokio::time::sleep(latency).await;
        }
        validate_request(&self.dataset, &request)?;

        let (results, total_count) = search_for_results(&self.dataset, &request)?;
        let facets = search_facets(&self.dataset, &request, self.config.facet_value_limit);
        info!(
            "Local search: query={:?} group={:?} skip={} top={:?} -> {} of {}",
            request.query,
            request.group,
            request.skip,
            request.top,
            results.record_count(),
            total_count
        );
        Ok(SearchResponse { results, facets, total_count })
    }

    pub async fn hit_count(&self, request: SearchRequest) -> anyhow::Result<u64> {
        validate_request(&self.dataset, &request)?;
        Ok(search_for_results_hit_count(&self.dataset, &request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_dataset::{FacetBucket, FacetDefinition};
    use common::search_query::{FacetOperator, InputFacet, SortField};
    use common::search_result::SearchResults;

    #[derive(Debug, Clone, PartialEq)]
    struct Ticket {
        id: u32,
        title: &'static str,
        status: &'static str,
        tags: Vec<&'static str>,
    }

    fn ticket(id: u32, title: &'static str, status: &'static str, tags: &[&'static str]) -> Ticket {
        Ticket { id, title, status, tags: tags.to_vec() }
    }

    fn backend() -> LocalSearchBackend<Ticket> {
        let dataset = LocalDataset::new(vec![
            ticket(1, "crash on start", "open", &["bug", "ui"]),
            ticket(2, "slow search", "open", &["perf"]),
            ticket(3, "typo in docs", "closed", &["docs"]),
            ticket(4, "crash on save", "open", &["bug"]),
            ticket(5, "add export", "closed", &["feature", "ui"]),
        ])
        .with_facet(
            FacetDefinition::new("status", "Status", |t: &Ticket| vec![FacetBucket::plain(t.status)]).excludable(),
        )
        .with_facet(
            FacetDefinition::new("tags", "Tags", |t: &Ticket| t.tags.iter().map(|tag| FacetBucket::plain(*tag)).collect())
                .multi_valued()
                .multi_selectable()
                .excludable(),
        )
        .with_sort_field("id", |a: &Ticket, b: &Ticket| a.id.cmp(&b.id))
        .with_text_match(|t: &Ticket, query: &str| t.title.contains(query));
        LocalSearchBackend::new(dataset)
    }

    fn ids(results: &SearchResults<Ticket>) -> Vec<u32> {
        match results {
            SearchResults::List(list) => list.iter().map(|t| t.id).collect(),
            SearchResults::Groups(_) => panic!("expected a flat list"),
        }
    }

    fn selected(codes: &[&str]) -> InputFacet {
        InputFacet { selected: codes.iter().map(|c| c.to_string()).collect(), ..Default::default() }
    }

    #[tokio::test]
    async fn test_text_query_and_paging() {
        let backend = backend();
        let request = SearchRequest { query: "crash ".to_string(), top: Some(1), ..Default::default() };
        let response = backend.search(request).await.unwrap();
        assert_eq!(response.total_count, 2);
        assert_eq!(ids(&response.results), vec![1]);

        let request = SearchRequest { query: "crash".to_string(), skip: 1, top: Some(1), ..Default::default() };
        let response = backend.search(request).await.unwrap();
        assert_eq!(ids(&response.results), vec![4]);
    }

    #[tokio::test]
    async fn test_facet_counts_ignore_their_own_filter() {
        let backend = backend();
        let mut request = SearchRequest::default();
        request.facets.insert("status".to_string(), selected(&["open"]));
        let response = backend.search(request).await.unwrap();
        assert_eq!(response.total_count, 3);

        let status = response.facets.iter().find(|f| f.code == "status").unwrap();
        assert_eq!(status.value("open").unwrap().count, 3);
        assert_eq!(status.value("closed").unwrap().count, 2);
        assert!(status.can_exclude);

        // other facets are counted inside the status filter
        let tags = response.facets.iter().find(|f| f.code == "tags").unwrap();
        assert_eq!(tags.value("bug").unwrap().count, 2);
        assert!(tags.value("docs").is_none());
        assert_eq!(tags.values[0].code, "bug");
    }

    #[tokio::test]
    async fn test_and_or_and_exclusion() {
        let backend = backend();

        let mut request = SearchRequest { sort: vec![SortField::ascending("id")], ..Default::default() };
        request.facets.insert("tags".to_string(), selected(&["bug", "ui"]));
        let response = backend.search(request.clone()).await.unwrap();
        assert_eq!(ids(&response.results), vec![1, 4, 5]);

        request.facets.get_mut("tags").unwrap().operator = FacetOperator::And;
        let response = backend.search(request.clone()).await.unwrap();
        assert_eq!(ids(&response.results), vec![1]);

        let mut request = SearchRequest { sort: vec![SortField::descending("id")], ..Default::default() };
        request.facets.insert(
            "tags".to_string(),
            InputFacet { excluded: ["ui".to_string()].into(), ..Default::default() },
        );
        let response = backend.search(request).await.unwrap();
        assert_eq!(ids(&response.results), vec![4, 3, 2]);
    }

    #[tokio::test]
    async fn test_grouped_results() {
        let backend = backend();
        let request = SearchRequest {
            group: "status".to_string(),
            sort: vec![SortField::ascending("id")],
            top: Some(2),
            ..Default::default()
        };
        let response = backend.search(request).await.unwrap();
        assert_eq!(response.total_count, 5);
        let SearchResults::Groups(groups) = response.results else {
            panic!("expected groups");
        };
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].code, "open");
        assert_eq!(groups[0].total_count, 3);
        assert_eq!(groups[0].list.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(groups[1].code, "closed");
        assert_eq!(groups[1].list.len(), 2);
    }

    #[tokio::test]
    async fn test_selected_value_stays_listed_when_empty() {
        let backend = backend();
        let mut request = SearchRequest::default();
        request.facets.insert("status".to_string(), selected(&["archived"]));
        let response = backend.search(request).await.unwrap();
        assert_eq!(response.total_count, 0);
        let status = response.facets.iter().find(|f| f.code == "status").unwrap();
        assert_eq!(status.value("archived").unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_unknown_names_are_rejected() {
        let backend = backend();
        let request = SearchRequest { group: "owner".to_string(), ..Default::default() };
        assert!(backend.search(request).await.is_err());

        let request = SearchRequest { sort: vec![SortField::ascending("title")], ..Default::default() };
        assert!(backend.search(request).await.is_err());

        let mut request = SearchRequest::default();
        request.facets.insert("owner".to_string(), selected(&["me"]));
        assert!(backend.hit_count(request).await.is_err());
    }

    #[tokio::test]
    async fn test_hit_count() {
        let backend = backend();
        let mut request = SearchRequest::default();
        request.facets.insert("status".to_string(), selected(&["closed"]));
        assert_eq!(backend.hit_count(request).await.unwrap(), 2);
    }
}
