use common::search_query::SearchRequest;

use crate::api::search::search_filter::filter_records;
use crate::local_dataset::LocalDataset;

pub fn search_for_results_hit_count<T>(dataset: &LocalDataset<T>, request: &SearchRequest) -> u64 {
    filter_records(dataset, request, None).len() as u64
}
