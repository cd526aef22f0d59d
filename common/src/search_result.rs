use std::collections::HashSet;

use serde::{Deserialize, Serialize};


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetValue {
    pub code: String,
    pub label: String,
    pub count: u64,
}

impl FacetValue {
    pub fn new(code: impl Into<String>, label: impl Into<String>, count: u64) -> Self {
        Self { code: code.into(), label: label.into(), count }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetOutput {
    pub code: String,
    pub label: String,
    #[serde(default)]
    pub is_multi_selectable: bool,
    #[serde(default)]
    pub is_multi_valued: bool,
    #[serde(default)]
    pub can_exclude: bool,
    pub values: Vec<FacetValue>,
}

impl FacetOutput {
    pub fn value(&self, value_code: &str) -> Option<&FacetValue> {
        self.values.iter().find(|v| v.code == value_code)
    }

    /// Drops values whose code was already seen, keeping the first occurrence.
    /// Returns the number of values removed.
    pub fn dedup_values(&mut self) -> usize {
        let before = self.values.len();
        let mut present_values = HashSet::new();
        self.values.retain(|v| present_values.insert(v.code.clone()));
        before - self.values.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResult<T> {
    pub code: String,
    pub label: String,
    pub list: Vec<T>,
    pub total_count: u64,
}

/// Either a flat list or an ordered sequence of groups, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchResults<T> {
    List(Vec<T>),
    Groups(Vec<GroupResult<T>>),
}

impl<T> Default for SearchResults<T> {
    fn default() -> Self {
        SearchResults::List(Vec::new())
    }
}

impl<T> SearchResults<T> {
    /// Number of records carried, summed across groups.
    pub fn record_count(&self) -> usize {
        match self {
            SearchResults::List(list) => list.len(),
            SearchResults::Groups(groups) => groups.iter().map(|g| g.list.len()).sum(),
        }
    }

    pub fn is_grouped(&self) -> bool {
        matches!(self, SearchResults::Groups(_))
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> SearchResults<U> {
        match self {
            SearchResults::List(list) => SearchResults::List(list.into_iter().map(&mut f).collect()),
            SearchResults::Groups(groups) => SearchResults::Groups(
                groups
                    .into_iter()
                    .map(|g| GroupResult {
                        code: g.code,
                        label: g.label,
                        list: g.list.into_iter().map(&mut f).collect(),
                        total_count: g.total_count,
                    })
                    .collect(),
            ),
        }
    }
}

/// Response of a search service. `results` flattens to a `list` or `groups` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse<T> {
    #[serde(flatten)]
    pub results: SearchResults<T>,
    #[serde(default)]
    pub facets: Vec<FacetOutput>,
    pub total_count: u64,
}
