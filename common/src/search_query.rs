//! Shared search query models and helpers.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use serde::{Deserialize, Serialize};


/// Free-form named search parameters. A missing key means "no value".
pub type Criteria = BTreeMap<String, CriteriaValue>;

/// Selection state of every facet the user has touched, keyed by facet code.
pub type InputFacets = BTreeMap<String, InputFacet>;

/// Ordered multi-column sort.
pub type SortSpec = Vec<SortField>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Eq, PartialOrd, Ord)]
#[serde(untagged)]
pub enum CriteriaValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Display for CriteriaValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CriteriaValue::Bool(b) => write!(f, "{}", b),
            CriteriaValue::Int(i) => write!(f, "{}", i),
            CriteriaValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for CriteriaValue {
    fn from(value: &str) -> Self {
        CriteriaValue::Text(value.to_string())
    }
}

impl From<String> for CriteriaValue {
    fn from(value: String) -> Self {
        CriteriaValue::Text(value)
    }
}

impl From<i64> for CriteriaValue {
    fn from(value: i64) -> Self {
        CriteriaValue::Int(value)
    }
}

impl From<bool> for CriteriaValue {
    fn from(value: bool) -> Self {
        CriteriaValue::Bool(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FacetOperator {
    And,
    #[default]
    Or,
}

impl FacetOperator {
    pub fn flipped(self) -> Self {
        match self {
            FacetOperator::And => FacetOperator::Or,
            FacetOperator::Or => FacetOperator::And,
        }
    }
}

/// Which side of an [`InputFacet`] a value code is added to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FacetMode {
    Selected,
    Excluded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InputFacet {
    pub selected: BTreeSet<String>,
    pub excluded: BTreeSet<String>,
    pub operator: FacetOperator,
}

impl InputFacet {
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty() && self.excluded.is_empty()
    }

    /// True if the code is either selected or excluded.
    pub fn mentions(&self, value_code: &str) -> bool {
        self.selected.contains(value_code) || self.excluded.contains(value_code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "camelCase")]
pub struct SortField {
    pub field_name: String,
    pub sort_descending: bool,
}

impl SortField {
    pub fn ascending(field_name: impl Into<String>) -> Self {
        Self { field_name: field_name.into(), sort_descending: false }
    }
    pub fn descending(field_name: impl Into<String>) -> Self {
        Self { field_name: field_name.into(), sort_descending: true }
    }
}

/// Request sent to a search service.
///
/// `group` is empty when the results are not grouped. `top` of `None` asks for
/// every remaining record (used by local stores).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: String,
    pub criteria: Criteria,
    pub facets: InputFacets,
    pub group: String,
    pub sort: SortSpec,
    pub skip: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<usize>,
}

impl SearchRequest {
    pub fn is_grouped(&self) -> bool {
        !self.group.is_empty()
    }
}
