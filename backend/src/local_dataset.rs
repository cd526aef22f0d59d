//! In-memory record set with the accessors the search endpoints need.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use common::search_query::Criteria;


type BucketsFn<T> = Box<dyn Fn(&T) -> Vec<FacetBucket> + Send + Sync>;
type CompareFn<T> = Box<dyn Fn(&T, &T) -> Ordering + Send + Sync>;
type TextMatchFn<T> = Box<dyn Fn(&T, &str) -> bool + Send + Sync>;
type CriteriaMatchFn<T> = Box<dyn Fn(&T, &Criteria) -> bool + Send + Sync>;

/// One facet value a record belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FacetBucket {
    pub code: String,
    pub label: String,
}

impl FacetBucket {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self { code: code.into(), label: label.into() }
    }

    /// Bucket whose label is its code.
    pub fn plain(code: impl Into<String>) -> Self {
        let code = code.into();
        Self { label: code.clone(), code }
    }
}

pub struct FacetDefinition<T> {
    pub code: String,
    pub label: String,
    pub is_multi_selectable: bool,
    pub is_multi_valued: bool,
    pub can_exclude: bool,
    buckets: BucketsFn<T>,
}

impl<T> FacetDefinition<T> {
    pub fn new(
        code: impl Into<String>,
        label: impl Into<String>,
        buckets: impl Fn(&T) -> Vec<FacetBucket> + Send + Sync + 'static,
    ) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
            is_multi_selectable: false,
            is_multi_valued: false,
            can_exclude: false,
            buckets: Box::new(buckets),
        }
    }

    pub fn multi_selectable(mut self) -> Self {
        self.is_multi_selectable = true;
        self
    }

    pub fn multi_valued(mut self) -> Self {
        self.is_multi_valued = true;
        self
    }

    pub fn excludable(mut self) -> Self {
        self.can_exclude = true;
        self
    }

    pub fn buckets(&self, record: &T) -> Vec<FacetBucket> {
        (self.buckets)(record)
    }

    /// True if the record carries the given value code.
    pub fn has_value(&self, record: &T, value_code: &str) -> bool {
        self.buckets(record).iter().any(|b| b.code == value_code)
    }
}

/// Records plus the facet, sort and matching rules used to search them.
pub struct LocalDataset<T> {
    records: Vec<T>,
    facets: Vec<FacetDefinition<T>>,
    sort_fields: BTreeMap<String, CompareFn<T>>,
    text_match: Option<TextMatchFn<T>>,
    criteria_match: Option<CriteriaMatchFn<T>>,
}

impl<T> LocalDataset<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self {
            records,
            facets: Vec::new(),
            sort_fields: BTreeMap::new(),
            text_match: None,
            criteria_match: None,
        }
    }

    pub fn with_facet(mut self, facet: FacetDefinition<T>) -> Self {
        self.facets.push(facet);
        self
    }

    pub fn with_sort_field(
        mut self,
        field_name: impl Into<String>,
        compare: impl Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    ) -> Self {
        self.sort_fields.insert(field_name.into(), Box::new(compare));
        self
    }

    /// Free-text matcher. Without one, every record matches any query.
    pub fn with_text_match(mut self, matcher: impl Fn(&T, &str) -> bool + Send + Sync + 'static) -> Self {
        self.text_match = Some(Box::new(matcher));
        self
    }

    /// Criteria matcher. Without one, criteria do not filter.
    pub fn with_criteria_match(mut self, matcher: impl Fn(&T, &Criteria) -> bool + Send + Sync + 'static) -> Self {
        self.criteria_match = Some(Box::new(matcher));
        self
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn facets(&self) -> &[FacetDefinition<T>] {
        &self.facets
    }

    pub fn facet(&self, code: &str) -> Option<&FacetDefinition<T>> {
        self.facets.iter().find(|f| f.code == code)
    }

    pub fn sort_comparator(&self, field_name: &str) -> Option<&CompareFn<T>> {
        self.sort_fields.get(field_name)
    }

    pub fn matches_text(&self, record: &T, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        match &self.text_match {
            Some(matcher) => matcher(record, query),
            None => true,
        }
    }

    pub fn matches_criteria(&self, record: &T, criteria: &Criteria) -> bool {
        if criteria.is_empty() {
            return true;
        }
        match &self.criteria_match {
            Some(matcher) => matcher(record, criteria),
            None => true,
        }
    }
}
