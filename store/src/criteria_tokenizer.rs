//! Splits search-bar text into `key:value` criteria and free text, and back.
//!
//! Parsing never fails: anything that does not look like a known criterion is
//! kept as free text.

use std::collections::{BTreeSet, HashSet};

use common::search_query::{Criteria, CriteriaValue};


#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedInput {
    /// Recognized criteria, in typing order.
    pub criteria: Vec<(String, String)>,
    /// Everything after the last recognized criterion.
    pub residual_query: String,
}

impl ParsedInput {
    pub fn typed_keys(&self) -> Vec<String> {
        self.criteria.iter().map(|(key, _)| key.clone()).collect()
    }
}

fn split_criterion<'a>(token: &'a str, known_keys: &BTreeSet<String>) -> Option<(&'a str, &'a str)> {
    let (key, value) = token.split_once(':')?;
    if value.is_empty() || !known_keys.contains(key) {
        return None;
    }
    Some((key, value))
}

/// Consumes leading `key:value` tokens while the key is known and not seen yet.
/// Stops at the first token that does not qualify; the rest is the residual query.
pub fn parse(raw: &str, known_keys: &BTreeSet<String>) -> ParsedInput {
    let tokens = raw.split(' ').collect::<Vec<_>>();
    let mut seen = HashSet::new();
    let mut criteria = Vec::new();
    let mut consumed = 0;

    for token in tokens.iter() {
        let Some((key, value)) = split_criterion(token, known_keys) else {
            break;
        };
        if !seen.insert(key) {
            break;
        }
        criteria.push((key.to_string(), value.to_string()));
        consumed += 1;
    }

    let mut residual_query = tokens[consumed..].join(" ");
    if consumed > 0 && residual_query.trim().is_empty() {
        // only trailing spaces left: keep them so the cursor does not jump back
        residual_query = raw[raw.trim_end_matches(' ').len()..].to_string();
    }

    ParsedInput { criteria, residual_query }
}

/// Returns the criteria after a parse: known keys that were not typed are
/// cleared, typed keys take their text value, unknown keys are left alone.
pub fn apply_criteria(parsed: &ParsedInput, known_keys: &BTreeSet<String>, current: &Criteria) -> Criteria {
    let mut criteria = current
        .iter()
        .filter(|(key, _)| !known_keys.contains(*key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect::<Criteria>();
    for (key, value) in parsed.criteria.iter() {
        criteria.insert(key.clone(), CriteriaValue::Text(value.clone()));
    }
    criteria
}

/// Rebuilds the search-bar text: typed criteria in typing order, then the other
/// criteria in map order, then the query.
pub fn render(typed_order: &[String], criteria: &Criteria, residual_query: &str) -> String {
    let mut parts = Vec::with_capacity(criteria.len());
    for key in typed_order.iter() {
        if let Some(value) = criteria.get(key) {
            parts.push(format!("{}:{}", key, value));
        }
    }
    for (key, value) in criteria.iter() {
        if typed_order.contains(key) {
            continue;
        }
        parts.push(format!("{}:{}", key, value));
    }

    let mut text = parts.join(" ");
    if !text.is_empty() && !residual_query.trim().is_empty() {
        text.push(' ');
    }
    text.push_str(residual_query);
    text
}
