//! Facet visibility and facet selection updates.
//!
//! Every mutation returns a new [`InputFacets`] map and leaves its argument
//! untouched. Mutations that describe an impossible UI state (excluding on a
//! facet that cannot exclude, toggling the operator of a single-valued facet)
//! are ignored and return an unchanged copy.

use common::search_query::{FacetMode, InputFacet, InputFacets};
use common::search_result::FacetOutput;
use tracing::debug;


/// A facet is hidden when it has no values, or when it has a single value that
/// covers every record and the user has not picked that value.
pub fn should_display_facet(
    facet: &FacetOutput,
    input_facets: &InputFacets,
    show_single_valued_facets: bool,
    total_count: usize,
) -> bool {
    if facet.values.is_empty() {
        return false;
    }
    if show_single_valued_facets || facet.values.len() != 1 {
        return true;
    }
    let only = &facet.values[0];
    if only.count != total_count as u64 {
        return true;
    }
    input_facets.get(&facet.code).map(|input| input.mentions(&only.code)).unwrap_or(false)
}

/// Facets to render, in response order. The grouping facet is never offered
/// as a filter.
pub fn visible_facets<'a>(
    facets: &'a [FacetOutput],
    input_facets: &InputFacets,
    grouping_key: Option<&str>,
    show_single_valued_facets: bool,
    total_count: usize,
) -> Vec<&'a FacetOutput> {
    facets
        .iter()
        .filter(|facet| Some(facet.code.as_str()) != grouping_key)
        .filter(|facet| should_display_facet(facet, input_facets, show_single_valued_facets, total_count))
        .collect()
}

/// Whether values of this facet may currently be offered for exclusion. A
/// single-valued facet stops offering exclusion once a value is selected.
pub fn can_exclude_values(facet: &FacetOutput, input_facets: &InputFacets) -> bool {
    if !facet.can_exclude {
        return false;
    }
    facet.is_multi_valued || input_facets.get(&facet.code).map(|i| i.selected.is_empty()).unwrap_or(true)
}

pub fn add_facet_value(input_facets: &InputFacets, facet: &FacetOutput, value_code: &str, mode: FacetMode) -> InputFacets {
    if mode == FacetMode::Excluded && !can_exclude_values(facet, input_facets) {
        debug!("Ignoring exclusion of {} on facet {}", value_code, facet.code);
        return input_facets.clone();
    }

    let mut next = input_facets.clone();
    let entry = next.entry(facet.code.clone()).or_default();
    if !facet.is_multi_valued && mode == FacetMode::Selected {
        entry.selected.clear();
        entry.excluded.clear();
    }
    match mode {
        FacetMode::Selected => {
            entry.excluded.remove(value_code);
            entry.selected.insert(value_code.to_string());
        }
        FacetMode::Excluded => {
            entry.selected.remove(value_code);
            entry.excluded.insert(value_code.to_string());
        }
    }
    next
}

/// Removes one value from both sides, or the whole facet entry when no value is given.
pub fn remove_facet_value(input_facets: &InputFacets, facet_code: &str, value_code: Option<&str>) -> InputFacets {
    let mut next = input_facets.clone();
    match value_code {
        None => {
            next.remove(facet_code);
        }
        Some(value_code) => {
            if let Some(entry) = next.get_mut(facet_code) {
                entry.selected.remove(value_code);
                entry.excluded.remove(value_code);
                if entry.is_empty() {
                    next.remove(facet_code);
                }
            }
        }
    }
    next
}

pub fn toggle_facet_operator(input_facets: &InputFacets, facet: &FacetOutput) -> InputFacets {
    if !(facet.is_multi_valued && facet.is_multi_selectable) {
        debug!("Ignoring operator toggle on facet {}", facet.code);
        return input_facets.clone();
    }
    let mut next = input_facets.clone();
    let entry: &mut InputFacet = next.entry(facet.code.clone()).or_default();
    entry.operator = entry.operator.flipped();
    next
}

/// Grouping needs a facet of the last response with more than one value.
pub fn can_group_by(facets: &[FacetOutput], facet_code: &str) -> bool {
    facets.iter().any(|f| f.code == facet_code && f.values.len() > 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::search_query::FacetOperator;
    use common::search_result::FacetValue;
    use std::collections::BTreeSet;

    fn facet(code: &str, values: &[(&str, u64)]) -> FacetOutput {
        FacetOutput {
            code: code.to_string(),
            label: code.to_uppercase(),
            is_multi_selectable: false,
            is_multi_valued: false,
            can_exclude: false,
            values: values.iter().map(|(c, n)| FacetValue::new(*c, *c, *n)).collect(),
        }
    }

    fn tags() -> FacetOutput {
        FacetOutput {
            is_multi_selectable: true,
            is_multi_valued: true,
            can_exclude: true,
            ..facet("tags", &[("bug", 4), ("ui", 2), ("docs", 1)])
        }
    }

    #[test]
    fn test_single_value_covering_everything_is_hidden_until_selected() {
        let country = facet("country", &[("FR", 10)]);
        let empty = InputFacets::new();
        assert!(!should_display_facet(&country, &empty, false, 10));
        assert!(should_display_facet(&country, &empty, true, 10));
        assert!(should_display_facet(&country, &empty, false, 12));

        let selected = add_facet_value(&empty, &country, "FR", FacetMode::Selected);
        assert!(should_display_facet(&country, &selected, false, 10));
    }

    #[test]
    fn test_facet_without_values_is_hidden() {
        let country = facet("country", &[]);
        assert!(!should_display_facet(&country, &InputFacets::new(), true, 0));
    }

    #[test]
    fn test_single_valued_selection_is_replaced() {
        let country = facet("country", &[("FR", 3), ("DE", 2)]);
        let input = add_facet_value(&InputFacets::new(), &country, "FR", FacetMode::Selected);
        let input = add_facet_value(&input, &country, "DE", FacetMode::Selected);
        assert_eq!(input["country"].selected, BTreeSet::from(["DE".to_string()]));
    }

    #[test]
    fn test_mutations_do_not_touch_the_original() {
        let country = facet("country", &[("FR", 3), ("DE", 2)]);
        let original = add_facet_value(&InputFacets::new(), &country, "FR", FacetMode::Selected);
        let snapshot = original.clone();
        let _ = add_facet_value(&original, &country, "DE", FacetMode::Selected);
        let _ = remove_facet_value(&original, "country", None);
        assert_eq!(original, snapshot);
    }

    #[test]
    fn test_multi_valued_accumulates_idempotently() {
        let tags = tags();
        let input = add_facet_value(&InputFacets::new(), &tags, "bug", FacetMode::Selected);
        let input = add_facet_value(&input, &tags, "ui", FacetMode::Selected);
        let input = add_facet_value(&input, &tags, "ui", FacetMode::Selected);
        assert_eq!(input["tags"].selected.len(), 2);

        let input = add_facet_value(&input, &tags, "docs", FacetMode::Excluded);
        let input = add_facet_value(&input, &tags, "ui", FacetMode::Excluded);
        assert_eq!(input["tags"].selected, BTreeSet::from(["bug".to_string()]));
        assert_eq!(input["tags"].excluded, BTreeSet::from(["docs".to_string(), "ui".to_string()]));
    }

    #[test]
    fn test_exclusion_rules() {
        let country = facet("country", &[("FR", 3), ("DE", 2), ("IT", 1)]);
        let input = add_facet_value(&InputFacets::new(), &country, "FR", FacetMode::Excluded);
        assert!(input.is_empty());

        let country = FacetOutput { can_exclude: true, ..country };
        let input = add_facet_value(&InputFacets::new(), &country, "FR", FacetMode::Excluded);
        let input = add_facet_value(&input, &country, "DE", FacetMode::Excluded);
        assert_eq!(input["country"].excluded.len(), 2);
        assert!(can_exclude_values(&country, &input));

        // selecting clears the exclusions and disables further ones
        let input = add_facet_value(&input, &country, "IT", FacetMode::Selected);
        assert!(input["country"].excluded.is_empty());
        assert!(!can_exclude_values(&country, &input));
        let after = add_facet_value(&input, &country, "FR", FacetMode::Excluded);
        assert_eq!(after, input);
    }

    #[test]
    fn test_remove_value_and_whole_facet() {
        let tags = tags();
        let input = add_facet_value(&InputFacets::new(), &tags, "bug", FacetMode::Selected);
        let input = add_facet_value(&input, &tags, "docs", FacetMode::Excluded);

        let fewer = remove_facet_value(&input, "tags", Some("docs"));
        assert!(fewer["tags"].excluded.is_empty());
        assert_eq!(fewer["tags"].selected.len(), 1);

        let none = remove_facet_value(&fewer, "tags", Some("bug"));
        assert!(!none.contains_key("tags"));
        assert!(!remove_facet_value(&input, "tags", None).contains_key("tags"));
    }

    #[test]
    fn test_operator_toggle_only_for_multi_facets() {
        let tags = tags();
        let input = toggle_facet_operator(&InputFacets::new(), &tags);
        assert_eq!(input["tags"].operator, FacetOperator::And);
        let input = toggle_facet_operator(&input, &tags);
        assert_eq!(input["tags"].operator, FacetOperator::Or);

        let country = facet("country", &[("FR", 3), ("DE", 2)]);
        assert!(toggle_facet_operator(&InputFacets::new(), &country).is_empty());
    }

    #[test]
    fn test_visible_facets_skip_grouping_facet() {
        let facets = vec![facet("country", &[("FR", 3), ("DE", 2)]), tags(), facet("lang", &[("fr", 5)])];
        let visible = visible_facets(&facets, &InputFacets::new(), Some("country"), false, 5);
        assert_eq!(visible.iter().map(|f| f.code.as_str()).collect::<Vec<_>>(), vec!["tags"]);
        assert!(can_group_by(&facets, "country"));
        assert!(!can_group_by(&facets, "lang"));
        assert!(!can_group_by(&facets, "missing"));
    }
}
