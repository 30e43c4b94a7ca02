//! Property-based tests using proptest
//!
//! These tests check name-pattern matching, Rison quoting, owner replacement and
//! dashboard layout with randomized inputs.

use proptest::prelude::*;
use superset_toolkit::resource::batch::{matches_pattern, replace_owner};
use superset_toolkit::resource::dashboards::build_position_json;
use superset_toolkit::resource::fetcher::{rison_string, ListQuery, ResourceFilter};
use superset_toolkit::resource::models::DashboardChart;

/// Resource names as they show up in Superset: mixed case, digits, separators
fn arb_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[A-Za-z0-9 _!'-]{0,24}", 0..60)
}

fn filter_names<'a>(names: &'a [String], pattern: &str) -> Vec<&'a String> {
    names.iter().filter(|n| matches_pattern(n, pattern)).collect()
}

proptest! {
    /// Empty pattern selects every resource
    #[test]
    fn empty_pattern_matches_all(names in arb_names()) {
        prop_assert_eq!(filter_names(&names, "").len(), names.len());
    }

    /// Matching never increases the number of items
    #[test]
    fn matching_never_increases_count(names in arb_names(), pattern in ".{0,6}") {
        prop_assert!(filter_names(&names, &pattern).len() <= names.len());
    }

    /// Every selected name contains the pattern verbatim
    #[test]
    fn selected_names_contain_pattern(names in arb_names(), pattern in "[A-Za-z]{1,4}") {
        for name in filter_names(&names, &pattern) {
            prop_assert!(name.contains(pattern.as_str()));
        }
    }

    /// A name always matches itself and any of its prefixes
    #[test]
    fn name_matches_own_prefix(name in "[A-Za-z0-9 ]{1,24}", cut in 0usize..24) {
        let prefix: String = name.chars().take(cut).collect();
        prop_assert!(matches_pattern(&name, &name));
        prop_assert!(matches_pattern(&name, &prefix));
    }

    /// Changing the case of a lowercase pattern stops it matching lowercase names
    #[test]
    fn matching_is_case_sensitive(name in "[a-z]{1,16}", start in 0usize..16, len in 1usize..4) {
        let start = start.min(name.len() - 1);
        let end = (start + len).min(name.len());
        let upper = name[start..end].to_uppercase();
        prop_assert!(matches_pattern(&name, &name[start..end]));
        prop_assert!(!matches_pattern(&name, &upper));
    }
}

/// Tests for Rison quoting
mod rison_tests {
    use super::*;

    /// Undo `rison_string`, failing on anything it could not have produced
    fn unquote(quoted: &str) -> Option<String> {
        let inner = quoted.strip_prefix('\'')?.strip_suffix('\'')?;
        let mut out = String::new();
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            match c {
                '!' => out.push(chars.next().filter(|n| *n == '!' || *n == '\'')?),
                '\'' => return None,
                other => out.push(other),
            }
        }
        Some(out)
    }

    proptest! {
        /// Quoting is reversible for any string
        #[test]
        fn quoted_strings_unquote(s in ".{0,40}") {
            prop_assert_eq!(unquote(&rison_string(&s)), Some(s));
        }

        /// Quoted strings never contain a bare quote that would end them early
        #[test]
        fn no_unescaped_quote_inside(s in "[a-z' !]{0,30}") {
            let quoted = rison_string(&s);
            let inner = &quoted[1..quoted.len() - 1];
            let mut escaped = false;
            for c in inner.chars() {
                if escaped {
                    escaped = false;
                } else if c == '!' {
                    escaped = true;
                } else {
                    prop_assert_ne!(c, '\'');
                }
            }
            prop_assert!(!escaped);
        }

        /// Every filter value shows up quoted inside the page query
        #[test]
        fn list_query_embeds_filters(
            value in "[A-Za-z0-9_' ]{0,20}",
            page in 0usize..50
        ) {
            let filters = [ResourceFilter::eq("table_name", value.as_str())];
            let query = ListQuery { filters: &filters, page, page_size: 100 };
            let rison = query.to_rison();
            let expected_value = format!("value:{}", rison_string(&value));
            let expected_page = format!("page:{},", page);
            prop_assert!(rison.contains(&expected_value));
            prop_assert!(rison.contains(&expected_page));
            prop_assert!(rison.starts_with("(filters:!((col:table_name,opr:eq,"));
            prop_assert!(rison.ends_with("page_size:100)"));
        }
    }
}

/// Tests for ownership migration
mod owner_tests {
    use super::*;

    proptest! {
        /// The new owner is present exactly once and the old one is gone
        #[test]
        fn replacement_swaps_owner(
            owners in prop::collection::vec(1i64..20, 0..8),
            from in 1i64..20,
            to in 20i64..40
        ) {
            let replaced = replace_owner(&owners, from, to);
            prop_assert!(!replaced.contains(&from));
            prop_assert_eq!(replaced.iter().filter(|&&id| id == to).count(), 1);
        }

        /// Co-owners survive the migration in their original order
        #[test]
        fn co_owners_are_kept(
            owners in prop::collection::vec(1i64..20, 0..8),
            from in 1i64..20,
            to in 20i64..40
        ) {
            let kept: Vec<i64> = owners.iter().copied().filter(|&id| id != from).collect();
            let replaced = replace_owner(&owners, from, to);
            prop_assert_eq!(&replaced[..kept.len()], &kept[..]);
        }
    }
}

/// Tests for dashboard layout generation
mod layout_tests {
    use super::*;

    fn charts(n: usize) -> Vec<DashboardChart> {
        (0..n)
            .map(|i| DashboardChart {
                id: i as i64 + 1,
                slice_name: format!("Chart {}", i + 1),
            })
            .collect()
    }

    proptest! {
        /// Every chart gets a node and rows hold at most three charts
        #[test]
        fn every_chart_is_placed(n in 0usize..40) {
            let layout = build_position_json(&charts(n));
            let rows = layout["GRID_ID"]["children"].as_array().cloned().unwrap_or_default();

            prop_assert_eq!(rows.len(), n.div_ceil(3));
            let mut placed = 0;
            for row in &rows {
                let row_id = row.as_str().unwrap();
                let children = layout[row_id]["children"].as_array().unwrap();
                prop_assert!(!children.is_empty() && children.len() <= 3);
                placed += children.len();
            }
            prop_assert_eq!(placed, n);

            for chart in charts(n) {
                let key = format!("CHART-{}", chart.id);
                prop_assert_eq!(layout[key.as_str()]["meta"]["chartId"].as_i64(), Some(chart.id));
            }
        }
    }
}
