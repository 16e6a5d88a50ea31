//! # Property-Based Tests
//!
//! Scope validation and data-source inference over arbitrary scope lists.

use copilot_core::{DataSource, RetrievalRequest, Scope, ScopeError, ScopeSet, infer_data_source};
use proptest::collection::vec;
use proptest::prelude::*;

fn known_scope() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("ExternalItem.Read.All"),
        Just("Files.Read.All"),
        Just("Sites.Read.All"),
    ]
}

fn unknown_scope() -> impl Strategy<Value = String> {
    "[A-Za-z]{1,12}\\.[A-Za-z]{1,8}"
        .prop_filter("must not be an accepted scope", |s| s.parse::<Scope>().is_err())
}

proptest! {
    /// Exactly one of Files/Sites present always trips the pairing rule.
    #[test]
    fn unpaired_files_or_sites_is_rejected(
        with_external in any::<bool>(),
        files_not_sites in any::<bool>(),
        repeat in 1usize..4,
    ) {
        let lone = if files_not_sites { "Files.Read.All" } else { "Sites.Read.All" };
        let mut values: Vec<&str> = vec![lone; repeat];
        if with_external {
            values.push("ExternalItem.Read.All");
        }
        prop_assert_eq!(ScopeSet::parse(&values), Err(ScopeError::Unpaired));
    }

    /// Lists made only of unknown values name the first one.
    #[test]
    fn unknown_values_report_first(values in vec(unknown_scope(), 1..6)) {
        prop_assert_eq!(
            ScopeSet::parse(&values),
            Err(ScopeError::Invalid(values[0].clone()))
        );
    }

    /// Any accepted list either validates or fails only on pairing.
    #[test]
    fn known_values_fail_only_on_pairing(values in vec(known_scope(), 1..8)) {
        let has_files = values.contains(&"Files.Read.All");
        let has_sites = values.contains(&"Sites.Read.All");
        match ScopeSet::parse(&values) {
            Ok(set) => {
                prop_assert_eq!(has_files, has_sites);
                prop_assert!(!set.is_empty());
            }
            Err(e) => {
                prop_assert_eq!(e, ScopeError::Unpaired);
                prop_assert_ne!(has_files, has_sites);
            }
        }
    }

    /// Inference picks externalItem exactly when no Files/Sites scope is held.
    #[test]
    fn inference_follows_scope_set(values in vec(known_scope(), 1..8)) {
        if let Ok(set) = ScopeSet::parse(&values) {
            let expected = if set.contains(Scope::FilesReadAll) {
                None
            } else {
                Some(DataSource::ExternalItem)
            };
            prop_assert_eq!(infer_data_source(&set), expected);
        }
    }

    /// In-range result counts pass through unchanged.
    #[test]
    fn result_count_in_range_is_kept(max in 1i64..=25) {
        let set = ScopeSet::parse(&["ExternalItem.Read.All"]).expect("valid");
        let request = RetrievalRequest::build("q", None, None, Some(max), &set).expect("valid");
        prop_assert_eq!(request.maximum_number_of_results as i64, max);
    }
}
