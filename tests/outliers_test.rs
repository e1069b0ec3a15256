use proptest::prelude::*;
use statlab::stats::outliers::{
    clean_groups, identify_outliers, identify_outliers_across, identify_outliers_within,
    outlier_bounds, OutlierMethod, OutlierScope,
};
use statlab::stats;

fn method_strategy() -> impl Strategy<Value = OutlierMethod> {
    prop_oneof![
        (0.5..3.0f64).prop_map(|multiplier| OutlierMethod::Iqr { multiplier }),
        (1.0..4.0f64).prop_map(|threshold| OutlierMethod::ZScore { threshold }),
        (1.0..5.0f64).prop_map(|threshold| OutlierMethod::Mad { threshold }),
    ]
}

proptest! {
    #[test]
    fn across_scope_uses_pooled_bounds(
        groups in prop::collection::vec(prop::collection::vec(-50.0..50.0f64, 1..15), 1..5),
        method in method_strategy(),
    ) {
        let pooled: Vec<f64> = groups.iter().flatten().copied().collect();
        let flagged = identify_outliers_across(&groups, method);
        prop_assert_eq!(flagged.len(), groups.len());

        match outlier_bounds(&pooled, method) {
            Some(bounds) => {
                for (group, indices) in groups.iter().zip(flagged.iter()) {
                    let expected: Vec<usize> = (0..group.len())
                        .filter(|&i| group[i] < bounds.lower || group[i] > bounds.upper)
                        .collect();
                    prop_assert_eq!(indices, &expected);
                }
            }
            None => prop_assert!(flagged.iter().all(|f| f.is_empty())),
        }
    }

    #[test]
    fn flagged_indices_are_sorted_and_in_range(
        data in prop::collection::vec(-1000.0..1000.0f64, 0..40),
        method in method_strategy(),
    ) {
        let flagged = identify_outliers(&data, method);
        prop_assert!(flagged.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(flagged.iter().all(|&i| i < data.len()));
    }
}

#[test]
fn test_scope_changes_the_anova() {
    // Each group has a point that is only extreme relative to its own group
    let groups = vec![
        vec![10.0, 11.0, 10.5, 9.5, 10.0, 10.5, 16.0],
        vec![14.0, 15.0, 14.5, 15.5, 14.0, 15.0, 8.0],
        vec![12.0, 12.5, 11.5, 12.0, 13.0, 12.5, 12.0],
    ];

    let within = identify_outliers_within(&groups, OutlierMethod::iqr());
    let across = identify_outliers_across(&groups, OutlierMethod::iqr());
    assert_eq!(within[0], vec![6]);
    assert_eq!(within[1], vec![6]);
    assert!(across.iter().all(|f| f.is_empty()));

    let cleaned_within = clean_groups(&groups, OutlierMethod::iqr(), OutlierScope::Within);
    let cleaned_across = clean_groups(&groups, OutlierMethod::iqr(), OutlierScope::Across);
    let f_within = stats::one_way_anova(&cleaned_within, 0.05).unwrap().into_value().f_statistic;
    let f_across = stats::one_way_anova(&cleaned_across, 0.05).unwrap().into_value().f_statistic;

    // Dropping the within-group outliers sharpens the group difference
    assert!(f_within > f_across);
}
