//! Group aggregation over tidy observations.
//!
//! Grouping goes through a `BTreeMap` so the output is fully determined by
//! the input multiset: same rows in any order produce the same table, sorted
//! by (region, period, bucket). Presentation-layer ordering beyond that is
//! the consumer's concern.
//!
//! Combinations absent from the input produce no row. Downstream consumers
//! treat a missing (region, period, bucket) as "no data", never as zero.

use std::collections::BTreeMap;

use crate::domain::{AggregatedRow, RawObservation, RegionTotal};
use crate::error::AppError;

/// How grouped values collapse into one metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    /// Additive quantities: population counts, visit counts.
    Sum,
    /// Index-like quantities. For series where each group holds a single
    /// value (sentiment), this carries the value through unchanged.
    Mean,
}

impl Reducer {
    fn reduce(self, sum: f64, count: usize) -> f64 {
        match self {
            Reducer::Sum => sum,
            Reducer::Mean => sum / count as f64,
        }
    }
}

/// Group `rows` by (region, period, bucket) and reduce each group.
///
/// The bucketer maps a raw category onto its canonical bucket and is expected
/// to fail on labels that should have been filtered out upstream; its error
/// aborts the aggregation rather than mis-bucketing a row.
pub fn aggregate(
    rows: &[RawObservation],
    bucketer: impl Fn(&RawObservation) -> Result<String, AppError>,
    reducer: Reducer,
) -> Result<Vec<AggregatedRow>, AppError> {
    let mut groups: BTreeMap<(String, String, String), (f64, usize)> = BTreeMap::new();

    for row in rows {
        let bucket = bucketer(row)?;
        let slot = groups
            .entry((row.region.clone(), row.period.clone(), bucket))
            .or_insert((0.0, 0));
        slot.0 += row.value;
        slot.1 += 1;
    }

    Ok(groups
        .into_iter()
        .map(|((region, period, bucket), (sum, count))| AggregatedRow {
            region,
            period,
            bucket,
            metric: reducer.reduce(sum, count),
        })
        .collect())
}

/// The bucket-free level: sum everything per (region, period).
pub fn aggregate_totals<'a>(
    rows: impl IntoIterator<Item = &'a RawObservation>,
) -> Vec<RegionTotal> {
    let mut groups: BTreeMap<(String, String), f64> = BTreeMap::new();

    for row in rows {
        *groups
            .entry((row.region.clone(), row.period.clone()))
            .or_insert(0.0) += row.value;
    }

    groups
        .into_iter()
        .map(|((region, period), metric)| RegionTotal {
            region,
            period,
            metric,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_age;

    fn obs(region: &str, period: &str, category: &str, value: f64) -> RawObservation {
        RawObservation {
            region: region.to_string(),
            period: period.to_string(),
            category: category.to_string(),
            subcategory: None,
            value,
        }
    }

    fn by_age(row: &RawObservation) -> Result<String, AppError> {
        normalize_age(&row.category).map(|b| b.label().to_string())
    }

    fn by_category(row: &RawObservation) -> Result<String, AppError> {
        Ok(row.category.clone())
    }

    #[test]
    fn sums_within_one_bucket() {
        let rows = vec![
            obs("A", "200801", "5세", 10.0),
            obs("A", "200801", "12세", 5.0),
        ];
        let out = aggregate(&rows, by_age, Reducer::Sum).unwrap();
        assert_eq!(
            out,
            vec![AggregatedRow {
                region: "A".to_string(),
                period: "200801".to_string(),
                bucket: "00-14".to_string(),
                metric: 15.0,
            }]
        );
    }

    #[test]
    fn sum_is_conserved_across_buckets() {
        let rows = vec![
            obs("A", "200801", "5세", 10.0),
            obs("A", "200801", "30세", 7.0),
            obs("B", "200802", "80세", 3.0),
            obs("B", "200801", "30세", 2.5),
        ];
        let input_sum: f64 = rows.iter().map(|r| r.value).sum();
        let out = aggregate(&rows, by_age, Reducer::Sum).unwrap();
        let output_sum: f64 = out.iter().map(|r| r.metric).sum();
        assert!((input_sum - output_sum).abs() < 1e-9);
    }

    #[test]
    fn output_is_independent_of_input_order() {
        let mut rows = vec![
            obs("B", "200802", "80세", 3.0),
            obs("A", "200801", "5세", 10.0),
            obs("A", "200801", "12세", 5.0),
            obs("A", "200801", "30세", 7.0),
        ];
        let forward = aggregate(&rows, by_age, Reducer::Sum).unwrap();
        rows.reverse();
        let backward = aggregate(&rows, by_age, Reducer::Sum).unwrap();
        assert_eq!(forward, backward);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let rows = vec![
            obs("A", "200801", "5세", 10.0),
            obs("A", "200802", "30세", 7.0),
        ];
        let once = aggregate(&rows, by_age, Reducer::Sum).unwrap();
        let twice = aggregate(&rows, by_age, Reducer::Sum).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn mean_carries_single_values_through_unchanged() {
        let rows = vec![
            obs("가평", "202001", "sentindex", 0.42),
            obs("가평", "202001", "sentindex_ma", 0.40),
        ];
        let out = aggregate(&rows, by_category, Reducer::Mean).unwrap();
        assert_eq!(out.len(), 2);
        assert!((out[0].metric - 0.42).abs() < 1e-12);
        assert!((out[1].metric - 0.40).abs() < 1e-12);
    }

    #[test]
    fn mean_averages_multi_value_groups() {
        let rows = vec![
            obs("가평", "202001", "sentindex", 0.4),
            obs("가평", "202001", "sentindex", 0.6),
        ];
        let out = aggregate(&rows, by_category, Reducer::Mean).unwrap();
        assert_eq!(out.len(), 1);
        assert!((out[0].metric - 0.5).abs() < 1e-12);
    }

    #[test]
    fn absent_combinations_produce_no_rows() {
        let rows = vec![obs("A", "200801", "5세", 10.0)];
        let out = aggregate(&rows, by_age, Reducer::Sum).unwrap();
        assert_eq!(out.len(), 1);
        assert!(!out.iter().any(|r| r.bucket == "15-24"));
    }

    #[test]
    fn bucketer_errors_abort_instead_of_misbucketing() {
        let rows = vec![obs("A", "200801", "계", 999.0)];
        let out = aggregate(&rows, by_age, Reducer::Sum);
        assert!(matches!(out, Err(AppError::LabelParse(_))));
    }

    #[test]
    fn totals_collapse_buckets() {
        let rows = vec![
            obs("A", "200801", "5세", 10.0),
            obs("A", "200801", "30세", 7.0),
            obs("A", "200802", "30세", 1.0),
        ];
        let totals = aggregate_totals(&rows);
        assert_eq!(
            totals,
            vec![
                RegionTotal {
                    region: "A".to_string(),
                    period: "200801".to_string(),
                    metric: 17.0,
                },
                RegionTotal {
                    region: "A".to_string(),
                    period: "200802".to_string(),
                    metric: 1.0,
                },
            ]
        );
    }

    #[test]
    fn totals_over_filtered_subset() {
        let rows = vec![
            obs("A", "201910", "외국인(c)", 5.0),
            obs("A", "201910", "현지인(a)", 50.0),
            obs("A", "201911", "외국인(c)", 6.0),
        ];
        let foreign = aggregate_totals(rows.iter().filter(|r| r.category == "외국인(c)"));
        assert_eq!(foreign.len(), 2);
        assert!((foreign[0].metric - 5.0).abs() < 1e-12);
        assert!((foreign[1].metric - 6.0).abs() < 1e-12);
    }
}
