//! Totals accumulation and the final fold.
//!
//! `GroupTotals` sums the value field per (group, series) in one pass over
//! the keyed rows; `fold` turns those sums and a `Selection` into the
//! chart-ready `AggregateResult`.

use crate::analysis::coerce::CoercionTally;
use crate::analysis::grouping::KeyedRow;
use crate::analysis::selector::Selection;
use crate::models::{AggregateResult, AggregationConfig, GroupData, SeriesValues};
use std::collections::BTreeMap;

/// Label used when no series field is configured.
pub const TOTAL_SERIES: &str = "Total";

/// Sums per (group, series) and per series.
#[derive(Debug, Clone, Default)]
pub struct GroupTotals {
    /// group → series → total. Keys sort lexicographically.
    pub cells: BTreeMap<String, BTreeMap<String, f64>>,
    /// series → total across all groups.
    pub series_totals: BTreeMap<String, f64>,
    pub tally: CoercionTally,
}

impl GroupTotals {
    /// Accumulate keyed rows.
    ///
    /// A row whose value fails coercion still registers its group and label
    /// but adds nothing.
    pub fn accumulate(rows: &[KeyedRow<'_>], config: &AggregationConfig) -> Self {
        let mut totals = Self::default();

        for keyed in rows {
            let label = match &config.series_by {
                Some((_, column)) => keyed.row.get(*column).display().into_owned(),
                None => TOTAL_SERIES.to_string(),
            };
            let amount = totals
                .tally
                .record(keyed.row.get(config.value_column))
                .unwrap_or(0.0);

            *totals
                .cells
                .entry(keyed.key.clone())
                .or_default()
                .entry(label.clone())
                .or_insert(0.0) += amount;
            *totals.series_totals.entry(label).or_insert(0.0) += amount;
        }

        totals
    }

    /// First (group, series) whose sum is not finite. Overall series
    /// totals report the group as `*`.
    pub fn first_non_finite(&self) -> Option<(String, String)> {
        for (group, cells) in &self.cells {
            for (series, total) in cells {
                if !total.is_finite() {
                    return Some((group.clone(), series.clone()));
                }
            }
        }
        self.series_totals
            .iter()
            .find(|(_, total)| !total.is_finite())
            .map(|(series, _)| ("*".to_string(), series.clone()))
    }

    pub fn get(&self, group: &str, series: &str) -> f64 {
        self.cells
            .get(group)
            .and_then(|cells| cells.get(series))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Build the final aggregate.
///
/// Overall selections give every group every retained series (dense);
/// per-group selections give each group only its own labels (sparse).
pub fn fold(totals: &GroupTotals, selection: &Selection) -> AggregateResult {
    let groups: Vec<String> = totals.cells.keys().cloned().collect();
    let series = selection.series().to_vec();

    let data = groups
        .iter()
        .map(|group| {
            let values: Vec<(String, f64)> = match selection {
                Selection::Overall(retained) => retained
                    .iter()
                    .map(|label| (label.clone(), totals.get(group, label)))
                    .collect(),
                Selection::PerGroup { by_group, .. } => {
                    let local = by_group.get(group).map(Vec::as_slice).unwrap_or(&[]);
                    series
                        .iter()
                        .filter(|label| local.contains(label))
                        .map(|label| (label.clone(), totals.get(group, label)))
                        .collect()
                }
            };
            GroupData {
                group: group.clone(),
                series: SeriesValues(values),
            }
        })
        .collect();

    AggregateResult {
        groups,
        series,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(entries: &[(&str, &str, f64)]) -> GroupTotals {
        let mut totals = GroupTotals::default();
        for (group, series, amount) in entries {
            *totals
                .cells
                .entry(group.to_string())
                .or_default()
                .entry(series.to_string())
                .or_insert(0.0) += amount;
            *totals.series_totals.entry(series.to_string()).or_insert(0.0) += amount;
        }
        totals
    }

    #[test]
    fn test_fold_dense_fills_zeros() {
        let totals = totals(&[("2020", "A", 100.0), ("2020", "B", 50.0), ("2021", "A", 30.0)]);
        let selection = Selection::Overall(vec!["A".to_string(), "B".to_string()]);

        let result = fold(&totals, &selection);

        assert_eq!(result.groups, vec!["2020", "2021"]);
        assert_eq!(result.data[1].series.get("B"), Some(0.0));
        assert_eq!(result.data[1].series.len(), 2);
    }

    #[test]
    fn test_first_non_finite() {
        let finite = totals(&[("2020", "A", 1.0), ("2021", "B", 2.0)]);
        assert_eq!(finite.first_non_finite(), None);

        let cell = totals(&[("2020", "A", f64::MAX), ("2020", "A", f64::MAX)]);
        assert_eq!(
            cell.first_non_finite(),
            Some(("2020".to_string(), "A".to_string()))
        );

        let across = totals(&[("2020", "A", f64::MAX), ("2021", "A", f64::MAX)]);
        assert_eq!(
            across.first_non_finite(),
            Some(("*".to_string(), "A".to_string()))
        );
    }

    #[test]
    fn test_fold_groups_sort_as_strings() {
        let totals = totals(&[("10", "A", 1.0), ("9", "A", 1.0), ("2", "A", 1.0)]);
        let result = fold(&totals, &Selection::Overall(vec!["A".to_string()]));
        assert_eq!(result.groups, vec!["10", "2", "9"]);
    }

    #[test]
    fn test_fold_sparse_keeps_series_order() {
        let totals = totals(&[("2020", "A", 5.0), ("2020", "B", 9.0), ("2021", "C", 1.0)]);
        let mut by_group = BTreeMap::new();
        by_group.insert("2020".to_string(), vec!["B".to_string(), "A".to_string()]);
        by_group.insert("2021".to_string(), vec!["C".to_string()]);
        let selection = Selection::PerGroup {
            series: vec!["B".to_string(), "A".to_string(), "C".to_string()],
            by_group,
        };

        let result = fold(&totals, &selection);

        let first: Vec<&str> = result.data[0].series.labels().collect();
        assert_eq!(first, vec!["B", "A"]);
        let second: Vec<&str> = result.data[1].series.labels().collect();
        assert_eq!(second, vec!["C"]);
    }
}
