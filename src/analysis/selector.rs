//! Series selection.
//!
//! Decides which series labels survive into the chart, either once for the
//! whole dataset or independently for every group.

use crate::analysis::aggregator::GroupTotals;
use crate::models::AggregationConfig;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Retained series labels.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// One label set shared by every group.
    Overall(Vec<String>),
    /// Labels retained per group; `series` is their union in output order.
    PerGroup {
        series: Vec<String>,
        by_group: BTreeMap<String, Vec<String>>,
    },
}

impl Selection {
    pub fn series(&self) -> &[String] {
        match self {
            Selection::Overall(series) => series,
            Selection::PerGroup { series, .. } => series,
        }
    }
}

/// Rank labels by total (descending, ties by label ascending), drop those
/// below `min_total` and keep at most `max`.
pub fn rank<'a, I>(totals: I, min_total: f64, max: Option<usize>) -> Vec<String>
where
    I: IntoIterator<Item = (&'a String, f64)>,
{
    let mut ranked: Vec<(&String, f64)> = totals
        .into_iter()
        .filter(|(_, total)| *total >= min_total)
        .collect();

    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    if let Some(max) = max {
        ranked.truncate(max);
    }

    ranked.into_iter().map(|(label, _)| label.clone()).collect()
}

/// Select series according to the configured mode.
pub fn select(totals: &GroupTotals, config: &AggregationConfig) -> Selection {
    if !config.top_series_per_group {
        let series = rank(
            totals.series_totals.iter().map(|(label, total)| (label, *total)),
            config.min_series_total,
            config.max_series,
        );
        debug!(
            "Retained {} of {} series overall",
            series.len(),
            totals.series_totals.len()
        );
        return Selection::Overall(series);
    }

    let mut series = Vec::new();
    let mut seen = HashSet::new();
    let mut by_group = BTreeMap::new();

    // Groups iterate in ascending key order.
    for (group, cells) in &totals.cells {
        let retained = rank(
            cells.iter().map(|(label, total)| (label, *total)),
            config.min_series_total,
            config.max_series,
        );
        for label in &retained {
            if seen.insert(label.clone()) {
                series.push(label.clone());
            }
        }
        by_group.insert(group.clone(), retained);
    }

    debug!(
        "Retained {} distinct series across {} groups",
        series.len(),
        by_group.len()
    );

    Selection::PerGroup { series, by_group }
}
