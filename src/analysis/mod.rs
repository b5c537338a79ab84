//! The aggregation pipeline.
//!
//! Four stages run strictly in order over an in-memory table:
//! filter, grouping-key extraction, series selection and the final fold.
//! The whole run is pure; the same table and settings always produce the
//! same result or the same error.

pub mod aggregator;
pub mod coerce;
pub mod filter;
pub mod grouping;
pub mod selector;

pub use aggregator::{fold, GroupTotals};
pub use filter::filter_rows;
pub use grouping::key_rows;
pub use selector::{select, Selection};

use crate::error::{DataIssue, PipelineError, PipelineResult};
use crate::models::{
    AggregateResult, AggregationConfig, AggregationSettings, FilterSpec, Schema, Table,
};
use tracing::{debug, warn};

impl AggregationConfig {
    /// Validate `settings` against `schema`.
    pub fn new(settings: AggregationSettings, schema: &Schema) -> PipelineResult<Self> {
        let column = |field: &str| {
            schema
                .index_of(field)
                .ok_or_else(|| PipelineError::unknown_field(field))
        };

        let group_column = column(settings.group_by.as_str())?;
        let value_column = column(settings.value_field.as_str())?;
        let series_by = match settings.series_by {
            Some(field) => {
                let idx = column(field.as_str())?;
                Some((field, idx))
            }
            None => None,
        };

        let max_series = match settings.max_series {
            Some(n) if n < 0 => {
                return Err(PipelineError::field(
                    "maxSeries",
                    format!("must not be negative (got {})", n),
                ))
            }
            Some(n) => Some(n as usize),
            None => None,
        };

        if !settings.min_series_total.is_finite() {
            return Err(PipelineError::field(
                "minSeriesTotal",
                "must be a finite number",
            ));
        }

        Ok(Self {
            group_by: settings.group_by,
            group_column,
            series_by,
            value_field: settings.value_field,
            value_column,
            extract_year: settings.extract_year,
            max_series,
            min_series_total: settings.min_series_total,
            top_series_per_group: settings.top_series_per_group,
        })
    }

    pub fn group_by(&self) -> &str {
        &self.group_by
    }

    pub fn value_field(&self) -> &str {
        &self.value_field
    }
}

/// Row counts and non-fatal findings from one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationStats {
    pub input_rows: usize,
    pub filtered_rows: usize,
    /// Filtered rows without a grouping key.
    pub dropped_rows: usize,
    pub data_issue: Option<DataIssue>,
}

/// A completed aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub result: AggregateResult,
    pub stats: AggregationStats,
}

/// Run the full pipeline.
///
/// Value cells that fail numeric coercion are left out of the sums and
/// reported once in `stats.data_issue`. If every such cell failed, the run
/// is rejected with `PipelineError::Data`.
pub fn aggregate(
    table: &Table,
    config: &AggregationConfig,
    filters: &[FilterSpec],
) -> PipelineResult<Aggregation> {
    let filtered = filter_rows(table, filters);
    let (keyed, dropped_rows) = key_rows(&filtered, config.group_column, config.extract_year);

    if dropped_rows > 0 {
        debug!(
            "Dropped {} rows without a grouping key in '{}'",
            dropped_rows, config.group_by
        );
    }

    let totals = GroupTotals::accumulate(&keyed, config);

    if let Some((group, series)) = totals.first_non_finite() {
        return Err(PipelineError::Overflow {
            field: config.value_field.clone(),
            group,
            series,
        });
    }

    let data_issue = if totals.tally.failed > 0 {
        let issue = DataIssue {
            field: config.value_field.clone(),
            failed_rows: totals.tally.failed,
            sample: totals.tally.first_failure.clone().unwrap_or_default(),
        };
        if totals.tally.all_failed() {
            return Err(issue.into_fatal());
        }
        warn!(
            "Excluded {} rows with non-numeric '{}' values (e.g. {:?})",
            issue.failed_rows, issue.field, issue.sample
        );
        Some(issue)
    } else {
        None
    };

    let selection = select(&totals, config);
    let result = fold(&totals, &selection);

    Ok(Aggregation {
        result,
        stats: AggregationStats {
            input_rows: table.len(),
            filtered_rows: filtered.len(),
            dropped_rows,
            data_issue,
        },
    })
}
