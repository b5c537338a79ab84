//! Row filtering.
//!
//! A dashboard may restrict its rows with one or more `FilterSpec`s; all of
//! them must hold for a row to survive.

use crate::error::{PipelineError, PipelineResult};
use crate::models::{FilterMode, FilterSpec, Row, Schema, Table};
use tracing::debug;

impl FilterSpec {
    /// Build a filter, checking the field against `schema`.
    pub fn new(
        field: impl Into<String>,
        mode: FilterMode,
        values: Vec<String>,
        schema: &Schema,
    ) -> PipelineResult<Self> {
        let field = field.into();
        let column = schema
            .index_of(&field)
            .ok_or_else(|| PipelineError::unknown_field(&field))?;

        if values.is_empty() {
            return Err(PipelineError::field(
                field,
                format!("'{}' filter needs at least one value", mode),
            ));
        }

        // Case-folded once, not per row.
        let values = match mode {
            FilterMode::Contains => values.into_iter().map(|v| v.to_lowercase()).collect(),
            FilterMode::Include => values,
        };

        Ok(Self {
            field,
            column,
            mode,
            values,
        })
    }

    /// Whether `row` satisfies this predicate.
    pub fn matches(&self, row: &Row) -> bool {
        let cell = row.get(self.column);
        match self.mode {
            FilterMode::Contains => {
                if cell.is_null() {
                    return false;
                }
                let haystack = cell.display().to_lowercase();
                self.values.iter().any(|needle| haystack.contains(needle.as_str()))
            }
            FilterMode::Include => {
                let value = cell.display();
                self.values.iter().any(|v| *v == *value)
            }
        }
    }
}

/// Select the rows matching every filter. No filters keeps all rows.
pub fn filter_rows<'a>(table: &'a Table, filters: &[FilterSpec]) -> Vec<&'a Row> {
    let kept: Vec<&Row> = table
        .rows
        .iter()
        .filter(|row| filters.iter().all(|f| f.matches(row)))
        .collect();

    debug!(
        "Filter kept {} of {} rows ({} filters)",
        kept.len(),
        table.len(),
        filters.len()
    );

    kept
}
