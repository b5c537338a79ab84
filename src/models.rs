//! Data models for the dashboard builder.
//!
//! This module contains the row table the pipeline reads, the declarative
//! filter and aggregation settings, and the aggregate structures written
//! out for the chart renderer.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

/// A single cell of the input table.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Number(f64),
    Text(String),
}

impl Value {
    /// Stringified form used for matching, grouping and series labels.
    ///
    /// Integral numbers print without a fractional part so that a numeric
    /// `2020` groups the same as the text `"2020"`.
    pub fn display(&self) -> Cow<'_, str> {
        match self {
            Value::Null => Cow::Borrowed(""),
            Value::Text(s) => Cow::Borrowed(s.as_str()),
            Value::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    Cow::Owned(format!("{}", *n as i64))
                } else {
                    Cow::Owned(n.to_string())
                }
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

/// Ordered column names with name lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl Schema {
    /// Build a schema from a header row.
    ///
    /// Every input name gets its own position. A repeated name is suffixed
    /// `_2`, `_3`, ... so cells stay aligned with their header.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut schema = Self::default();
        for column in columns {
            let column = column.into();
            let mut name = column.clone();
            let mut n = 2;
            while schema.index.contains_key(&name) {
                name = format!("{}_{}", column, n);
                n += 1;
            }
            schema.add(name);
        }
        schema
    }

    /// Adds a column if absent and returns its index.
    fn add(&mut self, column: String) -> usize {
        if let Some(&idx) = self.index.get(&column) {
            return idx;
        }
        let idx = self.columns.len();
        self.index.insert(column.clone(), idx);
        self.columns.push(column);
        idx
    }

    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// One record of the input table, aligned to the table schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Row(pub Vec<Value>);

impl Row {
    pub fn get(&self, idx: usize) -> &Value {
        self.0.get(idx).unwrap_or(&Value::Null)
    }
}

/// A homogeneous, in-memory row table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub schema: Schema,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            schema: Schema::new(columns),
            rows: Vec::new(),
        }
    }

    /// Appends a row, padding short rows with nulls.
    pub fn push_row(&mut self, mut values: Vec<Value>) {
        values.resize(self.schema.len(), Value::Null);
        self.rows.push(Row(values));
    }

    /// Concatenates `other`, aligning columns by name.
    ///
    /// The schema becomes the union of both in first-seen order; cells for
    /// columns a table lacks are null.
    pub fn append(&mut self, other: Table) {
        let mapping: Vec<usize> = other
            .schema
            .columns()
            .iter()
            .map(|c| self.schema.add(c.clone()))
            .collect();

        let width = self.schema.len();
        for row in &mut self.rows {
            row.0.resize(width, Value::Null);
        }

        for row in other.rows {
            let mut values = vec![Value::Null; width];
            for (src, value) in row.0.into_iter().enumerate() {
                if let Some(&dst) = mapping.get(src) {
                    values[dst] = value;
                }
            }
            self.rows.push(Row(values));
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// How a filter compares the field value against its list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Case-insensitive substring match.
    Contains,
    /// Exact, case-sensitive equality.
    Include,
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterMode::Contains => write!(f, "contains"),
            FilterMode::Include => write!(f, "include"),
        }
    }
}

/// A validated row predicate on one field.
///
/// Built through `FilterSpec::new`, which checks the field against the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub(crate) field: String,
    pub(crate) column: usize,
    pub(crate) mode: FilterMode,
    pub(crate) values: Vec<String>,
}

impl FilterSpec {
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// Validated aggregation settings, bound to a schema.
///
/// Built through `AggregationConfig::new`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationConfig {
    pub(crate) group_by: String,
    pub(crate) group_column: usize,
    pub(crate) series_by: Option<(String, usize)>,
    pub(crate) value_field: String,
    pub(crate) value_column: usize,
    pub(crate) extract_year: bool,
    pub(crate) max_series: Option<usize>,
    pub(crate) min_series_total: f64,
    pub(crate) top_series_per_group: bool,
}

/// Unvalidated aggregation settings, as written in a dashboard definition.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationSettings {
    pub group_by: String,
    pub series_by: Option<String>,
    pub value_field: String,
    pub extract_year: bool,
    /// `None` means unbounded.
    pub max_series: Option<i64>,
    pub min_series_total: f64,
    pub top_series_per_group: bool,
}

impl AggregationSettings {
    pub fn new(
        group_by: impl Into<String>,
        series_by: impl Into<String>,
        value_field: impl Into<String>,
    ) -> Self {
        Self {
            group_by: group_by.into(),
            series_by: Some(series_by.into()),
            value_field: value_field.into(),
            extract_year: false,
            max_series: None,
            min_series_total: 0.0,
            top_series_per_group: false,
        }
    }
}

/// Series label → total for one group, in output order.
///
/// Serialized as a JSON object whose key order follows the series list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesValues(pub Vec<(String, f64)>);

impl SeriesValues {
    pub fn get(&self, label: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, total)| *total)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for SeriesValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, total) in &self.0 {
            map.serialize_entry(label, total)?;
        }
        map.end()
    }
}

/// Totals for one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupData {
    pub group: String,
    pub series: SeriesValues,
}

/// The chart-ready aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateResult {
    pub groups: Vec<String>,
    pub series: Vec<String>,
    pub data: Vec<GroupData>,
}

/// The persisted dashboard file consumed by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardArtifact {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub note: String,
    pub description: String,
    pub aggregated: AggregateResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.display(), "");
        assert_eq!(Value::from("2020").display(), "2020");
        assert_eq!(Value::Number(2020.0).display(), "2020");
        assert_eq!(Value::Number(12.5).display(), "12.5");
        assert_eq!(Value::Number(-3.0).display(), "-3");
    }

    #[test]
    fn test_schema_lookup() {
        let schema = Schema::new(["dept", "year", "amt"]);
        assert_eq!(schema.index_of("year"), Some(1));
        assert_eq!(schema.index_of("missing"), None);
        assert_eq!(schema.len(), 3);
        assert!(!schema.is_empty());
        assert!(Schema::default().is_empty());
    }

    #[test]
    fn test_schema_keeps_repeated_headers_apart() {
        let schema = Schema::new(["amt", "amt", "dept", "amt"]);
        assert_eq!(schema.columns(), &["amt", "amt_2", "dept", "amt_3"]);
        assert_eq!(schema.index_of("dept"), Some(2));

        let renamed = Schema::new(["a", "a_2", "a"]);
        assert_eq!(renamed.columns(), &["a", "a_2", "a_3"]);
    }

    #[test]
    fn test_push_row_pads_nulls() {
        let mut table = Table::new(["a", "b"]);
        table.push_row(vec![Value::from("x")]);
        assert_eq!(table.rows[0].get(1), &Value::Null);
        assert_eq!(table.rows[0].get(7), &Value::Null);
    }

    #[test]
    fn test_append_aligns_columns() {
        let mut first = Table::new(["dept", "amt"]);
        first.push_row(vec![Value::from("A"), Value::from("1")]);

        let mut second = Table::new(["amt", "year"]);
        second.push_row(vec![Value::from("2"), Value::from("2021")]);

        first.append(second);

        assert_eq!(first.schema.columns(), &["dept", "amt", "year"]);
        assert_eq!(first.len(), 2);
        assert_eq!(first.rows[0].0[2], Value::Null);
        assert_eq!(first.rows[1].0[0], Value::Null);
        assert_eq!(first.rows[1].0[1], Value::from("2"));
        assert_eq!(first.rows[1].0[2], Value::from("2021"));
    }

    #[test]
    fn test_series_values_keep_order_in_json() {
        let values = SeriesValues(vec![("B".to_string(), 1.0), ("A".to_string(), 2.5)]);
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"{"B":1.0,"A":2.5}"#);
        assert_eq!(values.get("A"), Some(2.5));
        assert_eq!(values.get("C"), None);
        assert!(!values.is_empty());
        assert!(SeriesValues::default().is_empty());
    }

    #[test]
    fn test_artifact_field_names() {
        let artifact = DashboardArtifact {
            id: "d".to_string(),
            title: "T".to_string(),
            subtitle: String::new(),
            note: String::new(),
            description: String::new(),
            aggregated: AggregateResult::default(),
        };
        let json: serde_json::Value = serde_json::to_value(&artifact).unwrap();
        for key in ["id", "title", "subtitle", "note", "description", "aggregated"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        let aggregated = &json["aggregated"];
        for key in ["groups", "series", "data"] {
            assert!(aggregated.get(key).is_some(), "missing {}", key);
        }
    }
}
