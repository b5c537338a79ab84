//! Dashboard registry handling.
//!
//! Dashboards are declared in `dashboard_configs.json` as an ordered list.
//! Each entry names its data files, the aggregation settings and an
//! optional row filter. Keys the builder doesn't use (chart options for the
//! renderer) are ignored.

use crate::error::{PipelineError, PipelineResult};
use crate::models::{AggregationConfig, AggregationSettings, FilterMode, FilterSpec, Schema};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Root of `dashboard_configs.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub dashboards: Vec<DashboardConfig>,
}

/// One dashboard definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardConfig {
    #[serde(default = "default_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub description: String,

    /// Data files to concatenate. `csvs` is the older spelling.
    #[serde(default, alias = "csvs")]
    pub data_files: Vec<String>,

    #[serde(default)]
    pub group_by: String,
    /// When unset every row lands in a single "Total" series.
    #[serde(default)]
    pub series_by: Option<String>,
    #[serde(default)]
    pub value_field: String,
    #[serde(default)]
    pub extract_year: bool,
    /// Missing or `null` means unbounded.
    #[serde(default)]
    pub max_series: Option<i64>,
    #[serde(default)]
    pub min_series_total: f64,
    #[serde(default)]
    pub top_series_per_group: bool,

    #[serde(default)]
    pub filter: Option<FilterInput>,
    /// Path to a JSON file holding one more filter object.
    #[serde(default)]
    pub mapping: Option<String>,
}

fn default_id() -> String {
    "unknown".to_string()
}

/// A `filter` value: one object or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FilterInput {
    One(FilterObject),
    Many(Vec<FilterObject>),
}

impl FilterInput {
    fn objects(&self) -> &[FilterObject] {
        match self {
            FilterInput::One(obj) => std::slice::from_ref(obj),
            FilterInput::Many(objs) => objs,
        }
    }
}

/// A filter as written in JSON.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterObject {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub include: Option<Vec<String>>,
    #[serde(default)]
    pub contains: Option<Vec<String>>,
    /// Older spelling of `contains`.
    #[serde(default)]
    pub include_contains: Option<Vec<String>>,
}

impl FilterObject {
    /// Expand into validated specs, one per list present.
    pub fn to_specs(&self, schema: &Schema) -> PipelineResult<Vec<FilterSpec>> {
        if self.field.is_empty() {
            return Err(PipelineError::config("filter is missing 'field'"));
        }

        let lists = [
            (FilterMode::Include, &self.include),
            (FilterMode::Contains, &self.contains),
            (FilterMode::Contains, &self.include_contains),
        ];

        let mut specs = Vec::new();
        for (mode, values) in lists {
            if let Some(values) = values {
                specs.push(FilterSpec::new(
                    self.field.clone(),
                    mode,
                    values.clone(),
                    schema,
                )?);
            }
        }

        if specs.is_empty() {
            return Err(PipelineError::field(
                self.field.clone(),
                "filter needs 'include' or 'contains'",
            ));
        }

        Ok(specs)
    }
}

/// Validated settings for one aggregation run.
#[derive(Debug, Clone)]
pub struct AggregationPlan {
    pub config: AggregationConfig,
    pub filters: Vec<FilterSpec>,
}

impl DashboardConfig {
    /// Aggregation settings as declared.
    pub fn settings(&self) -> AggregationSettings {
        AggregationSettings {
            group_by: self.group_by.clone(),
            series_by: self.series_by.clone().filter(|s| !s.is_empty()),
            value_field: self.value_field.clone(),
            extract_year: self.extract_year,
            max_series: self.max_series,
            min_series_total: self.min_series_total,
            top_series_per_group: self.top_series_per_group,
        }
    }

    /// Validate this dashboard against a loaded table schema.
    ///
    /// `project_dir` anchors the `mapping` path.
    pub fn plan(&self, schema: &Schema, project_dir: &Path) -> Result<AggregationPlan> {
        let config = AggregationConfig::new(self.settings(), schema)?;

        let mut filters = Vec::new();
        if let Some(filter) = &self.filter {
            for obj in filter.objects() {
                filters.extend(obj.to_specs(schema)?);
            }
        }

        if let Some(mapping) = &self.mapping {
            let obj = load_mapping(&project_dir.join(mapping))?;
            filters.extend(obj.to_specs(schema)?);
        }

        Ok(AggregationPlan { config, filters })
    }
}

/// Dashboard ids become output file names, so they must stay a single
/// path component.
fn check_id(id: &str) -> PipelineResult<()> {
    if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
        return Err(PipelineError::field(
            "id",
            format!("'{}' is not a valid dashboard id", id),
        ));
    }
    Ok(())
}

/// Read a mapping file holding a single filter object.
pub fn load_mapping(path: &Path) -> Result<FilterObject> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read mapping file: {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse mapping file: {}", path.display()))
}

impl Registry {
    /// Load the registry from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dashboard registry: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse dashboard registry: {}", path.display()))
    }

    /// Parse registry JSON and check every dashboard id.
    pub fn parse(content: &str) -> Result<Self> {
        let registry: Registry = serde_json::from_str(content)?;
        for dashboard in &registry.dashboards {
            check_id(&dashboard.id)?;
        }
        Ok(registry)
    }

    /// All dashboards, or only the one with `id`.
    pub fn select(&self, id: Option<&str>) -> Result<Vec<&DashboardConfig>> {
        match id {
            None => Ok(self.dashboards.iter().collect()),
            Some(id) => {
                let found: Vec<_> = self.dashboards.iter().filter(|d| d.id == id).collect();
                if found.is_empty() {
                    anyhow::bail!("Dashboard not found: {}", id);
                }
                Ok(found)
            }
        }
    }
}
