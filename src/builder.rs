//! Per-dashboard build: load, validate, aggregate, write.

use crate::analysis::aggregate;
use crate::config::Paths;
use crate::loader::{DataLocator, LoadOptions};
use crate::models::DashboardArtifact;
use crate::registry::DashboardConfig;
use crate::report::{self, DashboardStatus};
use anyhow::Result;
use tracing::{debug, info};

/// Run-wide build settings.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub load: LoadOptions,
    pub pretty: bool,
    pub dry_run: bool,
}

/// Build one dashboard.
///
/// A dashboard with no data files, or whose files yield no rows, is skipped
/// rather than failed. Any configuration or data error aborts this
/// dashboard without writing anything.
pub fn build_dashboard(
    config: &DashboardConfig,
    paths: &Paths,
    options: &BuildOptions,
) -> Result<DashboardStatus> {
    info!("Building dashboard: {}", config.id);

    if config.data_files.is_empty() {
        return Ok(DashboardStatus::Skipped("no data files configured".to_string()));
    }

    let locator = DataLocator::new(paths.project_dir.clone(), paths.public_dir.clone());
    let table = locator.load_all(&config.data_files, &options.load)?;

    if table.is_empty() {
        return Ok(DashboardStatus::Skipped("no data loaded".to_string()));
    }

    let plan = config.plan(&table.schema, &paths.project_dir)?;
    debug!(
        "{}: grouping by '{}', summing '{}', {} filters",
        config.id,
        plan.config.group_by(),
        plan.config.value_field(),
        plan.filters.len()
    );
    let aggregation = aggregate(&table, &plan.config, &plan.filters)?;

    let stats = &aggregation.stats;
    debug!(
        "{}: {} rows in, {} after filters, {} without a group",
        config.id, stats.input_rows, stats.filtered_rows, stats.dropped_rows
    );

    let groups = aggregation.result.groups.len();
    let series = aggregation.result.series.len();
    info!("Aggregated: {} groups, {} series", groups, series);

    if options.dry_run {
        return Ok(DashboardStatus::Built {
            groups,
            series,
            path: None,
        });
    }

    let artifact = DashboardArtifact {
        id: config.id.clone(),
        title: config.title.clone(),
        subtitle: config.subtitle.clone(),
        note: config.note.clone(),
        description: config.description.clone(),
        aggregated: aggregation.result,
    };

    let path = report::write_artifact(&artifact, &paths.dashboards_dir, options.pretty)?;
    info!("Saved: {}", path.display());

    Ok(DashboardStatus::Built {
        groups,
        series,
        path: Some(path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::registry::Registry;
    use std::fs;
    use tempfile::TempDir;

    const REGISTRY: &str = include_str!("../fixtures/dashboard_configs.json");
    const CONTRACTS: &str = include_str!("../fixtures/public/contracts.csv");

    fn project() -> (TempDir, Paths) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("public")).unwrap();
        fs::write(dir.path().join("public/contracts.csv"), CONTRACTS).unwrap();

        let root = dir.path().to_path_buf();
        let paths = Paths {
            project_dir: root.clone(),
            public_dir: root.join("public"),
            dashboards_dir: root.join("public/dashboards"),
            configs_file: root.join("dashboard_configs.json"),
        };
        (dir, paths)
    }

    fn options(dry_run: bool) -> BuildOptions {
        BuildOptions {
            load: LoadOptions {
                show_progress: false,
                ..Default::default()
            },
            pretty: false,
            dry_run,
        }
    }

    fn dashboard(id: &str) -> DashboardConfig {
        Registry::parse(REGISTRY)
            .unwrap()
            .dashboards
            .into_iter()
            .find(|d| d.id == id)
            .unwrap()
    }

    #[test]
    fn test_build_writes_artifact() {
        let (_dir, paths) = project();

        let status = build_dashboard(&dashboard("contracts-by-year"), &paths, &options(false)).unwrap();

        let path = match status {
            DashboardStatus::Built {
                groups: 2,
                series: 2,
                path: Some(path),
            } => path,
            other => panic!("unexpected status: {:?}", other),
        };

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written["id"], "contracts-by-year");
        assert_eq!(written["title"], "Contracts by Year");
        assert_eq!(
            written["aggregated"]["groups"],
            serde_json::json!(["2020", "2021"])
        );
        assert_eq!(
            written["aggregated"]["series"],
            serde_json::json!(["Health Canada", "Transport Canada"])
        );
        assert_eq!(
            written["aggregated"]["data"][1]["series"]["Transport Canada"],
            0.0
        );
        assert_eq!(
            written["aggregated"]["data"][0]["series"]["Health Canada"],
            1500.0
        );
    }

    #[test]
    fn test_filtered_dashboard() {
        let (_dir, paths) = project();

        build_dashboard(&dashboard("health-vendors"), &paths, &options(false)).unwrap();

        let written: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(paths.dashboards_dir.join("health-vendors.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(
            written["aggregated"]["series"],
            serde_json::json!(["Acme Pharma", "Northern Labs"])
        );
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let (_dir, paths) = project();

        let status = build_dashboard(&dashboard("contracts-by-year"), &paths, &options(true)).unwrap();

        assert!(matches!(status, DashboardStatus::Built { path: None, .. }));
        assert!(!paths.dashboards_dir.exists());
    }

    #[test]
    fn test_skips_without_data() {
        let (_dir, paths) = project();

        let mut config = dashboard("contracts-by-year");
        config.data_files.clear();
        let status = build_dashboard(&config, &paths, &options(false)).unwrap();
        assert!(matches!(status, DashboardStatus::Skipped(_)));

        config.data_files = vec!["missing.csv".to_string()];
        let status = build_dashboard(&config, &paths, &options(false)).unwrap();
        assert_eq!(status, DashboardStatus::Skipped("no data loaded".to_string()));
    }

    #[test]
    fn test_bad_field_fails_without_output() {
        let (_dir, paths) = project();

        let err = build_dashboard(&dashboard("broken-field"), &paths, &options(false)).unwrap_err();

        assert_eq!(
            err.downcast_ref::<PipelineError>(),
            Some(&PipelineError::unknown_field("amount"))
        );
        assert!(!paths.dashboards_dir.join("broken-field.json").exists());
    }
}
