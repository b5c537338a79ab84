//! Dashboard artifact writing and build summaries.
//!
//! Each dashboard becomes `<dashboards_dir>/<id>.json`. The build summary is
//! the plain-text recap printed once all dashboards have run.

use crate::models::DashboardArtifact;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Serialize an artifact, compact by default.
pub fn generate_json(artifact: &DashboardArtifact, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(artifact)?
    } else {
        serde_json::to_string(artifact)?
    };
    Ok(json)
}

/// Write `<dir>/<id>.json`, creating `dir` if needed.
pub fn write_artifact(artifact: &DashboardArtifact, dir: &Path, pretty: bool) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let path = dir.join(format!("{}.json", artifact.id));
    let content = generate_json(artifact, pretty)?;

    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write dashboard to {}", path.display()))?;

    Ok(path)
}

/// A generated file and its size.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFile {
    pub name: String,
    pub bytes: u64,
}

impl GeneratedFile {
    pub fn size_kb(&self) -> f64 {
        self.bytes as f64 / 1024.0
    }
}

/// All `*.json` files in `dir`, sorted by name. A missing dir yields none.
pub fn generated_files(dir: &Path) -> Result<Vec<GeneratedFile>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") || !path.is_file() {
            continue;
        }
        let bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);
        files.push(GeneratedFile {
            name: entry.file_name().to_string_lossy().to_string(),
            bytes,
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// How one dashboard's build ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardStatus {
    Built {
        groups: usize,
        series: usize,
        path: Option<PathBuf>,
    },
    Skipped(String),
    Failed(String),
}

/// Recap of a whole run.
#[derive(Debug, Clone, Default)]
pub struct BuildSummary {
    pub results: Vec<(String, DashboardStatus)>,
    pub duration_seconds: f64,
    pub dry_run: bool,
}

impl BuildSummary {
    pub fn record(&mut self, id: &str, status: DashboardStatus) {
        self.results.push((id.to_string(), status));
    }

    pub fn built(&self) -> usize {
        self.count(|s| matches!(s, DashboardStatus::Built { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, DashboardStatus::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&DashboardStatus) -> bool) -> usize {
        self.results.iter().filter(|(_, s)| pred(s)).count()
    }
}

/// Generate a text summary of a build run.
pub fn generate_summary_text(summary: &BuildSummary) -> String {
    let mut lines = Vec::new();

    let verb = if summary.dry_run { "Checked" } else { "Built" };
    lines.push(format!(
        "{} {}/{} dashboards in {:.1}s",
        verb,
        summary.built(),
        summary.results.len(),
        summary.duration_seconds
    ));

    for (id, status) in &summary.results {
        let line = match status {
            DashboardStatus::Built {
                groups,
                series,
                path,
            } => match path {
                Some(path) => format!(
                    "  ✅ {}: {} groups, {} series -> {}",
                    id,
                    groups,
                    series,
                    path.display()
                ),
                None => format!("  ✅ {}: {} groups, {} series", id, groups, series),
            },
            DashboardStatus::Skipped(reason) => format!("  ⏭️  {}: skipped ({})", id, reason),
            DashboardStatus::Failed(err) => format!("  ❌ {}: {}", id, err),
        };
        lines.push(line);
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AggregateResult, GroupData, SeriesValues};

    fn artifact() -> DashboardArtifact {
        DashboardArtifact {
            id: "healthcare-top-10".to_string(),
            title: "Healthcare".to_string(),
            subtitle: "Top vendors".to_string(),
            note: String::new(),
            description: "Contracts by year".to_string(),
            aggregated: AggregateResult {
                groups: vec!["2020".to_string()],
                series: vec!["A".to_string()],
                data: vec![GroupData {
                    group: "2020".to_string(),
                    series: SeriesValues(vec![("A".to_string(), 100.0)]),
                }],
            },
        }
    }

    #[test]
    fn test_generate_json_compact() {
        let json = generate_json(&artifact(), false).unwrap();
        assert_eq!(
            json,
            r#"{"id":"healthcare-top-10","title":"Healthcare","subtitle":"Top vendors","note":"","description":"Contracts by year","aggregated":{"groups":["2020"],"series":["A"],"data":[{"group":"2020","series":{"A":100.0}}]}}"#
        );
    }

    #[test]
    fn test_write_artifact_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("dashboards");

        let path = write_artifact(&artifact(), &out, true).unwrap();
        assert!(path.ends_with("healthcare-top-10.json"));

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["aggregated"]["data"][0]["series"]["A"], 100.0);

        std::fs::write(out.join("notes.txt"), "x").unwrap();
        let files = generated_files(&out).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "healthcare-top-10.json");
        assert!(files[0].bytes > 0);
    }

    #[test]
    fn test_generated_files_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(generated_files(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_summary_text() {
        let mut summary = BuildSummary::default();
        summary.record(
            "a",
            DashboardStatus::Built {
                groups: 3,
                series: 5,
                path: None,
            },
        );
        summary.record("b", DashboardStatus::Skipped("no data loaded".to_string()));
        summary.record("c", DashboardStatus::Failed("config error".to_string()));

        assert_eq!(summary.built(), 1);
        assert_eq!(summary.failed(), 1);

        let text = generate_summary_text(&summary);
        assert!(text.starts_with("Built 1/3 dashboards"));
        assert!(text.contains("a: 3 groups, 5 series"));
        assert!(text.contains("b: skipped (no data loaded)"));
        assert!(text.contains("c: config error"));
    }
}
