//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.dashbuild.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".dashbuild.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Project layout.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Data loading settings.
    #[serde(default)]
    pub loader: LoaderConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Pretty-print dashboard JSON.
    #[serde(default)]
    pub pretty: bool,
}

/// Where the registry, data and output live.
///
/// Relative paths are resolved against `project_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Project root.
    #[serde(default = "default_project_dir")]
    pub project_dir: PathBuf,

    /// Directory holding the source data files.
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,

    /// Directory the dashboard JSON files are written to.
    #[serde(default = "default_dashboards_dir")]
    pub dashboards_dir: PathBuf,

    /// Dashboard registry file.
    #[serde(default = "default_configs_file")]
    pub configs_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            project_dir: default_project_dir(),
            public_dir: default_public_dir(),
            dashboards_dir: default_dashboards_dir(),
            configs_file: default_configs_file(),
        }
    }
}

fn default_project_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_dashboards_dir() -> PathBuf {
    PathBuf::from("public/dashboards")
}

fn default_configs_file() -> PathBuf {
    PathBuf::from("dashboard_configs.json")
}

/// Resolved, absolute-or-project-relative layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Paths {
    pub project_dir: PathBuf,
    pub public_dir: PathBuf,
    pub dashboards_dir: PathBuf,
    pub configs_file: PathBuf,
}

impl PathsConfig {
    /// Anchor relative paths at the project directory.
    pub fn resolve(&self) -> Paths {
        let root = &self.project_dir;
        Paths {
            project_dir: root.clone(),
            public_dir: root.join(&self.public_dir),
            dashboards_dir: root.join(&self.dashboards_dir),
            configs_file: root.join(&self.configs_file),
        }
    }
}

/// Data loading settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// CSV field delimiter (single character).
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Maximum rows read per data file (0 = unlimited).
    #[serde(default)]
    pub max_rows: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            max_rows: 0,
        }
    }
}

fn default_delimiter() -> String {
    ",".to_string()
}

impl LoaderConfig {
    /// Delimiter as a byte; `\t` and `tab` mean a tab.
    pub fn delimiter_byte(&self) -> u8 {
        match self.delimiter.as_str() {
            "\\t" | "tab" => b'\t',
            s => s.bytes().next().unwrap_or(b','),
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.project_dir {
            self.paths.project_dir = dir.clone();
        }
        if let Some(ref dir) = args.public_dir {
            self.paths.public_dir = dir.clone();
        }
        if let Some(ref dir) = args.output_dir {
            self.paths.dashboards_dir = dir.clone();
        }
        if let Some(ref file) = args.configs {
            self.paths.configs_file = file.clone();
        }
        if let Some(max_rows) = args.max_rows {
            self.loader.max_rows = max_rows;
        }

        // Flags always override
        if args.pretty {
            self.general.pretty = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
