//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// Dashbuild - pre-aggregated dashboard data for spending datasets
///
/// Reads the dashboard registry, loads each dashboard's source tables,
/// filters, groups and ranks the rows, and writes one chart-ready JSON
/// file per dashboard.
///
/// Examples:
///   dashbuild
///   dashbuild --dashboard healthcare-top-10
///   dashbuild --project-dir ./site --pretty
///   dashbuild --dry-run --verbose
///   dashbuild --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Build only the dashboard with this id
    #[arg(short, long, value_name = "ID")]
    pub dashboard: Option<String>,

    /// Project root (registry, data and output paths are relative to it)
    #[arg(long, value_name = "DIR", env = "DASHBUILD_PROJECT_DIR")]
    pub project_dir: Option<PathBuf>,

    /// Dashboard registry file
    ///
    /// Defaults to dashboard_configs.json in the project directory.
    #[arg(long, value_name = "FILE")]
    pub configs: Option<PathBuf>,

    /// Directory holding the source data files
    #[arg(long, value_name = "DIR")]
    pub public_dir: Option<PathBuf>,

    /// Directory to write dashboard JSON files to
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .dashbuild.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Maximum rows read per data file (0 = unlimited)
    #[arg(long, value_name = "COUNT")]
    pub max_rows: Option<usize>,

    /// Pretty-print the generated JSON
    #[arg(long)]
    pub pretty: bool,

    /// Validate and aggregate without writing any files
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with code 2 if any dashboard fails to build
    #[arg(long)]
    pub strict: bool,

    /// List the dashboards in the registry and exit
    #[arg(long)]
    pub list: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .dashbuild.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref dashboard) = self.dashboard {
            if dashboard.trim().is_empty() {
                return Err("Dashboard id must not be empty".to_string());
            }
        }

        // Validate project directory if provided
        if let Some(ref dir) = self.project_dir {
            if !dir.exists() {
                return Err(format!(
                    "Project directory does not exist: {}",
                    dir.display()
                ));
            }
            if !dir.is_dir() {
                return Err(format!(
                    "Project path is not a directory: {}",
                    dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            dashboard: None,
            project_dir: None,
            configs: None,
            public_dir: None,
            output_dir: None,
            config: None,
            max_rows: None,
            pretty: false,
            dry_run: false,
            strict: false,
            list: false,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "dashbuild",
            "--dashboard",
            "transfers",
            "--pretty",
            "--max-rows",
            "100",
            "-o",
            "out",
        ])
        .unwrap();

        assert_eq!(args.dashboard.as_deref(), Some("transfers"));
        assert!(args.pretty);
        assert_eq!(args.max_rows, Some(100));
        assert_eq!(args.output_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_project_dir() {
        let mut args = make_args();
        args.project_dir = Some(PathBuf::from("/definitely/not/here"));
        assert!(args.validate().is_err());

        let dir = tempfile::tempdir().unwrap();
        args.project_dir = Some(dir.path().to_path_buf());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_empty_dashboard_id() {
        let mut args = make_args();
        args.dashboard = Some("  ".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
