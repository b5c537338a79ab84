//! Dashbuild - Dashboard data builder for government spending datasets
//!
//! Reads the dashboard registry, aggregates each dashboard's source tables
//! and writes pre-aggregated JSON for the chart renderer.
//!
//! Exit codes:
//!   0 - Success (or some dashboards failed without --strict)
//!   1 - Runtime error (missing registry, unknown dashboard, bad config, etc.)
//!   2 - At least one dashboard failed and --strict was set

use anyhow::{Context, Result};
use dashbuild::builder::{self, BuildOptions};
use dashbuild::cli::Args;
use dashbuild::config::{self, Config};
use dashbuild::loader::LoadOptions;
use dashbuild::registry::{DashboardConfig, Registry};
use dashbuild::report::{self, BuildSummary, DashboardStatus};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Dashbuild v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_build(args) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Build failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .dashbuild.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(config::CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", config::CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", config::CONFIG_FILE);
    println!("   Edit it to customize paths and data loading.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG` takes precedence when set.
fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level().as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the build workflow. Returns exit code (0 or 2).
fn run_build(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    let paths = config.paths.resolve();

    let registry = Registry::load(&paths.configs_file)?;
    let dashboards = registry.select(args.dashboard.as_deref())?;

    if args.list {
        return handle_list(&dashboards);
    }

    let options = BuildOptions {
        load: LoadOptions {
            show_progress: !args.quiet,
            ..LoadOptions::from(&config.loader)
        },
        pretty: config.general.pretty,
        dry_run: args.dry_run,
    };

    println!("🏗️  Building {} dashboard(s)", dashboards.len());
    println!("   Registry: {}", paths.configs_file.display());
    println!("   Data: {}", paths.public_dir.display());
    if !args.dry_run {
        println!("   Output: {}", paths.dashboards_dir.display());
    }

    let mut summary = BuildSummary {
        dry_run: args.dry_run,
        ..Default::default()
    };

    for dashboard in &dashboards {
        let status = match builder::build_dashboard(dashboard, &paths, &options) {
            Ok(status) => status,
            Err(e) => {
                error!("Dashboard '{}' failed: {:#}", dashboard.id, e);
                DashboardStatus::Failed(format!("{:#}", e))
            }
        };
        if let DashboardStatus::Skipped(ref reason) = status {
            warn!("Dashboard '{}' skipped: {}", dashboard.id, reason);
        }
        summary.record(&dashboard.id, status);
    }

    summary.duration_seconds = start_time.elapsed().as_secs_f64();

    println!("\n📊 {}", report::generate_summary_text(&summary));

    if !args.dry_run {
        let files = report::generated_files(&paths.dashboards_dir)?;
        if !files.is_empty() {
            println!("\nGenerated files:");
            for file in &files {
                println!("   {}: {:.1} KB", file.name, file.size_kb());
            }
        }
    }

    if args.strict && summary.failed() > 0 {
        eprintln!(
            "\n⛔ {} dashboard(s) failed. Failing (exit code 2).",
            summary.failed()
        );
        return Ok(2);
    }

    Ok(0)
}

/// Handle --list: print registry entries, exit.
fn handle_list(dashboards: &[&DashboardConfig]) -> Result<i32> {
    if dashboards.is_empty() {
        println!("No dashboards configured.");
        return Ok(0);
    }

    for dashboard in dashboards {
        println!(
            "   📄 {} - {} ({} data files)",
            dashboard.id,
            dashboard.title,
            dashboard.data_files.len()
        );
    }
    println!("\n   Total: {} dashboards", dashboards.len());
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", config::CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
