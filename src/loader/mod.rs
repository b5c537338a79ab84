//! Data file resolution and loading.
//!
//! Dashboards reference their source tables by name. Each name resolves to
//! a file under the public data directory (Parquet first, then CSV) or,
//! failing that, a path relative to the project. Parquet, CSV and JSON row
//! files are read into a `Table`.

use crate::models::{Table, Value};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Settings for reading tables.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Field delimiter for CSV files.
    pub delimiter: u8,
    /// Cap on rows read per file (0 = unlimited).
    pub max_rows: usize,
    /// Show a spinner while reading.
    pub show_progress: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            max_rows: 0,
            show_progress: true,
        }
    }
}

impl From<&crate::config::LoaderConfig> for LoadOptions {
    fn from(config: &crate::config::LoaderConfig) -> Self {
        Self {
            delimiter: config.delimiter_byte(),
            max_rows: config.max_rows,
            show_progress: true,
        }
    }
}

/// Supported on-disk formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Json,
    Parquet,
}

impl DataFormat {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("csv") | Some("tsv") | Some("txt") => Some(DataFormat::Csv),
            Some("json") => Some(DataFormat::Json),
            Some("parquet") => Some(DataFormat::Parquet),
            _ => None,
        }
    }
}

/// Resolves dashboard data file names to readable paths.
pub struct DataLocator {
    project_dir: PathBuf,
    public_dir: PathBuf,
}

impl DataLocator {
    pub fn new(project_dir: PathBuf, public_dir: PathBuf) -> Self {
        Self {
            project_dir,
            public_dir,
        }
    }

    /// Find the file for a configured data file name.
    ///
    /// Returns `None` when nothing readable exists.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let base = name.trim_end_matches(".csv").trim_end_matches(".parquet");
        let parquet = self.public_dir.join(format!("{}.parquet", base));
        let csv = self.public_dir.join(format!("{}.csv", base));

        if parquet.is_file() {
            return Some(parquet);
        }
        if csv.is_file() {
            return Some(csv);
        }

        let as_is = self.project_dir.join(name);
        if as_is.is_file() {
            Some(as_is)
        } else {
            debug!("No data file for '{}'", name);
            None
        }
    }

    /// Load and concatenate all named files.
    ///
    /// Missing files are skipped with a warning; unreadable ones are errors.
    pub fn load_all(&self, names: &[String], options: &LoadOptions) -> Result<Table> {
        let mut table = Table::default();

        for name in names {
            let Some(path) = self.resolve(name) else {
                warn!("Data file not found: {}", name);
                continue;
            };

            let loaded = load_table(&path, options)?;
            info!("Loaded {} rows from {}", loaded.len(), path.display());
            table.append(loaded);
        }

        Ok(table)
    }
}

/// Read one file into a table, picking the reader by extension.
pub fn load_table(path: &Path, options: &LoadOptions) -> Result<Table> {
    let spinner = if options.show_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Loading {}", display_name(path)));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let result = match DataFormat::from_path(path) {
        Some(DataFormat::Csv) => load_csv(path, options),
        Some(DataFormat::Json) => load_json(path, options),
        Some(DataFormat::Parquet) => load_parquet(path, options),
        None => Err(anyhow::anyhow!(
            "Unsupported data file type: {}",
            path.display()
        )),
    };

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    result
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read a headed CSV file. Every cell is text.
pub fn load_csv(path: &Path, options: &LoadOptions) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header row of {}", path.display()))?
        .clone();

    let headers: Vec<String> = headers
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    let mut table = Table::new(headers.iter().cloned());
    note_renamed(path, &headers, &table);
    let cap = row_cap(options);

    for (line, record) in reader.records().enumerate() {
        if table.len() >= cap {
            warn!(
                "Row limit of {} reached, ignoring the rest of {}",
                cap,
                path.display()
            );
            break;
        }
        let record = record
            .with_context(|| format!("CSV parse error in {} (record {})", path.display(), line + 1))?;
        table.push_row(record.iter().map(|cell| Value::Text(cell.to_string())).collect());
    }

    Ok(table)
}

/// Read a JSON array of row objects.
///
/// Columns are the union of keys across rows. Booleans are kept as
/// text; nested values are rejected.
pub fn load_json(path: &Path, options: &LoadOptions) -> Result<Table> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut rows: Vec<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse {} as an array of rows", path.display()))?;

    rows.truncate(row_cap(options));

    let columns = {
        let mut seen = HashSet::new();
        let mut columns = Vec::new();
        for key in rows.iter().flat_map(|object| object.keys()) {
            if seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
        columns
    };

    let mut table = Table::new(columns);
    for (i, object) in rows.into_iter().enumerate() {
        let mut values = vec![Value::Null; table.schema.len()];
        for (key, value) in object {
            let value = scalar(value).with_context(|| {
                format!("Row {} field '{}' in {} is not a scalar", i, key, path.display())
            })?;
            if let Some(idx) = table.schema.index_of(&key) {
                values[idx] = value;
            }
        }
        table.push_row(values);
    }

    Ok(table)
}

/// Read a Parquet file row by row.
///
/// Integer and floating point columns become numbers and strings stay text.
/// Booleans, dates, timestamps and decimals keep their display form as text.
pub fn load_parquet(path: &Path, options: &LoadOptions) -> Result<Table> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader = SerializedFileReader::new(file)
        .with_context(|| format!("Failed to read Parquet metadata of {}", path.display()))?;

    let headers: Vec<String> = reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .root_schema()
        .get_fields()
        .iter()
        .map(|field| field.name().to_string())
        .collect();
    let mut table = Table::new(headers.iter().cloned());
    note_renamed(path, &headers, &table);
    let cap = row_cap(options);

    let rows = reader
        .get_row_iter(None)
        .with_context(|| format!("Failed to read rows of {}", path.display()))?;
    for (line, row) in rows.enumerate() {
        if table.len() >= cap {
            warn!(
                "Row limit of {} reached, ignoring the rest of {}",
                cap,
                path.display()
            );
            break;
        }
        let row = row
            .with_context(|| format!("Parquet read error in {} (row {})", path.display(), line + 1))?;
        table.push_row(row.get_column_iter().map(|(_, field)| parquet_value(field)).collect());
    }

    Ok(table)
}

fn parquet_value(field: &Field) -> Value {
    match field {
        Field::Null => Value::Null,
        Field::Byte(v) => Value::Number(f64::from(*v)),
        Field::Short(v) => Value::Number(f64::from(*v)),
        Field::Int(v) => Value::Number(f64::from(*v)),
        Field::Long(v) => Value::Number(*v as f64),
        Field::UByte(v) => Value::Number(f64::from(*v)),
        Field::UShort(v) => Value::Number(f64::from(*v)),
        Field::UInt(v) => Value::Number(f64::from(*v)),
        Field::ULong(v) => Value::Number(*v as f64),
        Field::Float(v) => Value::Number(f64::from(*v)),
        Field::Double(v) => Value::Number(*v),
        Field::Str(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

fn row_cap(options: &LoadOptions) -> usize {
    if options.max_rows == 0 {
        usize::MAX
    } else {
        options.max_rows
    }
}

/// Log header names that `Schema::new` had to suffix.
fn note_renamed(path: &Path, headers: &[String], table: &Table) {
    for (given, kept) in headers.iter().zip(table.schema.columns()) {
        if given != kept {
            warn!(
                "Repeated column '{}' in {} renamed to '{}'",
                given,
                path.display(),
                kept
            );
        }
    }
}

fn scalar(value: serde_json::Value) -> Result<Value> {
    match value {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Ok(Value::Text(b.to_string())),
        serde_json::Value::Number(n) => n
            .as_f64()
            .map(Value::Number)
            .ok_or_else(|| anyhow::anyhow!("number out of range: {}", n)),
        serde_json::Value::String(s) => Ok(Value::Text(s)),
        other => Err(anyhow::anyhow!("unexpected value: {}", other)),
    }
}
