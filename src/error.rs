//! Error taxonomy for the aggregation pipeline.
//!
//! Configuration problems and unusable value columns are the only
//! failure kinds. Each aborts the whole aggregation; no partial result is
//! ever returned.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// A referenced field is missing or a configuration value is out of range.
    #[error("config error{}: {message}", field_suffix(.field))]
    Config {
        field: Option<String>,
        message: String,
    },
    /// Every contributing value of a numeric field failed coercion.
    #[error(
        "data error: field '{field}' has no numeric values ({failed_rows} rows failed, e.g. {sample:?})"
    )]
    Data {
        field: String,
        failed_rows: usize,
        sample: String,
    },
    /// Finite values summed to a non-finite total.
    #[error("data error: total of field '{field}' overflowed for group '{group}', series '{series}'")]
    Overflow {
        field: String,
        group: String,
        series: String,
    },
}

fn field_suffix(field: &Option<String>) -> String {
    match field {
        Some(name) => format!(" in field '{}'", name),
        None => String::new(),
    }
}

impl PipelineError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            field: None,
            message: message.into(),
        }
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    pub fn unknown_field(field: &str) -> Self {
        Self::field(field, "field does not exist in the table schema")
    }
}

/// A non-fatal coercion failure, reported once per field.
#[derive(Debug, Clone, PartialEq)]
pub struct DataIssue {
    pub field: String,
    pub failed_rows: usize,
    /// First offending raw value, for the log line.
    pub sample: String,
}

impl DataIssue {
    /// Escalate to the fatal form once nothing usable is left.
    pub fn into_fatal(self) -> PipelineError {
        PipelineError::Data {
            field: self.field,
            failed_rows: self.failed_rows,
            sample: self.sample,
        }
    }
}
