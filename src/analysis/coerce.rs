//! Numeric coercion of the value field.
//!
//! Source tables carry amounts as text with currency formatting
//! (`"$1,234.50"`). Coercion is an explicit, fallible step so callers can
//! count failures per field instead of silently treating them as zero.

use crate::models::Value;

/// Outcome of coercing one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coerced {
    Number(f64),
    /// Null or blank; contributes 0.0 and is not a failure.
    Missing,
    /// Present but not numeric.
    Invalid,
}

/// Coerce a cell to a number.
///
/// Text is stripped of `$`, `,` and spaces before parsing.
pub fn to_number(value: &Value) -> Coerced {
    match value {
        Value::Null => Coerced::Missing,
        Value::Number(n) if n.is_finite() => Coerced::Number(*n),
        Value::Number(_) => Coerced::Invalid,
        Value::Text(text) => {
            let cleaned: String = text
                .chars()
                .filter(|c| !matches!(c, '$' | ',' | ' '))
                .collect();
            let cleaned = cleaned.trim();
            if cleaned.is_empty() {
                return Coerced::Missing;
            }
            match cleaned.parse::<f64>() {
                Ok(n) if n.is_finite() => Coerced::Number(n),
                _ => Coerced::Invalid,
            }
        }
    }
}

/// Per-field tally of coercion outcomes.
#[derive(Debug, Clone, Default)]
pub struct CoercionTally {
    pub succeeded: usize,
    pub missing: usize,
    pub failed: usize,
    pub first_failure: Option<String>,
}

impl CoercionTally {
    /// Coerce and record; returns the amount to add (invalid cells yield `None`).
    pub fn record(&mut self, value: &Value) -> Option<f64> {
        match to_number(value) {
            Coerced::Number(n) => {
                self.succeeded += 1;
                Some(n)
            }
            Coerced::Missing => {
                self.missing += 1;
                Some(0.0)
            }
            Coerced::Invalid => {
                self.failed += 1;
                if self.first_failure.is_none() {
                    self.first_failure = Some(value.display().into_owned());
                }
                None
            }
        }
    }

    /// True when at least one cell failed and none parsed.
    pub fn all_failed(&self) -> bool {
        self.failed > 0 && self.succeeded == 0
    }
}
