//! Grouping-key extraction.

use crate::models::{Row, Value};
use regex::Regex;
use std::sync::LazyLock;

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]{4}").expect("valid regex"));

/// Leftmost run of four ASCII digits in `value`.
///
/// No calendar validation: `"9999"` is a year as far as grouping goes.
pub fn extract_year(value: &str) -> Option<&str> {
    YEAR.find(value).map(|m| m.as_str())
}

/// Grouping key for a cell, or `None` when the row should be dropped.
pub fn group_key(cell: &Value, extract: bool) -> Option<String> {
    let raw = cell.display();
    if extract {
        return extract_year(&raw).map(str::to_string);
    }
    if raw.is_empty() {
        None
    } else {
        Some(raw.into_owned())
    }
}

/// A filtered row tagged with its grouping key.
#[derive(Debug, Clone)]
pub struct KeyedRow<'a> {
    pub key: String,
    pub row: &'a Row,
}

/// Tag rows with their key. Returns the keyed rows and the number dropped.
pub fn key_rows<'a>(rows: &[&'a Row], column: usize, extract: bool) -> (Vec<KeyedRow<'a>>, usize) {
    let mut keyed = Vec::with_capacity(rows.len());
    let mut dropped = 0;

    for &row in rows {
        match group_key(row.get(column), extract) {
            Some(key) => keyed.push(KeyedRow { key, row }),
            None => dropped += 1,
        }
    }

    (keyed, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_year_leftmost() {
        assert_eq!(extract_year("2019-2020-Q3"), Some("2019"));
        assert_eq!(extract_year("202312"), Some("2023"));
        assert_eq!(extract_year("FY 2021/22"), Some("2021"));
        assert_eq!(extract_year("Q3 20"), None);
        assert_eq!(extract_year(""), None);
    }

    #[test]
    fn test_extract_year_is_idempotent() {
        for input in ["2019-2020-Q3", "x1999y", "0042"] {
            let once = extract_year(input).unwrap();
            assert_eq!(extract_year(once), Some(once));
        }
    }

    #[test]
    fn test_group_key_raw() {
        assert_eq!(group_key(&Value::from("Ontario"), false), Some("Ontario".to_string()));
        assert_eq!(group_key(&Value::Number(2020.0), false), Some("2020".to_string()));
        assert_eq!(group_key(&Value::from(""), false), None);
        assert_eq!(group_key(&Value::Null, false), None);
    }

    #[test]
    fn test_group_key_year() {
        assert_eq!(
            group_key(&Value::from("2019-2020-Q3"), true),
            Some("2019".to_string())
        );
        assert_eq!(group_key(&Value::Number(202312.0), true), Some("2023".to_string()));
        assert_eq!(group_key(&Value::from("unknown"), true), None);
    }

    #[test]
    fn test_key_rows_counts_dropped() {
        let rows = vec![
            Row(vec![Value::from("2020-01-01")]),
            Row(vec![Value::from("n/a")]),
            Row(vec![Value::Null]),
        ];
        let refs: Vec<&Row> = rows.iter().collect();

        let (keyed, dropped) = key_rows(&refs, 0, true);
        assert_eq!(keyed.len(), 1);
        assert_eq!(keyed[0].key, "2020");
        assert_eq!(dropped, 2);
    }
}
