//! Tabular query results
//!
//! Rows are carried as text cells. The exporter never interprets column
//! values except for the key column, which is parsed as an integer.

use crate::domain::{Result, SluiceError};

/// Result of executing one SQL statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSet {
    /// Column names in select-list order
    pub columns: Vec<String>,

    /// Row values; `None` is SQL NULL
    pub rows: Vec<Vec<Option<String>>>,
}

impl RowSet {
    /// Create a row set with the given columns and no rows
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row
    pub fn push(&mut self, row: Vec<Option<String>>) {
        self.rows.push(row);
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the set holds no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Read the first cell of the first row as an integer
    ///
    /// Used for aggregate lookups such as `SELECT MAX(id) ...`. Returns
    /// `Ok(None)` when there is no row or the cell is NULL.
    ///
    /// # Errors
    ///
    /// Returns a query error if the cell is not an integer.
    pub fn scalar_i64(&self) -> Result<Option<i64>> {
        let cell = match self.rows.first().and_then(|row| row.first()) {
            Some(Some(cell)) => cell,
            _ => return Ok(None),
        };
        parse_key_value(cell).map(Some)
    }
}

/// Parse a key column cell
///
/// Integral numeric text such as `42` or `42.000` (as some drivers render
/// `NUMERIC`) is accepted.
pub fn parse_key_value(cell: &str) -> Result<i64> {
    let trimmed = cell.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Ok(v);
    }
    if let Some((int_part, frac)) = trimmed.split_once('.') {
        if !frac.is_empty() && frac.chars().all(|c| c == '0') {
            if let Ok(v) = int_part.parse::<i64>() {
                return Ok(v);
            }
        }
    }
    Err(SluiceError::Query(format!(
        "Key column value '{trimmed}' is not an integer"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_i64_present() {
        let mut rows = RowSet::new(vec!["max".to_string()]);
        rows.push(vec![Some("17".to_string())]);
        assert_eq!(rows.scalar_i64().unwrap(), Some(17));
    }

    #[test]
    fn test_scalar_i64_null_or_empty() {
        let mut rows = RowSet::new(vec!["max".to_string()]);
        assert_eq!(rows.scalar_i64().unwrap(), None);
        rows.push(vec![None]);
        assert_eq!(rows.scalar_i64().unwrap(), None);
    }

    #[test]
    fn test_scalar_i64_not_integer() {
        let mut rows = RowSet::new(vec!["max".to_string()]);
        rows.push(vec![Some("abc".to_string())]);
        assert!(matches!(rows.scalar_i64(), Err(SluiceError::Query(_))));
    }

    #[test]
    fn test_parse_key_value_numeric_rendering() {
        assert_eq!(parse_key_value(" 9 ").unwrap(), 9);
        assert_eq!(parse_key_value("12.000").unwrap(), 12);
        assert!(parse_key_value("12.5").is_err());
        assert!(parse_key_value("12.").is_err());
    }
}
