//! Structured composition of incremental queries
//!
//! A query template is split at top level (outside string literals, quoted
//! identifiers, comments and parentheses) into its clauses. The incremental
//! key range is then added to an explicit predicate list, so the filter lands
//! in the right place regardless of the template's casing, an existing
//! `WHERE`, or a trailing `ORDER BY`.

use crate::domain::{Result, SluiceError};
use regex::Regex;
use std::sync::OnceLock;

/// Clauses that may follow `WHERE`, in any order the dialect allows
const TAIL_KEYWORDS: &[&str] = &["GROUP", "HAVING", "WINDOW", "ORDER", "LIMIT", "OFFSET", "FETCH", "FOR"];

/// Tail clauses that cap the number of rows and therefore break key ranges
const ROW_LIMITING_KEYWORDS: &[&str] = &["LIMIT", "OFFSET", "FETCH"];

fn identifier_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let part = r#"(?:[A-Za-z_][A-Za-z0-9_$]*|"[^"]+")"#;
        Regex::new(&format!(r"^{part}(?:\.{part})*$")).expect("identifier pattern is valid")
    })
}

/// Check that a key column name is a plain or quoted SQL identifier
///
/// Qualified names such as `o.id` or `"Orders"."Id"` are accepted. The
/// column is spliced into generated SQL, so anything else is rejected.
pub fn validate_identifier(name: &str) -> std::result::Result<(), String> {
    if identifier_pattern().is_match(name) {
        Ok(())
    } else {
        Err(format!("key_column '{name}' is not a valid SQL identifier"))
    }
}

/// A parsed `SELECT` template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    /// Everything before the top-level `SELECT`, e.g. a `WITH` clause
    prefix: String,
    /// Select list
    projection: String,
    /// `FROM` clause body (tables and joins)
    source: String,
    /// Predicates joined with `AND`
    predicates: Vec<String>,
    /// `GROUP BY` / `ORDER BY` / ... up to the end
    tail: String,
    /// Whether the tail caps the row count
    row_limited: bool,
}

impl QueryTemplate {
    /// Parse a template
    ///
    /// # Errors
    ///
    /// Returns a validation error if the template has no top-level `SELECT`
    /// and `FROM`, or is a compound (`UNION`/`INTERSECT`/`EXCEPT`) query.
    pub fn parse(sql: &str) -> Result<Self> {
        let stripped = strip_comments(sql);
        let sql = stripped.trim().trim_end_matches(';').trim_end();
        let keywords = top_level_keywords(sql);

        if let Some(kw) = keywords
            .iter()
            .find(|(_, w)| matches!(w.as_str(), "UNION" | "INTERSECT" | "EXCEPT"))
        {
            return Err(SluiceError::Validation(format!(
                "Compound queries ({}) cannot be exported incrementally",
                kw.1
            )));
        }

        let select_at = find_keyword(&keywords, "SELECT", 0).ok_or_else(|| {
            SluiceError::Validation("Query template has no top-level SELECT".to_string())
        })?;
        let from_at = find_keyword(&keywords, "FROM", select_at).ok_or_else(|| {
            SluiceError::Validation("Query template has no top-level FROM clause".to_string())
        })?;

        let after_from = from_at + "FROM".len();
        let tail_at = keywords
            .iter()
            .filter(|(pos, word)| *pos > from_at && TAIL_KEYWORDS.contains(&word.as_str()))
            .map(|(pos, _)| *pos)
            .min();
        let where_at = find_keyword(&keywords, "WHERE", from_at)
            .filter(|pos| tail_at.map_or(true, |tail| *pos < tail));

        let source_end = where_at.or(tail_at).unwrap_or(sql.len());
        let source = sql[after_from..source_end].trim().to_string();
        if source.is_empty() {
            return Err(SluiceError::Validation(
                "Query template has an empty FROM clause".to_string(),
            ));
        }

        let mut predicates = Vec::new();
        if let Some(where_at) = where_at {
            let end = tail_at.unwrap_or(sql.len());
            let existing = sql[where_at + "WHERE".len()..end].trim();
            if !existing.is_empty() {
                predicates.push(existing.to_string());
            }
        }

        let tail = tail_at.map(|at| sql[at..].trim().to_string()).unwrap_or_default();
        let row_limited = keywords.iter().any(|(pos, word)| {
            tail_at.map_or(false, |t| *pos >= t) && ROW_LIMITING_KEYWORDS.contains(&word.as_str())
        });

        Ok(Self {
            prefix: sql[..select_at].trim().to_string(),
            projection: sql[select_at + "SELECT".len()..from_at].trim().to_string(),
            source,
            predicates,
            tail,
            row_limited,
        })
    }

    /// The source clause (`FROM` body)
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Predicates already present in the template
    pub fn predicates(&self) -> &[String] {
        &self.predicates
    }

    /// Whether the template ends in `LIMIT`/`OFFSET`/`FETCH`
    pub fn is_row_limited(&self) -> bool {
        self.row_limited
    }

    /// Query for the highest key strictly above `after`
    ///
    /// `SELECT MAX(key) FROM <source> WHERE <template predicates> AND (key > after)`.
    /// Only the key column is scanned; tail clauses are dropped.
    pub fn bound_query(&self, key: &str, after: i64) -> String {
        let predicates = self.with_predicates([format!("{key} > {after}")]);
        self.render(&format!("MAX({key})"), &predicates, "")
    }

    /// Query for the rows with `after < key <= up_to`
    pub fn data_query(&self, key: &str, after: i64, up_to: i64) -> String {
        let predicates =
            self.with_predicates([format!("{key} > {after}"), format!("{key} <= {up_to}")]);
        self.render(&self.projection, &predicates, &self.tail)
    }

    fn with_predicates<const N: usize>(&self, extra: [String; N]) -> Vec<String> {
        self.predicates.iter().cloned().chain(extra).collect()
    }

    fn render(&self, projection: &str, predicates: &[String], tail: &str) -> String {
        let mut sql = String::new();
        if !self.prefix.is_empty() {
            sql.push_str(&self.prefix);
            sql.push(' ');
        }
        sql.push_str("SELECT ");
        sql.push_str(projection);
        sql.push_str(" FROM ");
        sql.push_str(&self.source);
        if !predicates.is_empty() {
            let joined = predicates
                .iter()
                .map(|p| format!("({p})"))
                .collect::<Vec<_>>()
                .join(" AND ");
            sql.push_str(" WHERE ");
            sql.push_str(&joined);
        }
        if !tail.is_empty() {
            sql.push(' ');
            sql.push_str(tail);
        }
        sql
    }
}

fn find_keyword(keywords: &[(usize, String)], word: &str, after: usize) -> Option<usize> {
    keywords
        .iter()
        .find(|(pos, w)| *pos >= after && w == word)
        .map(|(pos, _)| *pos)
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Replace `--` and `/* */` comments with a single space
///
/// Quoted text is copied verbatim so comment markers inside literals survive.
fn strip_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                out.push(c);
                for inner in chars.by_ref() {
                    out.push(inner);
                    if inner == c {
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                for inner in chars.by_ref() {
                    if inner == '\n' {
                        break;
                    }
                }
                out.push(' ');
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for inner in chars.by_ref() {
                    if prev == '*' && inner == '/' {
                        break;
                    }
                    prev = inner;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }

    out
}

/// Byte offsets and upper-cased text of every word at nesting depth zero
///
/// Expects comments to be stripped already.
fn top_level_keywords(sql: &str) -> Vec<(usize, String)> {
    let bytes = sql.as_bytes();
    let mut words = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
                i += 1;
            }
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' => {
                depth = depth.saturating_sub(1);
                i += 1;
            }
            b if is_ident_byte(b) => {
                let start = i;
                while i < bytes.len() && is_ident_byte(bytes[i]) {
                    i += 1;
                }
                if depth == 0 {
                    words.push((start, sql[start..i].to_ascii_uppercase()));
                }
            }
            _ => i += 1,
        }
    }

    words
}
