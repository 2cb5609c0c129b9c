//! On-disk watermark record format
//!
//! The record is a small text file with one `<job-id> = <watermark>` line per
//! configured job, in job order:
//!
//! ```text
//! # sluice watermarks
//! orders = 1042
//! job-3f9a0c21b7de = 0
//! ```
//!
//! Records written by older deployments hold bare integers instead, one per
//! line or comma separated, matched to jobs by position. Both forms are read;
//! only the keyed form is written.

use crate::domain::{JobId, Result, SluiceError};
use std::collections::HashMap;

const HEADER: &str = "# sluice watermarks: <job-id> = <last exported key>";

/// Parsed contents of a watermark record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// No entries (missing or blank file)
    Empty,
    /// Entries addressed by job id, in file order
    Keyed(Vec<(String, i64)>),
    /// Entries addressed by job position
    Positional(Vec<i64>),
}

/// Watermarks aligned with the configured job list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    /// One value per configured job
    pub values: Vec<i64>,
    /// Jobs that had no entry and start from 0
    pub defaulted: Vec<JobId>,
    /// Entries that match no configured job (ids, or positions for legacy records)
    pub ignored: Vec<String>,
}

impl Record {
    /// Parse record text
    ///
    /// # Errors
    ///
    /// Returns a persistence error for unparseable lines, duplicate ids, or a
    /// mix of keyed and positional lines.
    pub fn parse(text: &str) -> Result<Self> {
        let mut keyed: Vec<(String, i64)> = Vec::new();
        let mut positional: Vec<i64> = Vec::new();
        let mut seen = HashMap::new();

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((id, value)) = line.split_once('=') {
                let id = id.trim();
                if id.is_empty() {
                    return Err(invalid(line_no, "missing job id"));
                }
                let value = parse_value(value, line_no)?;
                if seen.insert(id.to_string(), line_no).is_some() {
                    return Err(invalid(line_no, &format!("duplicate job id '{id}'")));
                }
                keyed.push((id.to_string(), value));
            } else {
                for field in line.split(',') {
                    let field = field.trim();
                    positional.push(if field.is_empty() {
                        0
                    } else {
                        parse_value(field, line_no)?
                    });
                }
            }
        }

        match (keyed.is_empty(), positional.is_empty()) {
            (true, true) => Ok(Record::Empty),
            (false, true) => Ok(Record::Keyed(keyed)),
            (true, false) => Ok(Record::Positional(positional)),
            (false, false) => Err(SluiceError::Persistence(
                "Watermark record mixes keyed and positional entries".to_string(),
            )),
        }
    }

    /// Match entries to the configured jobs
    ///
    /// Jobs without an entry start at 0; entries without a job are reported
    /// in [`Alignment::ignored`].
    pub fn align(&self, jobs: &[JobId]) -> Alignment {
        let mut values = vec![0; jobs.len()];
        let mut defaulted = Vec::new();
        let mut ignored = Vec::new();

        match self {
            Record::Empty => defaulted.extend(jobs.iter().cloned()),
            Record::Keyed(entries) => {
                let by_id: HashMap<&str, i64> =
                    entries.iter().map(|(id, v)| (id.as_str(), *v)).collect();
                for (slot, job) in jobs.iter().enumerate() {
                    match by_id.get(job.as_str()) {
                        Some(value) => values[slot] = *value,
                        None => defaulted.push(job.clone()),
                    }
                }
                ignored.extend(
                    entries
                        .iter()
                        .filter(|(id, _)| !jobs.iter().any(|job| job.as_str() == id))
                        .map(|(id, _)| id.clone()),
                );
            }
            Record::Positional(entries) => {
                for (slot, job) in jobs.iter().enumerate() {
                    match entries.get(slot) {
                        Some(value) => values[slot] = *value,
                        None => defaulted.push(job.clone()),
                    }
                }
                ignored.extend((jobs.len()..entries.len()).map(|pos| format!("#{pos}")));
            }
        }

        Alignment {
            values,
            defaulted,
            ignored,
        }
    }
}

/// Render a complete keyed record
pub fn render(entries: &[(JobId, i64)]) -> String {
    let mut out = String::with_capacity(HEADER.len() + entries.len() * 24);
    out.push_str(HEADER);
    out.push('\n');
    for (id, value) in entries {
        out.push_str(id.as_str());
        out.push_str(" = ");
        out.push_str(&value.to_string());
        out.push('\n');
    }
    out
}

fn parse_value(text: &str, line_no: usize) -> Result<i64> {
    text.trim()
        .parse::<i64>()
        .map_err(|_| invalid(line_no, &format!("'{}' is not an integer", text.trim())))
}

fn invalid(line_no: usize, reason: &str) -> SluiceError {
    SluiceError::Persistence(format!("Watermark record line {line_no}: {reason}"))
}
