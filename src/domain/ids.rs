//! Domain identifier types with validation
//!
//! Jobs are addressed by a stable [`JobId`] rather than by their position in
//! the configuration, so inserting or reordering exporters never scrambles
//! the watermarks of unrelated jobs.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Stable identifier of an export job
///
/// Either the explicit `name` from configuration, or a digest of the job's
/// static fields when no name is given.
///
/// # Examples
///
/// ```
/// use sluice::domain::ids::JobId;
/// use std::str::FromStr;
///
/// let id = JobId::from_str("orders_daily").unwrap();
/// assert_eq!(id.as_str(), "orders_daily");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    /// Creates a new JobId from a string
    ///
    /// Ids appear as keys in the watermark record, so they may only contain
    /// ASCII letters, digits, `-`, `_` and `.`.
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Job ID cannot be empty".to_string());
        }
        if let Some(c) = id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(format!("Job ID '{id}' contains invalid character '{c}'"));
        }
        Ok(Self(id))
    }

    /// Derives an id from the parts that make a job unique
    ///
    /// The digest is stable across runs and platforms: `job-` followed by the
    /// first 12 hex characters of SHA-256 over the parts joined by `\x1f`.
    pub fn derive<'a>(parts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut hasher = Sha256::new();
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                hasher.update([0x1f]);
            }
            hasher.update(part.as_bytes());
        }
        let digest = hasher.finalize();
        let hex: String = digest
            .iter()
            .take(6)
            .map(|b| format!("{b:02x}"))
            .collect();
        Self(format!("job-{hex}"))
    }

    /// Returns the job ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_valid() {
        let id = JobId::new("orders.v2-daily_1").unwrap();
        assert_eq!(id.to_string(), "orders.v2-daily_1");
    }

    #[test]
    fn test_job_id_empty() {
        assert!(JobId::new("").is_err());
        assert!(JobId::new("   ").is_err());
    }

    #[test]
    fn test_job_id_rejects_record_syntax() {
        assert!(JobId::new("orders = 5").is_err());
        assert!(JobId::new("orders#1").is_err());
    }

    #[test]
    fn test_derived_id_is_stable() {
        let a = JobId::derive(["SELECT * FROM orders", "id", "main"]);
        let b = JobId::derive(["SELECT * FROM orders", "id", "main"]);
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("job-"));
        assert_eq!(a.as_str().len(), "job-".len() + 12);
    }

    #[test]
    fn test_derived_id_depends_on_part_boundaries() {
        let a = JobId::derive(["ab", "c"]);
        let b = JobId::derive(["a", "bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_derived_id_is_valid_job_id() {
        let derived = JobId::derive(["x"]);
        assert!(JobId::new(derived.as_str()).is_ok());
    }
}
