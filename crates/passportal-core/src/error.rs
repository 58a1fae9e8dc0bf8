//! Error types for `passportal-core`.

use std::collections::BTreeMap;
use std::fmt;

/// Accumulated per-field validation failures.
///
/// Field checks never short-circuit: a submission with a bad name and a bad
/// message reports both, so the client can surface every problem at once.
/// Keys are the payload field names (`name`, `email`, `company`, `interest`,
/// `message`); values are human-readable reasons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    /// Failure reason per field, in deterministic field-name order.
    pub fields: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
    /// Record a failure for a field. Later failures for the same field are
    /// ignored — the first reason wins.
    pub fn push(&mut self, field: &'static str, reason: impl Into<String>) {
        self.fields.entry(field).or_insert_with(|| reason.into());
    }

    /// True when no field has failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed for ")?;
        for (i, field) in self.fields.keys().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{field}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}
