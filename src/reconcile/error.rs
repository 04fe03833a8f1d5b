//! Reconciliation error types
//!
//! Per the engine's failure taxonomy, rule/list deletions and the
//! blocking-rule creation fail immediately, while override-rule creation
//! failures are collected across all concurrent tasks and surfaced
//! together at the join point.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Existing rules could not be enumerated
    #[error("Failed to enumerate rules: {0}")]
    ListRules(String),

    /// Existing lists could not be enumerated
    #[error("Failed to enumerate lists: {0}")]
    ListLists(String),

    /// A stale rule could not be removed; the run aborts because a
    /// surviving stale rule could collide with new rules on precedence
    /// or match expression
    #[error("Failed to remove stale rule {id}: {detail}")]
    DeleteRule { id: String, detail: String },

    /// An old list could not be removed
    #[error("Failed to remove old list {id}: {detail}")]
    DeleteList { id: String, detail: String },

    /// The blocking rule could not be created
    #[error("Failed to create rule \"{name}\": {detail}")]
    CreateRule { name: String, detail: String },

    /// A list could not be created
    #[error("Failed to create list \"{name}\": {detail}")]
    CreateList { name: String, detail: String },

    /// One or more override rules failed; every destination was still
    /// attempted before this was raised
    #[error("Override rule creation failed: {0}")]
    OverrideRules(OverrideFailures),
}

impl ReconcileError {
    /// Check if this error is recoverable (a retry of the whole run may succeed)
    pub fn is_recoverable(&self) -> bool {
        // Every reconcile failure leaves remote state partially rebuilt;
        // the next run starts from stale-rule removal, so a retry is
        // always meaningful.
        true
    }
}

/// One failed override destination with the server error detail
#[derive(Debug, Clone)]
pub struct OverrideFailure {
    pub destination: String,
    pub detail: String,
}

impl fmt::Display for OverrideFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.destination, self.detail)
    }
}

/// All override failures collected at the join point
#[derive(Debug, Clone)]
pub struct OverrideFailures(pub Vec<OverrideFailure>);

impl fmt::Display for OverrideFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} destination(s) failed [", self.0.len())?;
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{failure}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_failures_display() {
        let failures = OverrideFailures(vec![
            OverrideFailure {
                destination: "10.0.0.5".to_string(),
                detail: "duplicate".to_string(),
            },
            OverrideFailure {
                destination: "10.0.0.9".to_string(),
                detail: "timeout".to_string(),
            },
        ]);
        let rendered = ReconcileError::OverrideRules(failures).to_string();
        assert!(rendered.contains("2 destination(s)"));
        assert!(rendered.contains("10.0.0.5: duplicate"));
        assert!(rendered.contains("10.0.0.9: timeout"));
    }
}
