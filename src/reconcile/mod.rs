//! The reconciliation engine
//!
//! Orchestrates one full synchronization run: stale rules owned by the
//! engine are removed, old lists are torn down, then block lists, the
//! blocking rule, override lists and concurrent override rules are
//! created from the desired policy.
//!
//! Stale removal and recreation are deliberately not transactional: a
//! crash in between leaves the gateway with no engine rules until the
//! next successful run. That window is accepted; there is no hidden
//! retry logic.

pub mod error;
pub mod lists;
pub mod precedence;
pub mod rules;
pub mod traffic;

pub use error::{OverrideFailure, OverrideFailures, ReconcileError};
pub use lists::ListReconciler;
pub use precedence::PrecedenceAllocator;
pub use rules::RuleReconciler;
pub use traffic::traffic_expression;

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::api::{GatewayApi, SessionId};
use crate::sources::OverrideRoute;

/// Outcome of one synchronization run
#[derive(Debug, Default, Clone)]
pub struct SyncReport {
    pub stale_rules_removed: usize,
    pub old_lists_removed: usize,
    pub block_lists_created: usize,
    pub blocking_rule_created: bool,
    pub override_rules_created: usize,
    pub warnings: Vec<String>,
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "removed {} stale rules and {} old lists; created {} block lists, \
             {} blocking rule(s), {} override rule(s)",
            self.stale_rules_removed,
            self.old_lists_removed,
            self.block_lists_created,
            usize::from(self.blocking_rule_created),
            self.override_rules_created,
        )?;
        if !self.warnings.is_empty() {
            write!(f, "; {} warning(s)", self.warnings.len())?;
        }
        Ok(())
    }
}

/// Drives one full synchronization run against the gateway
pub struct Reconciler {
    client: Arc<dyn GatewayApi>,
    session: SessionId,
}

impl Reconciler {
    /// Create a reconciler with a fresh per-run session id
    pub fn new(client: Arc<dyn GatewayApi>) -> Self {
        Self::with_session(client, SessionId::generate())
    }

    /// Create a reconciler with an explicit session id
    pub fn with_session(client: Arc<dyn GatewayApi>, session: SessionId) -> Self {
        Self { client, session }
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Run one synchronization of the desired policy
    ///
    /// Empty block domains or override routes are warnings, not errors;
    /// the other category is still processed.
    ///
    /// # Errors
    ///
    /// Fails immediately on stale-rule or old-list removal failures and
    /// on blocking-rule or list creation failures. Override-rule
    /// failures are aggregated: every destination is attempted before
    /// `ReconcileError::OverrideRules` is returned.
    pub async fn run(
        &self,
        block_domains: &[String],
        override_routes: &[OverrideRoute],
    ) -> Result<SyncReport, ReconcileError> {
        let mut report = SyncReport::default();

        info!("Session {}", self.session);
        info!("Step: remove stale rules");

        let rule_reconciler = RuleReconciler::new(Arc::clone(&self.client), self.session.clone());
        let list_reconciler = ListReconciler::new(Arc::clone(&self.client));

        let existing = self
            .client
            .list_rules()
            .await
            .map_err(|e| ReconcileError::ListRules(e.to_string()))?;
        let existing_count = existing.len();

        let remaining = rule_reconciler.remove_stale_rules(existing).await?;
        report.stale_rules_removed = existing_count - remaining.len();

        info!("Step: remove old lists");
        report.old_lists_removed = list_reconciler.remove_old_lists().await?;

        if block_domains.is_empty() {
            warn!("Websites to block were not provided");
            report
                .warnings
                .push("no block domains provided, blocking rule skipped".to_string());
        } else {
            info!("Step: create block lists");
            let block_lists = list_reconciler.create_block_lists(block_domains).await?;
            report.block_lists_created = block_lists.len();

            info!("Step: create blocking rule");
            rule_reconciler.create_blocking_rule(&block_lists).await?;
            report.blocking_rule_created = true;
        }

        if override_routes.is_empty() {
            warn!("Websites to override were not provided");
            report
                .warnings
                .push("no override routes provided, override rules skipped".to_string());
        } else {
            info!("Step: create override lists");
            let by_destination = list_reconciler.create_override_lists(override_routes).await?;

            info!("Step: create override rules");
            report.override_rules_created = rule_reconciler
                .create_override_rules(&by_destination, &remaining)
                .await?;
        }

        info!("Finished: {}", report);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_display() {
        let report = SyncReport {
            stale_rules_removed: 2,
            old_lists_removed: 3,
            block_lists_created: 1,
            blocking_rule_created: true,
            override_rules_created: 2,
            warnings: vec!["w".to_string()],
        };
        let rendered = report.to_string();
        assert!(rendered.contains("2 stale rules"));
        assert!(rendered.contains("1 blocking rule"));
        assert!(rendered.contains("1 warning"));
    }
}
