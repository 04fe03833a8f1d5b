//! Rule reconciliation
//!
//! The heart of the engine: removes stale engine-owned rules, creates
//! the blocking rule over the new block lists, and creates one override
//! rule per destination concurrently, each with a collision-free
//! precedence.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::error::{OverrideFailure, OverrideFailures, ReconcileError};
use super::precedence::PrecedenceAllocator;
use super::traffic::traffic_expression;
use crate::api::constants::RULE_NAME_PREFIX;
use crate::api::{
    CreateRuleRequest, GatewayApi, GatewayList, GatewayRule, RuleAction, RuleSettings, SessionId,
};

/// Reconciles gateway rules against the desired policy
pub struct RuleReconciler {
    client: Arc<dyn GatewayApi>,
    session: SessionId,
}

impl RuleReconciler {
    pub fn new(client: Arc<dyn GatewayApi>, session: SessionId) -> Self {
        Self { client, session }
    }

    /// Remove every stale engine-owned rule, returning the survivors
    ///
    /// A rule is stale when the engine owns it (name prefix) and its
    /// owner session differs from the current run's. Rules created by
    /// this very run are never deleted even if visited again, and
    /// non-owned rules pass through untouched so their precedences can
    /// be reserved later.
    ///
    /// Deletions are sequential; the first non-success response aborts
    /// the run, since the engine cannot safely proceed while stale rules
    /// may survive.
    pub async fn remove_stale_rules(
        &self,
        mut rules: Vec<GatewayRule>,
    ) -> Result<Vec<GatewayRule>, ReconcileError> {
        let stale_ids: Vec<String> = rules
            .iter()
            .filter(|rule| rule.is_owned())
            .filter(|rule| rule.owner_session().as_ref() != Some(&self.session))
            .map(|rule| rule.id.clone())
            .collect();

        info!("Removing {} stale rules", stale_ids.len());

        for (index, id) in stale_ids.iter().enumerate() {
            self.client
                .delete_rule(id)
                .await
                .map_err(|e| ReconcileError::DeleteRule {
                    id: id.clone(),
                    detail: e.to_string(),
                })?;
            rules.retain(|rule| &rule.id != id);
            debug!("Removed stale rule {} ({}/{})", id, index + 1, stale_ids.len());
        }

        Ok(rules)
    }

    /// Create the single blocking rule over the given block lists
    ///
    /// No explicit precedence is set; the server assigns its default.
    /// An empty list set is skipped with a warning, never submitted.
    pub async fn create_blocking_rule(
        &self,
        lists: &[GatewayList],
    ) -> Result<(), ReconcileError> {
        let traffic = traffic_expression(lists);
        if traffic.is_empty() {
            warn!("No block lists to reference, skipping blocking rule");
            return Ok(());
        }

        let rule = CreateRuleRequest::new(
            RULE_NAME_PREFIX.to_string(),
            RuleAction::Block,
            &self.session,
            traffic,
        );

        info!("Posting new blocking rule over {} lists", lists.len());
        self.client
            .create_rule(rule)
            .await
            .map_err(|e| ReconcileError::CreateRule {
                name: RULE_NAME_PREFIX.to_string(),
                detail: e.to_string(),
            })?;

        Ok(())
    }

    /// Create one override rule per destination, concurrently
    ///
    /// The precedence allocator is seeded with the precedences of
    /// `remaining` (rules that survived stale removal), so no new rule
    /// can collide with them. All destinations are spawned before any
    /// result is awaited; every task is joined regardless of earlier
    /// failures, and the call fails only at the join point if at least
    /// one destination failed.
    ///
    /// Returns the number of override rules created.
    pub async fn create_override_rules(
        &self,
        lists_by_destination: &BTreeMap<String, Vec<GatewayList>>,
        remaining: &[GatewayRule],
    ) -> Result<usize, ReconcileError> {
        let allocator = Arc::new(PrecedenceAllocator::seeded_from(remaining));
        let mut tasks = JoinSet::new();

        for (destination, lists) in lists_by_destination {
            let traffic = traffic_expression(lists);
            if traffic.is_empty() {
                warn!("No lists for destination {}, skipping", destination);
                continue;
            }

            let client = Arc::clone(&self.client);
            let session = self.session.clone();
            let allocator = Arc::clone(&allocator);
            let destination = destination.clone();

            tasks.spawn(async move {
                let precedence = allocator.next();
                let mut rule = CreateRuleRequest::new(
                    format!("{RULE_NAME_PREFIX} override to IP -> {destination}"),
                    RuleAction::Override,
                    &session,
                    traffic,
                );
                rule.precedence = Some(precedence);
                rule.rule_settings = Some(RuleSettings {
                    override_ips: vec![destination.clone()],
                });

                info!(
                    "Posting new override rule for IP {} at precedence {}",
                    destination, precedence
                );
                match client.create_rule(rule).await {
                    Ok(_) => Ok(destination),
                    Err(e) => Err(OverrideFailure {
                        destination,
                        detail: e.to_string(),
                    }),
                }
            });
        }

        let mut created = 0;
        let mut failures = Vec::new();

        // Join every task before deciding the outcome
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(destination)) => {
                    debug!("Override rule for {} created", destination);
                    created += 1;
                }
                Ok(Err(failure)) => {
                    error!(
                        "Failed to create override rule for {}: {}",
                        failure.destination, failure.detail
                    );
                    failures.push(failure);
                }
                Err(e) => {
                    error!("Override rule task panicked: {}", e);
                    failures.push(OverrideFailure {
                        destination: "(unknown)".to_string(),
                        detail: format!("task failed: {e}"),
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(created)
        } else {
            Err(ReconcileError::OverrideRules(OverrideFailures(failures)))
        }
    }
}
