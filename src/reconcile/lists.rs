//! List reconciliation
//!
//! Lists are fully recreated every run: every engine-owned list is
//! deleted, then new block lists and per-destination override lists are
//! created from the current desired domains. The gateway caps list size,
//! so a large domain set is split across numbered lists.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use super::error::ReconcileError;
use crate::api::constants::{LIST_NAME_PREFIX, MAX_LIST_SIZE};
use crate::api::{CreateListRequest, GatewayApi, GatewayList};
use crate::sources::OverrideRoute;

/// Reconciles gateway domain lists against the desired policy
pub struct ListReconciler {
    client: Arc<dyn GatewayApi>,
}

impl ListReconciler {
    pub fn new(client: Arc<dyn GatewayApi>) -> Self {
        Self { client }
    }

    /// Delete every engine-owned list, returning how many were removed
    pub async fn remove_old_lists(&self) -> Result<usize, ReconcileError> {
        let lists = self
            .client
            .list_lists()
            .await
            .map_err(|e| ReconcileError::ListLists(e.to_string()))?;

        let old: Vec<&GatewayList> = lists.iter().filter(|list| list.is_owned()).collect();
        info!("Removing {} old lists", old.len());

        for (index, list) in old.iter().enumerate() {
            self.client
                .delete_list(&list.id)
                .await
                .map_err(|e| ReconcileError::DeleteList {
                    id: list.id.clone(),
                    detail: e.to_string(),
                })?;
            debug!("Removed old list {} ({}/{})", list.id, index + 1, old.len());
        }

        Ok(old.len())
    }

    /// Create block lists from the desired block domains
    ///
    /// Domains are split into chunks of at most `MAX_LIST_SIZE`, one list
    /// per chunk, named `"<prefix> #<n>"`. Lists are returned in chunk
    /// order so the blocking rule's traffic expression is stable.
    pub async fn create_block_lists(
        &self,
        domains: &[String],
    ) -> Result<Vec<GatewayList>, ReconcileError> {
        let mut created = Vec::new();

        for (index, chunk) in domains.chunks(MAX_LIST_SIZE).enumerate() {
            let name = format!("{LIST_NAME_PREFIX} #{}", index + 1);
            created.push(self.create_list(name, chunk).await?);
        }

        info!(
            "Created {} block lists for {} domains",
            created.len(),
            domains.len()
        );
        Ok(created)
    }

    /// Create override lists for every redirect destination
    ///
    /// Returns a map from destination address to its created lists.
    pub async fn create_override_lists(
        &self,
        routes: &[OverrideRoute],
    ) -> Result<BTreeMap<String, Vec<GatewayList>>, ReconcileError> {
        let mut by_destination = BTreeMap::new();

        for route in routes {
            let mut lists = Vec::new();
            for (index, chunk) in route.domains.chunks(MAX_LIST_SIZE).enumerate() {
                let name = format!(
                    "{LIST_NAME_PREFIX} override to IP -> {} #{}",
                    route.destination,
                    index + 1
                );
                lists.push(self.create_list(name, chunk).await?);
            }
            debug!(
                "Created {} override lists for {}",
                lists.len(),
                route.destination
            );
            by_destination.insert(route.destination.clone(), lists);
        }

        Ok(by_destination)
    }

    async fn create_list(
        &self,
        name: String,
        domains: &[String],
    ) -> Result<GatewayList, ReconcileError> {
        let request = CreateListRequest::domains(name.clone(), domains.iter().cloned());
        self.client
            .create_list(request)
            .await
            .map_err(|e| ReconcileError::CreateList {
                name,
                detail: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::api::{ApiError, ApiResult, CreateRuleRequest, GatewayRule};

    #[derive(Default)]
    struct StubGateway {
        existing: Vec<GatewayList>,
        deleted: Mutex<Vec<String>>,
        created: Mutex<Vec<CreateListRequest>>,
    }

    #[async_trait]
    impl GatewayApi for StubGateway {
        async fn list_rules(&self) -> ApiResult<Vec<GatewayRule>> {
            Ok(Vec::new())
        }

        async fn create_rule(&self, _rule: CreateRuleRequest) -> ApiResult<GatewayRule> {
            Err(ApiError::InvalidResponse("not under test".to_string()))
        }

        async fn delete_rule(&self, _id: &str) -> ApiResult<()> {
            Ok(())
        }

        async fn list_lists(&self) -> ApiResult<Vec<GatewayList>> {
            Ok(self.existing.clone())
        }

        async fn create_list(&self, list: CreateListRequest) -> ApiResult<GatewayList> {
            let created = GatewayList {
                id: format!("list-{}", self.created.lock().len() + 1),
                name: list.name.clone(),
                count: u32::try_from(list.items.len()).unwrap(),
            };
            self.created.lock().push(list);
            Ok(created)
        }

        async fn delete_list(&self, id: &str) -> ApiResult<()> {
            self.deleted.lock().push(id.to_string());
            Ok(())
        }
    }

    fn list(id: &str, name: &str) -> GatewayList {
        GatewayList {
            id: id.to_string(),
            name: name.to_string(),
            count: 0,
        }
    }

    #[tokio::test]
    async fn test_remove_old_lists_only_touches_owned() {
        let stub = Arc::new(StubGateway {
            existing: vec![
                list("l1", "List set by script #1"),
                list("l2", "Corporate allowlist"),
                list("l3", "List set by script override to IP -> 10.0.0.1 #1"),
            ],
            ..StubGateway::default()
        });
        let reconciler = ListReconciler::new(stub.clone());

        let removed = reconciler.remove_old_lists().await.unwrap();

        assert_eq!(removed, 2);
        assert_eq!(*stub.deleted.lock(), vec!["l1".to_string(), "l3".to_string()]);
    }

    #[tokio::test]
    async fn test_block_lists_chunked_at_cap() {
        let stub = Arc::new(StubGateway::default());
        let reconciler = ListReconciler::new(stub.clone());

        let domains: Vec<String> = (0..MAX_LIST_SIZE + 2)
            .map(|i| format!("domain{i}.example"))
            .collect();
        let lists = reconciler.create_block_lists(&domains).await.unwrap();

        assert_eq!(lists.len(), 2);
        let created = stub.created.lock();
        assert_eq!(created[0].name, "List set by script #1");
        assert_eq!(created[0].items.len(), MAX_LIST_SIZE);
        assert_eq!(created[1].name, "List set by script #2");
        assert_eq!(created[1].items.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_block_domains_create_nothing() {
        let stub = Arc::new(StubGateway::default());
        let reconciler = ListReconciler::new(stub.clone());

        let lists = reconciler.create_block_lists(&[]).await.unwrap();
        assert!(lists.is_empty());
        assert!(stub.created.lock().is_empty());
    }

    #[tokio::test]
    async fn test_override_lists_named_per_destination() {
        let stub = Arc::new(StubGateway::default());
        let reconciler = ListReconciler::new(stub.clone());

        let routes = vec![OverrideRoute {
            destination: "10.0.0.1".to_string(),
            domains: vec!["intranet.example".to_string()],
        }];
        let by_destination = reconciler.create_override_lists(&routes).await.unwrap();

        assert_eq!(by_destination["10.0.0.1"].len(), 1);
        assert_eq!(
            by_destination["10.0.0.1"][0].name,
            "List set by script override to IP -> 10.0.0.1 #1"
        );
    }
}
