//! Federated read path: fan a visit list out to every remote partition,
//! drop the ones that fail or time out, and merge the rest into one
//! timestamp-ordered view. Read-only, best-effort; an empty result is a
//! valid outcome even when every remote failed.

use std::sync::Arc;
use std::time::Duration;

use futures::future;
use tracing::{debug, warn};

use crate::models::ClinicalVisit;
use crate::registry::{PartitionRegistry, PartitionTarget};
use crate::store::StoreProvider;

/// What happened to one partition during a fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionStatus {
    Fetched(usize),
    Unavailable(String),
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct PartitionOutcome {
    pub tenant_id: i64,
    pub site: String,
    pub status: PartitionStatus,
}

/// Merged fan-out result. `outcomes` keeps the per-partition success/failure
/// tags for observability; callers that only want data read `visits`.
#[derive(Debug)]
pub struct FederatedList {
    pub visits: Vec<ClinicalVisit>,
    pub outcomes: Vec<PartitionOutcome>,
}

pub struct FederationEngine {
    registry: Arc<PartitionRegistry>,
    stores: Arc<dyn StoreProvider>,
    query_timeout: Duration,
}

impl FederationEngine {
    pub fn new(
        registry: Arc<PartitionRegistry>,
        stores: Arc<dyn StoreProvider>,
        query_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            stores,
            query_timeout,
        }
    }

    /// List visits across every remote partition. Queries run concurrently;
    /// the merge waits for all of them (success or failure) before sorting
    /// the combined records newest-first. Identifiers are partition-local
    /// and are deliberately not deduplicated.
    pub async fn list_all_visits(&self) -> FederatedList {
        let fanout = self.registry.fanout_set();
        let results =
            future::join_all(fanout.into_iter().map(|t| self.query_partition(t))).await;

        let mut visits = Vec::new();
        let mut outcomes = Vec::with_capacity(results.len());
        for (outcome, partition_visits) in results {
            visits.extend(partition_visits);
            outcomes.push(outcome);
        }

        // Stable sort keeps ties in fan-out order.
        visits.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));

        debug!(
            partitions = outcomes.len(),
            records = visits.len(),
            "federated list assembled"
        );
        FederatedList { visits, outcomes }
    }

    /// One partition's contribution. Any failure is contained here: the
    /// partition is dropped from the merge and the aggregation carries on.
    async fn query_partition(
        &self,
        target: &PartitionTarget,
    ) -> (PartitionOutcome, Vec<ClinicalVisit>) {
        let fetch = async {
            let store = self.stores.partition(target).await?;
            store.list_visits().await
        };

        let status = match tokio::time::timeout(self.query_timeout, fetch).await {
            Ok(Ok(visits)) => {
                let outcome = PartitionOutcome {
                    tenant_id: target.tenant_id,
                    site: target.name.clone(),
                    status: PartitionStatus::Fetched(visits.len()),
                };
                return (outcome, visits);
            }
            Ok(Err(e)) => {
                warn!(
                    tenant_id = target.tenant_id,
                    site = %target.name,
                    error = %e,
                    "partition dropped from federated list"
                );
                PartitionStatus::Unavailable(e.to_string())
            }
            Err(_) => {
                warn!(
                    tenant_id = target.tenant_id,
                    site = %target.name,
                    timeout_ms = self.query_timeout.as_millis() as u64,
                    "partition timed out during federated list"
                );
                PartitionStatus::TimedOut
            }
        };

        (
            PartitionOutcome {
                tenant_id: target.tenant_id,
                site: target.name.clone(),
                status,
            },
            Vec::new(),
        )
    }
}
