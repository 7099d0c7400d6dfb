//! Reconcile loop: compares a resource's desired state with what the agents
//! report and drives the external client toward it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::external::ExternalClient;
use super::resource::{BenchResource, LifecyclePhase};
use crate::bench::spec::DeletionPolicy;
use crate::error::Error;

/// What a single reconcile pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Created,
    Updated,
    UpToDate,
    Deleted,
    AlreadyAbsent,
    /// Deletion requested with the orphan policy; the task keeps running.
    Orphaned,
}

impl ReconcileOutcome {
    /// Whether further passes have nothing left to do.
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Created | Self::Updated)
    }
}

/// How a reconcile run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Settled(ReconcileOutcome),
    Shutdown,
}

pub struct Reconciler {
    client: Arc<dyn ExternalClient>,
}

impl Reconciler {
    pub fn new(client: Arc<dyn ExternalClient>) -> Self {
        Self { client }
    }

    /// Run one observe-then-act pass.
    pub async fn reconcile(&self, resource: &mut BenchResource) -> Result<ReconcileOutcome, Error> {
        let observation = self.client.observe(resource).await?;

        if resource.deletion_requested {
            if !observation.resource_exists {
                return Ok(ReconcileOutcome::AlreadyAbsent);
            }
            if resource.spec.deletion_policy == Some(DeletionPolicy::Orphan) {
                tracing::info!(
                    resource = %resource.name,
                    worker_id = resource.status.at_provider.worker_id,
                    "Orphaning benchmark task"
                );
                resource.status.at_provider.task_id.clear();
                resource.status.phase = LifecyclePhase::Absent;
                return Ok(ReconcileOutcome::Orphaned);
            }
            self.client.delete(resource).await?;
            return Ok(ReconcileOutcome::Deleted);
        }

        if !observation.resource_exists {
            let creation = self.client.create(resource).await?;
            tracing::debug!(
                resource = %resource.name,
                details = creation.connection_details.len(),
                "Published connection details"
            );
            return Ok(ReconcileOutcome::Created);
        }

        if !observation.resource_up_to_date {
            self.client.update(resource).await?;
            return Ok(ReconcileOutcome::Updated);
        }

        Ok(ReconcileOutcome::UpToDate)
    }

    /// Reconcile on every tick until a pass settles or `shutdown` resolves.
    ///
    /// The first pass runs immediately. A failed pass is logged and retried
    /// on the next tick.
    pub async fn run_until_settled<F>(
        &self,
        resource: &mut BenchResource,
        interval: Duration,
        shutdown: F,
    ) -> RunOutcome
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(interval);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!(resource = %resource.name, "Reconcile loop shutting down");
                    return RunOutcome::Shutdown;
                }
                _ = ticker.tick() => {}
            }

            match self.reconcile(resource).await {
                Ok(outcome) => {
                    tracing::debug!(
                        resource = %resource.name,
                        phase = %resource.status.phase,
                        ?outcome,
                        "Reconciled"
                    );
                    if outcome.is_settled() {
                        return RunOutcome::Settled(outcome);
                    }
                }
                Err(e) => {
                    tracing::warn!(resource = %resource.name, error = %e, "Reconcile failed, retrying");
                }
            }
        }
    }
}
