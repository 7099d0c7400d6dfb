//! Lifecycle driver for the external benchmark task behind a
//! [`BenchResource`].
//!
//! Each operation is safe to repeat with the same recorded ids.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::resource::{BenchResource, ConditionKind, LifecyclePhase};
use crate::agent::{AgentService, WorkerReport};
use crate::error::{Error, StatusError};

/// Task status recorded right after creation.
pub const CREATED_STATUS: &str = "CREATED";

/// What `observe` learned about the external task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExternalObservation {
    /// False when `create` must run.
    pub resource_exists: bool,
    /// False when `update` must run.
    pub resource_up_to_date: bool,
}

/// Details handed back after a successful creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalCreation {
    pub connection_details: BTreeMap<String, Vec<u8>>,
}

/// Operations a reconciler drives against an external resource.
#[async_trait]
pub trait ExternalClient: Send + Sync {
    async fn observe(&self, resource: &mut BenchResource) -> Result<ExternalObservation, Error>;

    async fn create(&self, resource: &mut BenchResource) -> Result<ExternalCreation, Error>;

    async fn update(&self, resource: &mut BenchResource) -> Result<(), Error>;

    async fn delete(&self, resource: &mut BenchResource) -> Result<(), Error>;
}

/// Drives benchmark tasks on the agent pool.
pub struct BenchExternal {
    service: Arc<AgentService>,
}

impl BenchExternal {
    pub fn new(service: Arc<AgentService>) -> Self {
        Self { service }
    }

    async fn collect(&self, resource: &BenchResource) -> Result<WorkerReport, Error> {
        self.service
            .collect(resource.status.at_provider.worker_id, resource.spec.class)
            .await
    }
}

#[async_trait]
impl ExternalClient for BenchExternal {
    async fn observe(&self, resource: &mut BenchResource) -> Result<ExternalObservation, Error> {
        if !resource.has_task() {
            set_phase(resource, LifecyclePhase::Absent);
            return Ok(ExternalObservation::default());
        }

        // Teardown only needs the recorded ids, and a failed benchmark stays
        // failed; neither polls the agents.
        if resource.deletion_requested || resource.status.at_provider.failure.is_some() {
            return Ok(ExternalObservation {
                resource_exists: true,
                resource_up_to_date: true,
            });
        }

        let up_to_date = match self.collect(resource).await {
            Ok(report) => {
                let done = report.is_done();
                if let WorkerReport::Stats { state, stats } = report {
                    record_stats(resource, state, stats);
                }
                done
            }
            Err(e) if e.is_transient() => {
                tracing::debug!(resource = %resource.name, error = %e, "Worker not visible yet");
                false
            }
            Err(Error::Status(StatusError::TaskFailed { message, .. })) => {
                record_failure(resource, message);
                true
            }
            Err(e) => return Err(e),
        };

        let phase = if up_to_date {
            LifecyclePhase::Converged
        } else {
            LifecyclePhase::Diverging
        };
        set_phase(resource, phase);

        Ok(ExternalObservation {
            resource_exists: true,
            resource_up_to_date: up_to_date,
        })
    }

    async fn create(&self, resource: &mut BenchResource) -> Result<ExternalCreation, Error> {
        if resource.has_task() {
            tracing::debug!(
                resource = %resource.name,
                task_id = %resource.status.at_provider.task_id,
                "Task already recorded, skipping creation"
            );
            return Ok(connection_details(resource));
        }

        resource.status.set_condition(ConditionKind::Creating, None);
        set_phase(resource, LifecyclePhase::Creating);

        let task = match self.service.create_across_pool(&resource.spec).await {
            Ok(task) => task,
            Err(e) => {
                tracing::warn!(
                    resource = %resource.name,
                    task_id = %e.task.task_id,
                    worker_id = e.task.worker_id,
                    "Task creation incomplete; agents that accepted it keep running it"
                );
                set_phase(resource, LifecyclePhase::Absent);
                return Err(Error::Create(Box::new(e)));
            }
        };

        let observation = &mut resource.status.at_provider;
        observation.task_status = CREATED_STATUS.to_string();
        observation.task_id = task.task_id;
        observation.worker_id = task.worker_id;
        observation.stats = None;
        observation.failure = None;
        set_phase(resource, LifecyclePhase::Observing);

        tracing::info!(
            resource = %resource.name,
            task_id = %resource.status.at_provider.task_id,
            worker_id = resource.status.at_provider.worker_id,
            "Benchmark task created"
        );
        Ok(connection_details(resource))
    }

    async fn update(&self, resource: &mut BenchResource) -> Result<(), Error> {
        if !resource.has_task() {
            return Ok(());
        }

        match self.collect(resource).await {
            Ok(WorkerReport::Stats { state, stats }) => {
                let done = state == crate::agent::wire::DONE_STATE;
                record_stats(resource, state, stats);
                if done {
                    set_phase(resource, LifecyclePhase::Converged);
                }
                Ok(())
            }
            Ok(WorkerReport::InProgress { state, message }) => {
                tracing::info!(
                    resource = %resource.name,
                    state = %state,
                    message = message.as_deref().unwrap_or(""),
                    "Task running, waiting for results"
                );
                Ok(())
            }
            Err(e) if e.is_transient() => {
                tracing::debug!(resource = %resource.name, error = %e, "Worker not visible yet");
                Ok(())
            }
            Err(Error::Status(StatusError::TaskFailed { message, .. })) => {
                record_failure(resource, message);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, resource: &mut BenchResource) -> Result<(), Error> {
        resource.status.set_condition(ConditionKind::Deleting, None);

        if !resource.has_task() {
            set_phase(resource, LifecyclePhase::Absent);
            return Ok(());
        }

        set_phase(resource, LifecyclePhase::Deleting);
        self.service
            .delete_across_pool(resource.status.at_provider.worker_id)
            .await?;

        resource.status.at_provider.task_id.clear();
        set_phase(resource, LifecyclePhase::Absent);
        tracing::info!(
            resource = %resource.name,
            worker_id = resource.status.at_provider.worker_id,
            "Benchmark task deleted"
        );
        Ok(())
    }
}

/// Move to `phase`; the recorded ids are authoritative, so a transition the
/// table does not expect is logged and applied anyway.
fn set_phase(resource: &mut BenchResource, phase: LifecyclePhase) {
    if let Err(reason) = resource.status.transition_to(phase) {
        tracing::warn!(resource = %resource.name, "{reason}; forcing phase {phase}");
        resource.status.phase = phase;
    }
}

fn record_stats(resource: &mut BenchResource, state: String, stats: crate::bench::ResultStats) {
    let observation = &mut resource.status.at_provider;
    observation.task_status = state;
    observation.stats = Some(stats);
    resource.status.set_condition(ConditionKind::Available, None);
}

fn record_failure(resource: &mut BenchResource, message: String) {
    tracing::warn!(resource = %resource.name, error = %message, "Benchmark task failed");
    resource
        .status
        .set_condition(ConditionKind::Unavailable, Some(message.clone()));
    resource.status.at_provider.failure = Some(message);
    set_phase(resource, LifecyclePhase::Converged);
}

fn connection_details(resource: &BenchResource) -> ExternalCreation {
    let mut details = BTreeMap::new();
    details.insert(
        "taskId".to_string(),
        resource.status.at_provider.task_id.clone().into_bytes(),
    );
    details.insert("name".to_string(), resource.name.clone().into_bytes());
    details.insert(
        "namespace".to_string(),
        resource.namespace.clone().unwrap_or_default().into_bytes(),
    );
    ExternalCreation {
        connection_details: details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::spec::{BenchmarkSpec, WorkloadClass};
    use crate::bench::stats::{ResultStats, RoundTripStats};

    fn resource() -> BenchResource {
        let mut resource =
            BenchResource::new("newBenchmark", BenchmarkSpec::new(WorkloadClass::RoundTrip));
        resource.namespace = Some("test".into());
        resource
    }

    #[test]
    fn connection_details_name_the_task() {
        let mut resource = resource();
        resource.status.at_provider.task_id = "3d1c".into();
        let details = connection_details(&resource).connection_details;
        assert_eq!(details["taskId"], b"3d1c".to_vec());
        assert_eq!(details["name"], b"newBenchmark".to_vec());
        assert_eq!(details["namespace"], b"test".to_vec());
    }

    #[test]
    fn failure_is_terminal() {
        let mut resource = resource();
        resource.status.phase = LifecyclePhase::Diverging;
        record_failure(&mut resource, "worker expired".into());

        assert_eq!(resource.status.phase, LifecyclePhase::Converged);
        assert_eq!(
            resource.observation().failure.as_deref(),
            Some("worker expired")
        );
        let condition = resource.status.condition.as_ref().unwrap();
        assert_eq!(condition.kind, ConditionKind::Unavailable);
        assert_eq!(condition.reason.as_deref(), Some("worker expired"));
    }

    #[test]
    fn stats_mark_resource_available() {
        let mut resource = resource();
        let stats = ResultStats::RoundTrip(RoundTripStats {
            total_unique_sent: 100,
            total_received: 100,
        });
        record_stats(&mut resource, "RUNNING".into(), stats.clone());

        assert_eq!(resource.observation().task_status, "RUNNING");
        assert_eq!(resource.observation().stats.as_ref(), Some(&stats));
        assert_eq!(
            resource.status.condition.as_ref().unwrap().kind,
            ConditionKind::Available
        );
    }

    #[tokio::test]
    async fn deletion_observes_without_polling_agents() {
        // An empty pool fails any request, so reaching the agents would error.
        let service = AgentService::new(
            reqwest::Client::new(),
            Arc::new(crate::agent::StaticPoolResolver::new(Vec::new())),
            Arc::new(crate::bench::task::RandomIds),
        );
        let external = BenchExternal::new(Arc::new(service));
        let mut resource = resource();
        resource.status.at_provider.task_id = "3d1c".into();
        resource.status.phase = LifecyclePhase::Deleting;
        resource.deletion_requested = true;

        let observation = external.observe(&mut resource).await.unwrap();
        assert!(observation.resource_exists);
        assert_eq!(resource.status.phase, LifecyclePhase::Deleting);
    }

    #[test]
    fn unexpected_transition_is_forced() {
        let mut resource = resource();
        set_phase(&mut resource, LifecyclePhase::Converged);
        assert_eq!(resource.status.phase, LifecyclePhase::Converged);
    }
}
