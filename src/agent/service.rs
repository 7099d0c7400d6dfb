//! Agent REST client: task fan-out, status collection and teardown.

use std::sync::Arc;

use futures::future::join_all;
use rand::Rng;
use reqwest::StatusCode;

use super::decode::{WorkerReport, decode_entry};
use super::resolver::{AgentAddr, DnsPoolResolver, PoolResolver};
use super::wire::AgentStatusResponse;
use crate::bench::spec::{BenchmarkSpec, WorkloadClass};
use crate::bench::task::{ExternalTaskView, IdSource, RandomIds, TaskDescriptor};
use crate::config::CoordinatorConfig;
use crate::error::{
    AgentError, AgentOperation, ConfigError, CreateError, Error, ResolveError, StatusError,
};

/// Client for the agent pool backing one logical worker service.
pub struct AgentService {
    client: reqwest::Client,
    resolver: Arc<dyn PoolResolver>,
    ids: Arc<dyn IdSource>,
}

impl AgentService {
    /// Production service: DNS pool discovery and random ids.
    pub fn from_config(config: &CoordinatorConfig) -> Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self::new(
            client,
            Arc::new(DnsPoolResolver::new(&config.service_name, config.agent_port)),
            Arc::new(RandomIds),
        ))
    }

    pub fn new(
        client: reqwest::Client,
        resolver: Arc<dyn PoolResolver>,
        ids: Arc<dyn IdSource>,
    ) -> Self {
        Self {
            client,
            resolver,
            ids,
        }
    }

    pub fn pool_name(&self) -> &str {
        self.resolver.pool_name()
    }

    /// Current pool members; an empty pool is an error whatever the resolver.
    async fn resolve(&self) -> Result<Vec<AgentAddr>, ResolveError> {
        let addrs = self.resolver.resolve_headless_service().await?;
        if addrs.is_empty() {
            return Err(ResolveError::NoWorkersAvailable {
                pool: self.pool_name().to_string(),
            });
        }
        Ok(addrs)
    }

    // ── Create ──────────────────────────────────────────────────────────

    /// Create a task on every agent in the pool.
    ///
    /// All requests are in flight at once and the call waits for every one of
    /// them. Agents that accepted the task keep it even when others failed;
    /// the built descriptor is returned inside the error so the caller can
    /// track it.
    pub async fn create_across_pool(
        &self,
        spec: &BenchmarkSpec,
    ) -> Result<TaskDescriptor, CreateError> {
        let task = TaskDescriptor::build(spec, self.ids.as_ref());
        let view = task.external_view();

        let addrs = match self.resolve().await {
            Ok(addrs) => addrs,
            Err(e) => {
                return Err(CreateError {
                    task,
                    source: e.into(),
                });
            }
        };

        tracing::info!(
            task_id = %task.task_id,
            worker_id = task.worker_id,
            class = %task.class(),
            agents = addrs.len(),
            "Creating worker task across agent pool"
        );

        let results = join_all(addrs.iter().map(|addr| self.create_on(addr, &view))).await;

        let attempted = results.len();
        let failures: Vec<AgentError> = results.into_iter().filter_map(|r| r.err()).collect();

        if failures.is_empty() {
            return Ok(task);
        }

        for failure in &failures {
            tracing::warn!(worker_id = task.worker_id, error = %failure, "Worker task creation failed");
        }
        Err(CreateError {
            task,
            source: AgentError::FanOutFailed {
                operation: AgentOperation::CreateWorker,
                attempted,
                failures,
            }
            .into(),
        })
    }

    async fn create_on(&self, addr: &AgentAddr, view: &ExternalTaskView) -> Result<(), AgentError> {
        let op = AgentOperation::CreateWorker;
        let resp = self
            .client
            .post(format!("{}/agent/worker/create", addr.base_url()))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(view)
            .send()
            .await
            .map_err(|e| transport(addr, op, e))?;

        let resp = check_status(addr, op, resp).await?;
        tracing::debug!(addr = %addr, status = %resp.status(), "Agent accepted worker task");
        Ok(())
    }

    // ── Collect ─────────────────────────────────────────────────────────

    /// Read a worker's status from one agent of the pool.
    ///
    /// Status is pool-wide, so a single uniformly chosen agent is asked.
    pub async fn collect(&self, worker_id: i64, class: WorkloadClass) -> Result<WorkerReport, Error> {
        let addrs = self.resolve().await?;
        let addr = &addrs[rand::thread_rng().gen_range(0..addrs.len())];

        let status = self.fetch_status(addr).await?;
        let entry = status.worker(worker_id).ok_or_else(|| StatusError::NotFound {
            worker_id,
            addr: addr.to_string(),
        })?;

        let report = decode_entry(worker_id, class, entry)?;
        tracing::debug!(
            worker_id,
            addr = %addr,
            state = %report.state(),
            has_stats = report.stats().is_some(),
            "Collected worker status"
        );
        Ok(report)
    }

    async fn fetch_status(&self, addr: &AgentAddr) -> Result<AgentStatusResponse, AgentError> {
        let op = AgentOperation::QueryStatus;
        let resp = self
            .client
            .get(format!("{}/agent/status", addr.base_url()))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| transport(addr, op, e))?;

        let resp = check_status(addr, op, resp).await?;
        resp.json::<AgentStatusResponse>()
            .await
            .map_err(|e| AgentError::InvalidResponse {
                addr: addr.to_string(),
                operation: op,
                reason: e.to_string(),
            })
    }

    // ── Delete ──────────────────────────────────────────────────────────

    /// Delete a worker on every agent, one at a time, stopping at the first
    /// failure. Agents that no longer know the worker count as done.
    pub async fn delete_across_pool(&self, worker_id: i64) -> Result<(), Error> {
        let addrs = self.resolve().await?;
        let op = AgentOperation::DeleteWorker;

        for addr in &addrs {
            let resp = self
                .client
                .delete(format!("{}/agent/worker?workerId={worker_id}", addr.base_url()))
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await
                .map_err(|e| transport(addr, op, e))?;

            if resp.status() == StatusCode::NOT_FOUND {
                tracing::debug!(worker_id, addr = %addr, "Worker already absent on agent");
                continue;
            }
            check_status(addr, op, resp).await?;
        }

        tracing::info!(worker_id, agents = addrs.len(), "Deleted worker across agent pool");
        Ok(())
    }
}

fn transport(addr: &AgentAddr, operation: AgentOperation, e: reqwest::Error) -> AgentError {
    AgentError::Transport {
        addr: addr.to_string(),
        operation,
        reason: e.to_string(),
    }
}

async fn check_status(
    addr: &AgentAddr,
    operation: AgentOperation,
    resp: reqwest::Response,
) -> Result<reqwest::Response, AgentError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(AgentError::NonSuccessStatus {
        addr: addr.to_string(),
        operation,
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::bench::task::FixedIds;

    /// Resolves successfully to nobody.
    struct EmptyPool;

    #[async_trait]
    impl PoolResolver for EmptyPool {
        fn pool_name(&self) -> &str {
            "tarasque-agent"
        }

        async fn resolve_headless_service(&self) -> Result<Vec<AgentAddr>, ResolveError> {
            Ok(Vec::new())
        }
    }

    fn service() -> AgentService {
        AgentService::new(
            reqwest::Client::new(),
            Arc::new(EmptyPool),
            Arc::new(FixedIds {
                task_id: "task-1".into(),
                worker_id: 4242,
            }),
        )
    }

    fn is_empty_pool(err: &Error) -> bool {
        matches!(
            err,
            Error::Resolve(ResolveError::NoWorkersAvailable { pool }) if pool == "tarasque-agent"
        )
    }

    #[tokio::test]
    async fn collect_from_empty_pool_is_an_error() {
        let err = service()
            .collect(4242, WorkloadClass::Producer)
            .await
            .unwrap_err();
        assert!(is_empty_pool(&err), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn create_on_empty_pool_keeps_the_task() {
        let err = service()
            .create_across_pool(&BenchmarkSpec::new(WorkloadClass::Producer))
            .await
            .unwrap_err();
        assert_eq!(err.task.worker_id, 4242);
        assert!(is_empty_pool(&err.source));
    }

    #[tokio::test]
    async fn delete_on_empty_pool_is_an_error() {
        let err = service().delete_across_pool(4242).await.unwrap_err();
        assert!(is_empty_pool(&err));
    }
}
