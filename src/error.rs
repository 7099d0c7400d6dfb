//! Error types for the benchmark coordinator.

use crate::bench::task::TaskDescriptor;

/// Top-level error type for the coordinator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Resolver error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Status error: {0}")]
    Status(#[from] StatusError),

    #[error("Task creation error: {0}")]
    Create(#[from] Box<CreateError>),
}

impl Error {
    /// Whether the condition is expected to clear up on a later cycle
    /// without any action (agents lag behind a freshly created worker).
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Status(StatusError::NotFound { .. }))
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("Failed to parse manifest: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Agent pool discovery errors.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Failed to resolve agent pool {pool}: {reason}")]
    ResolutionFailed { pool: String, reason: String },

    #[error("No workers available in agent pool {pool}")]
    NoWorkersAvailable { pool: String },
}

/// The agent operation a request belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentOperation {
    CreateWorker,
    QueryStatus,
    DeleteWorker,
}

impl std::fmt::Display for AgentOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CreateWorker => "create worker",
            Self::QueryStatus => "query status",
            Self::DeleteWorker => "delete worker",
        };
        write!(f, "{s}")
    }
}

/// Per-address request failures.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("{operation} on agent {addr} failed: {reason}")]
    Transport {
        addr: String,
        operation: AgentOperation,
        reason: String,
    },

    #[error("{operation} on agent {addr} returned {status}: {body}")]
    NonSuccessStatus {
        addr: String,
        operation: AgentOperation,
        status: u16,
        body: String,
    },

    #[error("Invalid response to {operation} from agent {addr}: {reason}")]
    InvalidResponse {
        addr: String,
        operation: AgentOperation,
        reason: String,
    },

    #[error(
        "{operation} failed on {} of {attempted} agents: {}",
        .failures.len(),
        .failures.iter().map(|f| f.to_string()).collect::<Vec<_>>().join("; ")
    )]
    FanOutFailed {
        operation: AgentOperation,
        attempted: usize,
        failures: Vec<AgentError>,
    },
}

impl AgentError {
    /// Address the failure happened on (`None` for an aggregated fan-out failure).
    pub fn addr(&self) -> Option<&str> {
        match self {
            Self::Transport { addr, .. }
            | Self::NonSuccessStatus { addr, .. }
            | Self::InvalidResponse { addr, .. } => Some(addr),
            Self::FanOutFailed { .. } => None,
        }
    }

    /// Addresses that failed, in dispatch order.
    pub fn failed_addrs(&self) -> Vec<&str> {
        match self {
            Self::FanOutFailed { failures, .. } => {
                failures.iter().filter_map(|f| f.addr()).collect()
            }
            other => other.addr().into_iter().collect(),
        }
    }
}

/// Errors raised while reading a worker's status.
#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("Task for worker {worker_id} failed: {message}")]
    TaskFailed { worker_id: i64, message: String },

    #[error("Cannot decode {class} status of worker {worker_id}: {reason}")]
    DecodeFailed {
        worker_id: i64,
        class: String,
        reason: String,
    },

    #[error("Worker {worker_id} not found in status table of agent {addr}")]
    NotFound { worker_id: i64, addr: String },
}

/// Task creation did not reach every agent.
///
/// The descriptor is built before anything is sent, so it is always returned
/// and the caller can track the worker for cleanup.
#[derive(Debug, thiserror::Error)]
#[error(
    "task {} (worker {}) not created on every agent: {source}",
    .task.task_id,
    .task.worker_id
)]
pub struct CreateError {
    pub task: TaskDescriptor,
    #[source]
    pub source: Error,
}

/// Result type alias for the coordinator.
pub type Result<T> = std::result::Result<T, Error>;
