//! Translation of a worker's status entry into typed results.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::wire::{AgentStatusEntry, StatusPayload};
use crate::bench::spec::WorkloadClass;
use crate::bench::stats::ResultStats;
use crate::error::StatusError;

/// Outcome of reading one worker's status.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerReport {
    /// No result object yet; poll again later.
    InProgress {
        state: String,
        message: Option<String>,
    },
    /// A result object decoded for the declared workload class.
    Stats { state: String, stats: ResultStats },
}

impl WorkerReport {
    pub fn state(&self) -> &str {
        match self {
            Self::InProgress { state, .. } | Self::Stats { state, .. } => state,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state() == super::wire::DONE_STATE
    }

    pub fn stats(&self) -> Option<&ResultStats> {
        match self {
            Self::Stats { stats, .. } => Some(stats),
            Self::InProgress { .. } => None,
        }
    }
}

/// Decode a worker's status entry.
///
/// A reported error wins over any status payload. The result shape comes from
/// `class` alone, never from the payload.
pub fn decode_entry(
    worker_id: i64,
    class: WorkloadClass,
    entry: &AgentStatusEntry,
) -> Result<WorkerReport, StatusError> {
    if let Some(message) = entry.failure() {
        return Err(StatusError::TaskFailed {
            worker_id,
            message: message.to_string(),
        });
    }

    match &entry.status {
        StatusPayload::Empty => Ok(WorkerReport::InProgress {
            state: entry.state.clone(),
            message: None,
        }),
        StatusPayload::Message(message) => Ok(WorkerReport::InProgress {
            state: entry.state.clone(),
            message: Some(message.clone()),
        }),
        StatusPayload::Result(object) => {
            let stats = decode_stats(class, object).map_err(|reason| {
                StatusError::DecodeFailed {
                    worker_id,
                    class: class.to_string(),
                    reason,
                }
            })?;
            Ok(WorkerReport::Stats {
                state: entry.state.clone(),
                stats,
            })
        }
    }
}

/// Decode a result object into the stats shape of `class`.
pub fn decode_stats(class: WorkloadClass, object: &Map<String, Value>) -> Result<ResultStats, String> {
    match class {
        WorkloadClass::Producer => decode_as(object).map(ResultStats::Producer),
        WorkloadClass::RoundTrip => decode_as(object).map(ResultStats::RoundTrip),
        WorkloadClass::Consumer => decode_as(object).map(ResultStats::Consumer),
    }
}

fn decode_as<T: DeserializeOwned>(object: &Map<String, Value>) -> Result<T, String> {
    serde_json::from_value(Value::Object(object.clone())).map_err(|e| e.to_string())
}
