//! Managed benchmark resource and its lifecycle phases.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bench::spec::BenchmarkSpec;
use crate::bench::stats::ResultStats;
use crate::error::ConfigError;

/// Where a benchmark resource stands relative to its external task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    /// No task recorded.
    #[default]
    Absent,
    /// Task creation in progress.
    Creating,
    /// Task created, not yet observed.
    Observing,
    /// Task finished; observation is final.
    Converged,
    /// Task still running.
    Diverging,
    /// Task teardown in progress.
    Deleting,
}

impl LifecyclePhase {
    /// Check if this phase allows moving to another phase.
    pub fn can_transition_to(&self, target: LifecyclePhase) -> bool {
        use LifecyclePhase::*;

        matches!(
            (self, target),
            // Creation
            (Absent, Creating) | (Creating, Observing) | (Creating, Absent) |
            // Observation
            (Observing, Converged) | (Observing, Diverging) |
            (Diverging, Converged) | (Diverging, Diverging) |
            (Converged, Converged) | (Converged, Diverging) |
            // Teardown
            (Creating, Deleting) | (Observing, Deleting) | (Diverging, Deleting) |
            (Converged, Deleting) | (Deleting, Deleting) | (Deleting, Absent) |
            (Absent, Absent)
        )
    }
}

impl std::fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Absent => "absent",
            Self::Creating => "creating",
            Self::Observing => "observing",
            Self::Converged => "converged",
            Self::Diverging => "diverging",
            Self::Deleting => "deleting",
        };
        write!(f, "{s}")
    }
}

/// Kind of the resource's current condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionKind {
    Creating,
    Available,
    Deleting,
    Unavailable,
}

/// Most recent condition set on the resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub last_transition_time: DateTime<Utc>,
}

/// Observed state of the external task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Observation {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub task_status: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub task_id: String,
    pub worker_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ResultStats>,
    /// Error the agents reported for the worker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// Observed state of the resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BenchStatus {
    pub phase: LifecyclePhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    pub at_provider: Observation,
}

impl BenchStatus {
    /// Move to a new phase.
    pub fn transition_to(&mut self, phase: LifecyclePhase) -> Result<(), String> {
        if !self.phase.can_transition_to(phase) {
            return Err(format!("Cannot transition from {} to {}", self.phase, phase));
        }
        self.phase = phase;
        Ok(())
    }

    /// Set the condition; an identical condition keeps its original timestamp.
    pub fn set_condition(&mut self, kind: ConditionKind, reason: Option<String>) {
        if let Some(current) = &self.condition
            && current.kind == kind
            && current.reason == reason
        {
            return;
        }
        self.condition = Some(Condition {
            kind,
            reason,
            last_transition_time: Utc::now(),
        });
    }
}

/// A benchmark resource: desired spec plus observed status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchResource {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub spec: BenchmarkSpec,
    #[serde(default)]
    pub deletion_requested: bool,
    #[serde(default)]
    pub status: BenchStatus,
}

impl BenchResource {
    pub fn new(name: impl Into<String>, spec: BenchmarkSpec) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            spec,
            deletion_requested: false,
            status: BenchStatus::default(),
        }
    }

    /// Load a resource manifest from a JSON file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        serde_json::from_str(&raw).map_err(|e| {
            ConfigError::ParseError(format!("{}: {}", path.as_ref().display(), e))
        })
    }

    pub fn observation(&self) -> &Observation {
        &self.status.at_provider
    }

    pub fn has_task(&self) -> bool {
        !self.status.at_provider.task_id.is_empty()
    }
}
