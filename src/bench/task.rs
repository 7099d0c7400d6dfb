//! Task descriptors and their agent-facing projection.
//!
//! A [`TaskDescriptor`] is built once per creation and never mutated; every
//! dispatch projects it into a fresh [`ExternalTaskView`] that carries only
//! the fields agents understand.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::spec::{BenchmarkSpec, KafkaTopics, WorkloadClass};

// ── Identifier generation ───────────────────────────────────────────

/// Source of task and worker identifiers.
pub trait IdSource: Send + Sync {
    /// A unique opaque task identifier.
    fn task_id(&self) -> String;
    /// A unique non-negative 63-bit worker identifier.
    fn worker_id(&self) -> i64;
}

/// Production ids: UUID v4 task ids, thread-local random worker ids.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn task_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn worker_id(&self) -> i64 {
        rand::thread_rng().gen_range(0..=i64::MAX)
    }
}

/// Reproducible ids drawn from a seeded generator.
pub struct SeededIds {
    rng: Mutex<StdRng>,
}

impl SeededIds {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl IdSource for SeededIds {
    fn task_id(&self) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let bytes: [u8; 16] = rng.r#gen();
        uuid::Builder::from_random_bytes(bytes).into_uuid().to_string()
    }

    fn worker_id(&self) -> i64 {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_range(0..=i64::MAX)
    }
}

/// Always hands out the same ids.
#[derive(Debug, Clone)]
pub struct FixedIds {
    pub task_id: String,
    pub worker_id: i64,
}

impl IdSource for FixedIds {
    fn task_id(&self) -> String {
        self.task_id.clone()
    }

    fn worker_id(&self) -> i64 {
        self.worker_id
    }
}

// ── Descriptor ──────────────────────────────────────────────────────

/// Spec snapshot plus the creation timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerTaskSpec {
    #[serde(flatten)]
    pub spec: BenchmarkSpec,
    pub start_ms: i64,
}

/// An immutable record of one benchmark task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDescriptor {
    pub task_id: String,
    pub worker_id: i64,
    pub spec: WorkerTaskSpec,
}

impl TaskDescriptor {
    /// Build a descriptor for `spec`, stamping it with fresh ids and the current time.
    pub fn build(spec: &BenchmarkSpec, ids: &dyn IdSource) -> Self {
        Self {
            task_id: ids.task_id(),
            worker_id: ids.worker_id(),
            spec: WorkerTaskSpec {
                spec: spec.clone(),
                start_ms: Utc::now().timestamp_millis(),
            },
        }
    }

    pub fn class(&self) -> WorkloadClass {
        self.spec.spec.class
    }

    /// Project onto the fields agents accept.
    ///
    /// Control-plane fields (`providerConfigRef`, `forProvider`,
    /// `deletionPolicy`) are never copied. Consumer workloads only send topic
    /// names since consumers do not create topics.
    pub fn external_view(&self) -> ExternalTaskView {
        let spec = &self.spec.spec;

        let active_topics = match spec.class {
            WorkloadClass::Consumer => ActiveTopics::Names(
                spec.active_topics
                    .keys()
                    .filter(|name| !name.is_empty())
                    .cloned()
                    .collect(),
            ),
            WorkloadClass::Producer | WorkloadClass::RoundTrip => {
                ActiveTopics::Layout(spec.active_topics.clone())
            }
        };

        ExternalTaskView {
            task_id: self.task_id.clone(),
            worker_id: self.worker_id,
            spec: ExternalSpecView {
                class: spec.class,
                duration_ms: spec.duration_ms,
                producer_node: spec.producer_node.clone(),
                consumer_node: spec.consumer_node.clone(),
                client_node: spec.client_node.clone(),
                consumer_group: spec.consumer_group.clone(),
                threads_per_worker: spec.threads_per_worker,
                bootstrap_servers: spec.bootstrap_servers.clone(),
                target_messages_per_sec: spec.target_messages_per_sec,
                max_messages: spec.max_messages,
                active_topics,
                inactive_topics: spec.inactive_topics.clone(),
                producer_conf: spec.producer_conf.clone(),
                consumer_conf: spec.consumer_conf.clone(),
                common_client_conf: spec.common_client_conf.clone(),
                admin_client_conf: spec.admin_client_conf.clone(),
                start_ms: self.spec.start_ms,
            },
        }
    }
}

// ── Wire view ───────────────────────────────────────────────────────

/// Body of a create-worker request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalTaskView {
    pub task_id: String,
    pub worker_id: i64,
    pub spec: ExternalSpecView,
}

/// Active topics as sent to agents: full layout, or names only for consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActiveTopics {
    Layout(BTreeMap<String, KafkaTopics>),
    Names(Vec<String>),
}

impl Default for ActiveTopics {
    fn default() -> Self {
        Self::Layout(BTreeMap::new())
    }
}

impl ActiveTopics {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Layout(topics) => topics.is_empty(),
            Self::Names(names) => names.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSpecView {
    pub class: WorkloadClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer_node: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer_node: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_node: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads_per_worker: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap_servers: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_messages_per_sec: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_messages: Option<i64>,
    #[serde(default, skip_serializing_if = "ActiveTopics::is_empty")]
    pub active_topics: ActiveTopics,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inactive_topics: BTreeMap<String, KafkaTopics>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub producer_conf: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub consumer_conf: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub common_client_conf: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub admin_client_conf: BTreeMap<String, String>,
    pub start_ms: i64,
}
