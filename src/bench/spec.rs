//! Desired benchmark configuration as declared in a resource manifest.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Shape of the benchmark an agent runs.
///
/// Serialized as the agent's fully qualified workload class name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkloadClass {
    #[serde(rename = "org.apache.kafka.trogdor.workload.ProduceBenchSpec")]
    Producer,
    #[serde(rename = "org.apache.kafka.trogdor.workload.RoundTripWorkloadSpec")]
    RoundTrip,
    #[serde(rename = "org.apache.kafka.trogdor.workload.ConsumeBenchSpec")]
    Consumer,
}

impl WorkloadClass {
    /// Wire identifier understood by the agents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Producer => "org.apache.kafka.trogdor.workload.ProduceBenchSpec",
            Self::RoundTrip => "org.apache.kafka.trogdor.workload.RoundTripWorkloadSpec",
            Self::Consumer => "org.apache.kafka.trogdor.workload.ConsumeBenchSpec",
        }
    }
}

impl std::fmt::Display for WorkloadClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Producer => "producer",
            Self::RoundTrip => "round_trip",
            Self::Consumer => "consumer",
        };
        write!(f, "{s}")
    }
}

/// Partition layout for a topic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KafkaTopics {
    #[serde(default, skip_serializing_if = "is_zero_i16")]
    pub num_partitions: i16,
    #[serde(default, skip_serializing_if = "is_zero_i8")]
    pub replication_factor: i8,
}

fn is_zero_i16(v: &i16) -> bool {
    *v == 0
}

fn is_zero_i8(v: &i8) -> bool {
    *v == 0
}

/// Reference to the provider configuration that owns credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfigReference {
    pub name: String,
}

/// What happens to the external task when the resource goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletionPolicy {
    Delete,
    Orphan,
}

/// Desired state of a benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkSpec {
    // ── Control plane (never sent to agents) ─────────────────────────
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config_ref: Option<ProviderConfigReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_provider: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<DeletionPolicy>,

    // ── Workload ─────────────────────────────────────────────────────
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

    // ── Topics ───────────────────────────────────────────────────────
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub active_topics: BTreeMap<String, KafkaTopics>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inactive_topics: BTreeMap<String, KafkaTopics>,

    // ── Client configuration ─────────────────────────────────────────
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub producer_conf: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub consumer_conf: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub common_client_conf: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub admin_client_conf: BTreeMap<String, String>,
}

impl BenchmarkSpec {
    /// Minimal spec for a workload class; everything else left unset.
    pub fn new(class: WorkloadClass) -> Self {
        Self {
            provider_config_ref: None,
            for_provider: None,
            deletion_policy: None,
            class,
            duration_ms: None,
            producer_node: None,
            consumer_node: None,
            client_node: None,
            consumer_group: None,
            threads_per_worker: None,
            bootstrap_servers: None,
            target_messages_per_sec: None,
            max_messages: None,
            active_topics: BTreeMap::new(),
            inactive_topics: BTreeMap::new(),
            producer_conf: BTreeMap::new(),
            consumer_conf: BTreeMap::new(),
            common_client_conf: BTreeMap::new(),
            admin_client_conf: BTreeMap::new(),
        }
    }

    /// Add an active topic.
    pub fn with_active_topic(
        mut self,
        name: impl Into<String>,
        num_partitions: i16,
        replication_factor: i8,
    ) -> Self {
        self.active_topics.insert(
            name.into(),
            KafkaTopics {
                num_partitions,
                replication_factor,
            },
        );
        self
    }

    pub fn with_bootstrap_servers(mut self, servers: impl Into<String>) -> Self {
        self.bootstrap_servers = Some(servers.into());
        self
    }
}
