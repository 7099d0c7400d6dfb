//! Typed benchmark results reported by agents.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};

/// Results of a producer benchmark.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProducerStats {
    #[serde(deserialize_with = "whole_number")]
    pub total_sent: i64,
    pub average_latency_ms: f64,
    #[serde(deserialize_with = "whole_number")]
    pub p50_latency_ms: i64,
    #[serde(deserialize_with = "whole_number")]
    pub p95_latency_ms: i64,
    #[serde(deserialize_with = "whole_number")]
    pub p99_latency_ms: i64,
    #[serde(deserialize_with = "whole_number")]
    pub transactions_committed: i64,
}

/// Results of a round-trip benchmark.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoundTripStats {
    #[serde(deserialize_with = "whole_number")]
    pub total_unique_sent: i64,
    #[serde(deserialize_with = "whole_number")]
    pub total_received: i64,
}

/// Results of one consumer group member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsumerStats {
    pub assigned_partitions: BTreeSet<String>,
    #[serde(deserialize_with = "whole_number")]
    pub total_messages_received: i64,
    #[serde(deserialize_with = "whole_number")]
    pub total_bytes_received: i64,
    #[serde(deserialize_with = "whole_number")]
    pub average_message_size_bytes: i64,
    pub average_latency_ms: f64,
    #[serde(deserialize_with = "whole_number")]
    pub p50_latency_ms: i64,
    #[serde(deserialize_with = "whole_number")]
    pub p95_latency_ms: i64,
    #[serde(deserialize_with = "whole_number")]
    pub p99_latency_ms: i64,
    pub record_processor_status: BTreeMap<String, String>,
}

/// Decoded results; the variant always matches the requested workload class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResultStats {
    #[serde(rename = "producerStats")]
    Producer(ProducerStats),
    #[serde(rename = "roundTripStats")]
    RoundTrip(RoundTripStats),
    /// Keyed by record processor group id.
    #[serde(rename = "consumerStats")]
    Consumer(BTreeMap<String, ConsumerStats>),
}

impl ResultStats {
    pub fn as_producer(&self) -> Option<&ProducerStats> {
        match self {
            Self::Producer(stats) => Some(stats),
            _ => None,
        }
    }

    pub fn as_round_trip(&self) -> Option<&RoundTripStats> {
        match self {
            Self::RoundTrip(stats) => Some(stats),
            _ => None,
        }
    }

    pub fn as_consumer(&self) -> Option<&BTreeMap<String, ConsumerStats>> {
        match self {
            Self::Consumer(stats) => Some(stats),
            _ => None,
        }
    }
}

/// Deserialize an integer counter, accepting integral floats (`16.0`) since
/// agents serialize some counters as doubles.
fn whole_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Number::deserialize(deserializer)?;

    if let Some(n) = value.as_i64() {
        return Ok(n);
    }
    match value.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
            Ok(f as i64)
        }
        _ => Err(serde::de::Error::custom(format!(
            "expected a whole number, got {value}"
        ))),
    }
}
