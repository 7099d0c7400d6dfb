//! Agent status wire types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `GET /agent/status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentStatusResponse {
    pub server_start_ms: i64,
    /// Keyed by the decimal worker id.
    pub workers: HashMap<String, AgentStatusEntry>,
}

impl AgentStatusResponse {
    pub fn worker(&self, worker_id: i64) -> Option<&AgentStatusEntry> {
        self.workers.get(&worker_id.to_string())
    }
}

/// Status of a single worker as reported by an agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentStatusEntry {
    pub state: String,
    pub task_id: String,
    pub started_ms: i64,
    pub done_ms: i64,
    pub status: StatusPayload,
    /// Empty unless the worker failed.
    pub error: String,
}

impl AgentStatusEntry {
    pub fn is_done(&self) -> bool {
        self.state == DONE_STATE
    }

    pub fn failure(&self) -> Option<&str> {
        (!self.error.is_empty()).then_some(self.error.as_str())
    }
}

/// Worker state reported once a task finished.
pub const DONE_STATE: &str = "DONE";

/// The polymorphic `status` field.
///
/// Agents report nothing while a worker starts, a progress string while it
/// prepares (`"Creating 5 topic(s)"`), and a result object once stats exist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<Value>", into = "Option<Value>")]
pub enum StatusPayload {
    #[default]
    Empty,
    Message(String),
    Result(Map<String, Value>),
}

impl From<Option<Value>> for StatusPayload {
    fn from(value: Option<Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Empty,
            Some(Value::String(s)) => Self::Message(s),
            Some(Value::Object(map)) => Self::Result(map),
            Some(other) => Self::Message(other.to_string()),
        }
    }
}

impl From<StatusPayload> for Option<Value> {
    fn from(payload: StatusPayload) -> Self {
        match payload {
            StatusPayload::Empty => None,
            StatusPayload::Message(s) => Some(Value::String(s)),
            StatusPayload::Result(map) => Some(Value::Object(map)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(status: Value) -> AgentStatusEntry {
        serde_json::from_value(json!({
            "state": "RUNNING",
            "taskId": "1",
            "startedMs": 1649460862398_i64,
            "status": status
        }))
        .unwrap()
    }

    #[test]
    fn status_variants() {
        assert_eq!(entry(Value::Null).status, StatusPayload::Empty);
        assert_eq!(
            entry(json!("Creating 5 topic(s)")).status,
            StatusPayload::Message("Creating 5 topic(s)".into())
        );
        assert!(matches!(
            entry(json!({"totalSent": 1})).status,
            StatusPayload::Result(_)
        ));
        assert_eq!(entry(json!(42)).status, StatusPayload::Message("42".into()));
    }

    #[test]
    fn missing_status_is_empty() {
        let e: AgentStatusEntry = serde_json::from_value(json!({"state": "PENDING"})).unwrap();
        assert_eq!(e.status, StatusPayload::Empty);
        assert!(e.failure().is_none());
        assert!(!e.is_done());
    }

    #[test]
    fn parses_agent_status_table() {
        let resp: AgentStatusResponse = serde_json::from_value(json!({
            "serverStartMs": 1000,
            "workers": {
                "1234": {
                    "state": "DONE",
                    "taskId": "1",
                    "startedMs": 1649460862398_i64,
                    "doneMs": 1649460862431_i64,
                    "status": null,
                    "error": "worker expired"
                }
            }
        }))
        .unwrap();

        assert_eq!(resp.server_start_ms, 1000);
        let worker = resp.worker(1234).unwrap();
        assert!(worker.is_done());
        assert_eq!(worker.failure(), Some("worker expired"));
        assert_eq!(worker.done_ms, 1649460862431);
        assert!(resp.worker(1).is_none());
    }

    #[test]
    fn empty_payload_is_omitted_as_null() {
        let value = serde_json::to_value(AgentStatusEntry::default()).unwrap();
        assert_eq!(value["status"], Value::Null);
    }
}
