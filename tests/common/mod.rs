//! In-process workload agents for integration tests.
//!
//! Each mock serves the agent REST contract on a random local port and keeps
//! its own worker table, which tests can inspect and edit.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use bench_coordinator::agent::{AgentAddr, AgentService, StaticPoolResolver};
use bench_coordinator::bench::FixedIds;

/// Maximum time any test is allowed to run before we consider it hung.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

pub const TASK_ID: &str = "8f0c1b1e-4a57-4d3b-9d55-6a1c3e2f7b10";
pub const WORKER_ID: i64 = 4242;

#[derive(Default)]
pub struct AgentState {
    pub fail_create: AtomicBool,
    pub fail_delete: AtomicBool,
    /// Create bodies in arrival order.
    pub created: Mutex<Vec<Value>>,
    pub workers: Mutex<BTreeMap<i64, Value>>,
    pub deleted: Mutex<Vec<i64>>,
}

pub struct MockAgent {
    pub addr: AgentAddr,
    pub state: Arc<AgentState>,
}

impl MockAgent {
    pub fn created(&self) -> Vec<Value> {
        self.state.created.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<i64> {
        self.state.deleted.lock().unwrap().clone()
    }

    pub fn set_worker(&self, worker_id: i64, entry: Value) {
        self.state.workers.lock().unwrap().insert(worker_id, entry);
    }

    pub fn has_worker(&self, worker_id: i64) -> bool {
        self.state.workers.lock().unwrap().contains_key(&worker_id)
    }
}

async fn create_worker(
    State(state): State<Arc<AgentState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, String)> {
    if state.fail_create.load(Ordering::SeqCst) {
        return Err((StatusCode::INTERNAL_SERVER_ERROR, "agent overloaded".into()));
    }
    let worker_id = body["workerId"].as_i64().unwrap_or_default();
    let task_id = body["taskId"].as_str().unwrap_or_default().to_string();
    state.created.lock().unwrap().push(body);
    state.workers.lock().unwrap().insert(
        worker_id,
        json!({"state": "PENDING", "taskId": task_id, "startedMs": 0, "doneMs": 0, "status": null, "error": ""}),
    );
    Ok(Json(json!({})))
}

async fn agent_status(State(state): State<Arc<AgentState>>) -> Json<Value> {
    let workers: serde_json::Map<String, Value> = state
        .workers
        .lock()
        .unwrap()
        .iter()
        .map(|(id, entry)| (id.to_string(), entry.clone()))
        .collect();
    Json(json!({"serverStartMs": 1649460800000_i64, "workers": workers}))
}

async fn delete_worker(
    State(state): State<Arc<AgentState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, (StatusCode, String)> {
    if state.fail_delete.load(Ordering::SeqCst) {
        return Err((StatusCode::INTERNAL_SERVER_ERROR, "agent overloaded".into()));
    }
    let worker_id: i64 = params
        .get("workerId")
        .and_then(|raw| raw.parse().ok())
        .ok_or((StatusCode::BAD_REQUEST, "missing workerId".to_string()))?;

    if state.workers.lock().unwrap().remove(&worker_id).is_none() {
        return Err((StatusCode::NOT_FOUND, format!("No worker {worker_id}")));
    }
    state.deleted.lock().unwrap().push(worker_id);
    Ok(Json(json!({})))
}

/// Start a mock agent on a random port.
pub async fn start_agent() -> MockAgent {
    let state = Arc::new(AgentState::default());
    let app = Router::new()
        .route("/agent/worker/create", post(create_worker))
        .route("/agent/status", get(agent_status))
        .route("/agent/worker", delete(delete_worker))
        .with_state(Arc::clone(&state));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    MockAgent {
        addr: AgentAddr::new("127.0.0.1", port),
        state,
    }
}

pub async fn start_pool(size: usize) -> Vec<MockAgent> {
    let mut agents = Vec::with_capacity(size);
    for _ in 0..size {
        agents.push(start_agent().await);
    }
    agents
}

/// Agent service over a static pool, handing out fixed ids.
pub fn service_for(agents: &[MockAgent]) -> AgentService {
    let addrs = agents.iter().map(|a| a.addr.clone()).collect();
    AgentService::new(
        reqwest::Client::new(),
        Arc::new(StaticPoolResolver::new(addrs).with_name("tarasque-agent")),
        Arc::new(FixedIds {
            task_id: TASK_ID.to_string(),
            worker_id: WORKER_ID,
        }),
    )
}

/// A finished producer worker.
pub fn done_producer_entry() -> Value {
    json!({
        "state": "DONE",
        "taskId": TASK_ID,
        "startedMs": 1649460862398_i64,
        "doneMs": 1649460862431_i64,
        "status": {
            "totalSent": 2497001,
            "averageLatencyMs": 350.56488,
            "p50LatencyMs": 16,
            "p95LatencyMs": 72,
            "p99LatencyMs": 10000,
            "transactionsCommitted": 0
        },
        "error": ""
    })
}
