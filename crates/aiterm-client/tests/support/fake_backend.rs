//! Local HTTP stand-in for the command-execution backend.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct BackendState {
    requests: Arc<Mutex<Vec<Value>>>,
}

pub struct FakeBackend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state = BackendState::default();
        let requests = state.requests.clone();
        let app = Router::new()
            .route("/api/execute", post(execute))
            .route("/api/health", get(health))
            .route("/api/directory", get(directory))
            .route("/api/history", get(history))
            .route("/api/feedback", get(feedback))
            .route("/api/search", post(search))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, requests }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// JSON bodies received by `/api/execute` and `/api/search`, in order.
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().clone()
    }
}

async fn execute(State(state): State<BackendState>, Json(body): Json<Value>) -> Response {
    state.requests.lock().push(body.clone());
    let command = body["command"].as_str().unwrap_or_default().to_string();
    let executor = body["preferred_executor"]
        .as_str()
        .unwrap_or("mini-bash")
        .to_string();

    match command.as_str() {
        "fail" => (
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "error": "File not found: adi.c", "command": "open"})),
        )
            .into_response(),
        "boom" => (StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>").into_response(),
        "garbage" => (StatusCode::OK, "definitely not json").into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({"success": true, "output": "late"})).into_response()
        }
        "" => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "No command provided"})),
        )
            .into_response(),
        _ => Json(json!({
            "success": true,
            "output": format!("ran {command}"),
            "error": "",
            "executor": executor,
            "command": "ls -la",
            "ai_interpretation": {
                "command": "ls -la",
                "explanation": "List files with details",
                "confidence": 0.92,
                "needs_file_search": false
            },
            "current_directory": "/home/u/projects"
        }))
        .into_response(),
    }
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": "2026-10-19T10:00:00",
        "gemini_available": true,
        "mini_bash_available": false,
        "current_directory": "/home/u"
    }))
}

async fn directory() -> Json<Value> {
    Json(json!({
        "current_directory": "/home/u",
        "home_directory": "/home/u",
        "exists": true
    }))
}

#[derive(Deserialize)]
struct HistoryParams {
    limit: Option<usize>,
}

async fn history(Query(params): Query<HistoryParams>) -> Json<Value> {
    let all: Vec<Value> = (0..3)
        .map(|i| {
            json!({
                "timestamp": format!("2026-10-19T10:00:0{i}"),
                "user_input": format!("command {i}"),
                "command": "ls",
                "is_voice": i == 1,
                "result": {"success": true, "output": "", "error": "", "executor": "mini-bash"},
                "ai_interpretation": {"confidence": 0.5},
                "directory": "/home/u"
            })
        })
        .collect();
    let limit = params.limit.unwrap_or(50).min(all.len());
    let slice = all[all.len() - limit..].to_vec();
    Json(json!({"history": slice, "total": all.len()}))
}

async fn feedback() -> Json<Value> {
    Json(json!({
        "feedback": [{
            "timestamp": "2026-10-19T10:00:00",
            "command": "brew list",
            "status": "not_implemented_in_mini_bash",
            "error": "command not found"
        }],
        "total": 1
    }))
}

async fn search(State(state): State<BackendState>, Json(body): Json<Value>) -> Response {
    state.requests.lock().push(body.clone());
    let filename = body["filename"].as_str().unwrap_or_default().to_string();
    if filename.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "No filename provided"})),
        )
            .into_response();
    }
    Json(json!({
        "results": [format!("/home/u/src/{filename}")],
        "count": 1,
        "search_term": filename
    }))
    .into_response()
}
