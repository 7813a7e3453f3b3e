pub mod api;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::collectors::runner::JobRunner;

#[derive(Clone)]
pub struct AppState {
    pub runner: JobRunner,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(state.clone())
        .merge(api::router(state))
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Job board extraction API is running" }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let status = if state.runner.persists_records() {
        "healthy"
    } else {
        "degraded (no db)"
    };
    Json(json!({ "status": status }))
}
