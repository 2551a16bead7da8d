use axum::extract::State;
use axum::Json;
use bomsync_core::{HistoryEntry, Snapshot};

use crate::state::AppState;

/// GET /api/state: observable engine snapshot.
pub async fn get_state(State(app): State<AppState>) -> Json<Snapshot> {
    Json(app.engine.snapshot())
}

/// GET /api/log: activity log, oldest first.
pub async fn get_log(State(app): State<AppState>) -> Json<serde_json::Value> {
    let entries = app.engine.snapshot().log;
    Json(serde_json::json!({
        "count": entries.len(),
        "entries": entries,
    }))
}

/// GET /api/history: attempts recorded by this engine instance.
pub async fn get_history(State(app): State<AppState>) -> Json<Vec<HistoryEntry>> {
    Json(app.engine.history())
}
