use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ModeBody {
    pub mode: String,
}

#[derive(Deserialize)]
pub struct IntervalBody {
    pub seconds: i64,
}

/// PUT /api/mode: switch between live, scheduled and manual.
pub async fn put_mode(
    State(app): State<AppState>,
    Json(body): Json<ModeBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mode = app.engine.set_mode_str(&body.mode)?;
    Ok(Json(serde_json::json!({ "mode": mode })))
}

/// PUT /api/interval: set the scheduled-sync interval (10-300s, rounded
/// to the nearest 10).
pub async fn put_interval(
    State(app): State<AppState>,
    Json(body): Json<IntervalBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let interval = app.engine.set_interval(body.seconds)?;
    Ok(Json(serde_json::json!({ "interval_seconds": interval })))
}
