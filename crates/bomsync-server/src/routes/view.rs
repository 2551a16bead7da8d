use axum::extract::{Path, State};
use axum::Json;
use bomsync_core::RefreshTarget;

use crate::error::AppError;
use crate::state::AppState;

fn target_for(name: &str) -> Option<RefreshTarget> {
    match name {
        "tree" => Some(RefreshTarget::Tree),
        "mirror" => Some(RefreshTarget::MirrorTable),
        "history" => Some(RefreshTarget::History),
        _ => None,
    }
}

/// GET /api/view/{name}: last refreshed display payload.
pub async fn get_view(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let target =
        target_for(&name).ok_or_else(|| AppError::not_found(format!("unknown view '{name}'")))?;
    app.cache
        .get(target)
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("{target} has not been fetched yet")))
}
