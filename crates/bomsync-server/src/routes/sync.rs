use axum::extract::State;
use axum::Json;
use bomsync_core::{SyncResult, SyncTriggerSource};

use crate::error::AppError;
use crate::state::AppState;

/// POST /api/sync: manual trigger. Waits for the attempt to finish.
///
/// 409 when another sync is running, 502 when the sync API fails.
pub async fn post_sync(State(app): State<AppState>) -> Result<Json<SyncResult>, AppError> {
    let result = app.engine.trigger(SyncTriggerSource::Manual).await?;
    Ok(Json(result))
}
