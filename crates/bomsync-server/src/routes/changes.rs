//! Webhook side of the change-notification transport. The database (or a
//! relay in front of it) posts row changes and channel status here; both
//! are forwarded to the change router through the in-process feed.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use bomsync_core::{ChangeEvent, TransportStatus};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

/// POST /api/changes: `{"entity": "assembly", "event_type": "update"}`.
pub async fn post_change(
    State(app): State<AppState>,
    Json(event): Json<ChangeEvent>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    app.feed.publish(event)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "accepted": true })),
    ))
}

#[derive(Deserialize)]
pub struct StatusBody {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

fn parse_status(body: StatusBody) -> Result<TransportStatus, AppError> {
    match body.status.as_str() {
        "connecting" => Ok(TransportStatus::Connecting),
        "connected" => Ok(TransportStatus::Connected),
        "channel_error" => Ok(TransportStatus::ChannelError(
            body.message.unwrap_or_else(|| "channel error".to_string()),
        )),
        "timed_out" => Ok(TransportStatus::TimedOut),
        other => Err(AppError::bad_request(format!(
            "unknown transport status '{other}'"
        ))),
    }
}

/// POST /api/changes/status: connection status of the upstream channel.
pub async fn post_status(
    State(app): State<AppState>,
    Json(body): Json<StatusBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let status = parse_status(body)?;
    app.feed.status(status)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "accepted": true })),
    ))
}
