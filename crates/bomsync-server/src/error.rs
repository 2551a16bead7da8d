use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bomsync_core::SyncError;

/// Sentinel carrying an explicit 404 through the `anyhow::Error` chain.
#[derive(Debug)]
struct NotFoundError(String);

impl std::fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for NotFoundError {}

// ---------------------------------------------------------------------------
// AppError
// ---------------------------------------------------------------------------

/// Error type for HTTP responses. Maps [`SyncError`] variants to status
/// codes: 400 for bad configuration, 409 while a sync runs, 502 when the
/// sync API fails.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(SyncError::ConfigInvalid(msg.into()).into())
    }

    /// Construct a 404 Not Found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self(NotFoundError(msg.into()).into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(n) = self.0.downcast_ref::<NotFoundError>() {
            let body = serde_json::json!({ "error": n.0.clone() });
            return (StatusCode::NOT_FOUND, axum::Json(body)).into_response();
        }

        let status = match self.0.downcast_ref::<SyncError>() {
            Some(SyncError::ConfigInvalid(_)) => StatusCode::BAD_REQUEST,
            Some(SyncError::Busy) => StatusCode::CONFLICT,
            Some(SyncError::TransportUnreachable(_) | SyncError::RemoteFailed(_)) => {
                StatusCode::BAD_GATEWAY
            }
            Some(SyncError::ConnectionFailure(_))
            | Some(SyncError::Io(_))
            | Some(SyncError::Yaml(_))
            | None => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
