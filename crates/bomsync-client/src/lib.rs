pub mod api;
pub mod error;
pub mod refresh;

pub use api::{ApiClient, RunStatus, SyncResponse};
pub use error::ClientError;
pub use refresh::{DisplayCache, HttpRefresher};
