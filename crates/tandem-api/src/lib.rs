pub mod auth;
pub mod error;
pub mod middleware;
pub mod pairing;
pub mod partner;
pub mod tasks;
pub mod timer;

use std::sync::Arc;

use tandem_db::Database;
use tandem_gateway::dispatcher::Dispatcher;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub dispatcher: Dispatcher,
}

/// Run a store closure off the async runtime. Store failures come back as
/// opaque internal errors.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| anyhow::anyhow!("blocking task died: {}", e))?
        .map_err(ApiError::from)
}
