pub mod auth;
pub mod config;
pub mod error;
pub mod report;
pub mod rest;
pub mod storage;

use std::sync::Arc;

use config::ServerConfig;
use storage::Storage;

/// Shared application state passed to every request handler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub storage: Arc<Storage>,
    pub started_at: std::time::Instant,
}
