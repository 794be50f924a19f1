use std::sync::Arc;

use axum::extract::FromRef;
use cookbook_core::{HostAllowlist, HttpClient, LlmProvider};

use crate::config::Config;
use crate::db::DbPool;
use crate::storage::{BlobStore, UrlSigner};

/// Application state shared across all handlers and import tasks.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<DbPool>,
    pub config: Arc<Config>,
    pub http: Arc<dyn HttpClient>,
    pub llm: Arc<dyn LlmProvider>,
    pub storage: Arc<dyn BlobStore>,
    pub signer: Arc<UrlSigner>,
}

impl AppState {
    pub fn allowed_hosts(&self) -> &HostAllowlist {
        &self.config.allowed_hosts
    }
}

impl FromRef<AppState> for Arc<DbPool> {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}
