use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::api::client::ApiClient;
use crate::core::config::Config;
use crate::stores::file_store::FileStore;
use crate::stores::key_value::{KeyValueStore, MemoryStore};
use crate::stores::session_store::SessionStore;

/// Construct the session store and the pipeline once at application start.
/// The returned client shares its session store through `ApiClient::session`.
pub fn build_client(config: &Config) -> Result<ApiClient> {
    let storage: Arc<dyn KeyValueStore> = match &config.storage.path {
        Some(path) => Arc::new(
            FileStore::open(path)
                .context(format!("Failed to open session storage: {}", path.display()))?,
        ),
        None => Arc::new(MemoryStore::new()),
    };

    let session = Arc::new(SessionStore::new(storage, config.api.login_route.clone()));
    let client = ApiClient::new(&config.api, session).context("Failed to create API client")?;

    info!(
        base_url = %config.api.base_url,
        storage = ?config.storage.path,
        timeout_ms = ?config.api.timeout_ms,
        authenticated = client.session().is_authenticated(),
        "API client ready"
    );

    Ok(client)
}
