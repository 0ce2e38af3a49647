//! Remote model catalog
//!
//! Lists the models served by a local OpenAI-compatible server (LM Studio by
//! default) so a chat can be created for one of them. The catalog is
//! read-only: no retries and no caching.

use crate::config::CatalogConfig;
use crate::error::{ChatkeepError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;

/// A model offered by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogModel {
    /// Model identifier, passed to `ChatRepository::create`
    pub id: String,
    /// Display name; the server has none, so this equals `id`
    pub name: String,
}

/// Observable catalog state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogState {
    pub models: Vec<CatalogModel>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Response body of the model listing endpoint
#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<RemoteModel>,
}

/// Only `id` is read; other descriptor fields are ignored
#[derive(Debug, Deserialize)]
struct RemoteModel {
    id: String,
}

/// Client for the model listing endpoint
///
/// # Examples
///
/// ```no_run
/// use chatkeep::catalog::ModelCatalogClient;
/// use chatkeep::config::CatalogConfig;
///
/// # async fn example() -> chatkeep::error::Result<()> {
/// let catalog = ModelCatalogClient::new(CatalogConfig::default())?;
/// catalog.fetch_models().await;
/// for model in catalog.models() {
///     println!("{}", model.id);
/// }
/// # Ok(())
/// # }
/// ```
pub struct ModelCatalogClient {
    client: Client,
    config: CatalogConfig,
    state: watch::Sender<CatalogState>,
}

impl ModelCatalogClient {
    /// Create a catalog client
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: CatalogConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("chatkeep/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ChatkeepError::Catalog(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!("Initialized model catalog: url={}", config.models_url());

        let (state, _) = watch::channel(CatalogState::default());
        Ok(Self {
            client,
            config,
            state,
        })
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.state.subscribe()
    }

    /// Copy of the full current state
    pub fn snapshot(&self) -> CatalogState {
        self.state.borrow().clone()
    }

    /// Models from the last successful fetch
    pub fn models(&self) -> Vec<CatalogModel> {
        self.state.borrow().models.clone()
    }

    /// Returns true while [`fetch_models`](Self::fetch_models) is in flight
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Message of the last failed fetch, if any
    pub fn last_error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    /// Fetch the model list without touching the observable state
    ///
    /// # Errors
    ///
    /// Returns `ChatkeepError::Catalog` on connection failure, a non-2xx
    /// status, or a body that is not `{ "data": [ { "id": ... } ] }`
    pub async fn list_models(&self) -> Result<Vec<CatalogModel>> {
        let url = self.config.models_url();
        tracing::debug!("Fetching models from {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            tracing::warn!("Failed to reach model server: {}", e);
            ChatkeepError::Catalog(format!("Failed to connect to model server: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Model server returned error {}: {}", status, error_text);
            return Err(ChatkeepError::Catalog(format!(
                "Model server returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let body: ModelsResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse model list: {}", e);
            ChatkeepError::Catalog(format!("Failed to parse model list: {}", e))
        })?;

        let models: Vec<CatalogModel> = body
            .data
            .into_iter()
            .map(|m| CatalogModel {
                name: m.id.clone(),
                id: m.id,
            })
            .collect();

        tracing::debug!("Fetched {} models", models.len());
        Ok(models)
    }

    /// Refresh the observable model list
    ///
    /// Clears `error` and raises `loading` for the duration of the call. On
    /// success `models` is replaced wholesale; on failure it is kept and
    /// `error` is set. Failures are never returned.
    pub async fn fetch_models(&self) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
        let _loading = LoadingFlag(&self.state);

        match self.list_models().await {
            Ok(models) => self.state.send_modify(|s| s.models = models),
            Err(e) => {
                tracing::error!("Failed to load models: {}", e);
                let message = format!("Failed to load models: {}", e);
                self.state.send_modify(|s| s.error = Some(message));
            }
        }
    }
}

/// Clears `loading` when dropped
struct LoadingFlag<'a>(&'a watch::Sender<CatalogState>);

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|s| s.loading = false);
    }
}
