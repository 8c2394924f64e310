use std::collections::HashMap;
use std::sync::Arc;

use dreamcut_core::types::EntityId;
use dreamcut_events::ProgressStore;
use dreamcut_pipeline::Orchestrator;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Progress store: row mutations coupled to event publishes.
    pub store: ProgressStore,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (browser clients).
    pub ws_manager: Arc<WsManager>,
    /// Pipeline orchestrator shared by all runs.
    pub orchestrator: Arc<Orchestrator>,
    /// Cancellation tokens for in-flight pipeline runs.
    pub cancellations: Arc<CancellationRegistry>,
}

/// Tracks one [`CancellationToken`] per in-flight query.
///
/// Tokens are registered when the pipeline is spawned and dropped when
/// the run reaches a terminal state, so a hit here means the query is
/// still cancellable.
#[derive(Default)]
pub struct CancellationRegistry {
    tokens: RwLock<HashMap<EntityId, CancellationToken>>,
}

impl CancellationRegistry {
    /// Mint and register a token for a new run.
    pub async fn register(&self, query_id: EntityId) -> CancellationToken {
        let token = CancellationToken::new();
        self.tokens.write().await.insert(query_id, token.clone());
        token
    }

    /// Drop the token once the run is terminal.
    pub async fn remove(&self, query_id: EntityId) {
        self.tokens.write().await.remove(&query_id);
    }

    /// Trigger cancellation for an in-flight query.
    ///
    /// Returns `false` when the query is unknown or already terminal.
    pub async fn cancel(&self, query_id: EntityId) -> bool {
        match self.tokens.read().await.get(&query_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of in-flight runs.
    pub async fn active_count(&self) -> usize {
        self.tokens.read().await.len()
    }
}
