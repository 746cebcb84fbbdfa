//! Local JSON HTTP API for the marketplace UI.
//!
//! Everything lives under `/api`:
//! - `GET /api/status`, `GET /api/health`
//! - `GET|POST /api/agents`, `GET|PUT|DELETE /api/agents/:id`
//! - `GET /api/agents/by-name/:name`, `GET /api/agents/:id/clone`
//! - `POST /api/agents/:id/chat`, `POST /api/chats`, `POST /api/chats/export`
//! - `GET /api/authors`, `GET /api/stats`, `GET /api/models`, `GET /api/tools`
//! - `POST /api/calc`
//!
//! When `gateway.static_dir` is set, other paths are served from it.

mod handlers;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::chat::ChatLogWriter;
use crate::config::{Config, ProviderConfig};
use crate::registry::AgentRegistry;
use crate::store::AgentStore;

/// Handle returned by [`start_gateway_with_config`].
pub struct Gateway {
    /// Server task handle.
    pub handle: JoinHandle<()>,
    /// The address the server is actually listening on.
    pub addr: SocketAddr,
}

/// Shared state injected into axum handlers.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) registry: AgentRegistry,
    pub(crate) chats: ChatLogWriter,
    pub(crate) provider: Arc<ProviderConfig>,
    pub(crate) workspace: PathBuf,
}

impl AppState {
    pub(crate) fn from_config(config: &Config) -> Self {
        Self {
            registry: AgentRegistry::new(AgentStore::from_config(&config.storage)),
            chats: ChatLogWriter::from_config(&config.storage),
            provider: Arc::new(config.provider.clone()),
            workspace: config.storage.workspace_path(),
        }
    }
}

fn api_router() -> Router<AppState> {
    use handlers::{agents, catalog, chat, health};

    Router::new()
        .route("/status", get(health::status_handler))
        .route("/health", get(health::api_health))
        // Agents
        .route("/agents", get(agents::api_agents_list).post(agents::api_agent_create))
        .route(
            "/agents/:agent_id",
            get(agents::api_agent_get)
                .put(agents::api_agent_update)
                .delete(agents::api_agent_delete),
        )
        .route("/agents/by-name/:name", get(agents::api_agent_by_name))
        .route("/agents/:agent_id/clone", get(agents::api_agent_clone))
        .route("/authors", get(agents::api_authors))
        .route("/stats", get(agents::api_stats))
        // Chat
        .route("/agents/:agent_id/chat", post(chat::api_agent_chat))
        .route("/chats", post(chat::api_chat_save))
        .route("/chats/export", post(chat::api_chat_export))
        // Catalogues and tools
        .route("/models", get(catalog::api_models))
        .route("/tools", get(catalog::api_tools))
        .route("/calc", post(catalog::api_calc))
}

/// Start the HTTP server on `addr` using the storage and provider
/// settings from `config`.
pub async fn start_gateway_with_config(
    addr: SocketAddr,
    config: &Config,
) -> std::io::Result<Gateway> {
    let state = AppState::from_config(config);
    let _ = handlers::health::STARTUP_TIME.set(std::time::Instant::now());

    let mut app = Router::new()
        .nest("/api", api_router())
        .with_state(state)
        .layer(CorsLayer::permissive());
    if let Some(ref dir) = config.gateway.static_dir {
        info!(dir = %dir, "serving static files");
        app = app.fallback_service(ServeDir::new(dir));
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("gateway server error: {e}");
        }
    });

    info!(%bound_addr, "gateway started");

    Ok(Gateway {
        handle,
        addr: bound_addr,
    })
}
