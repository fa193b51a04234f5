//! Web server using Axum.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};

use super::router::create_app_router;
use crate::service::MemoryService;

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MemoryService>,
    /// Root of the local blob directory when the filesystem backend is in
    /// use; `None` turns the /media route into a 404.
    pub blob_root: Option<PathBuf>,
}

/// Web server configuration.
pub struct WebServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7151,
        }
    }
}

/// Run the web server.
pub async fn run_server(
    config: WebServerConfig,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = create_app_router(state).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    tracing::info!("Starting web server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
