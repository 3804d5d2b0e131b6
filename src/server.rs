//! Streamable HTTP listener for the weather service.

use anyhow::Result;
use axum::routing::get;
use axum::Router;
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpService,
};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::auth::{self, RemoteAuthProvider, RESOURCE_METADATA_PATH};
use crate::service::Weather;

pub const MCP_PATH: &str = "/mcp";

/// Builds the HTTP router: the bearer-protected MCP endpoint plus the
/// unauthenticated resource metadata document
pub fn build_router(weather: Weather, provider: Arc<RemoteAuthProvider>) -> Router {
    let service = StreamableHttpService::new(
        move || Ok(weather.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let mcp = Router::new()
        .nest_service(MCP_PATH, service)
        .layer(axum::middleware::from_fn_with_state(
            provider.clone(),
            auth::require_bearer,
        ));

    let metadata = Router::new()
        .route(RESOURCE_METADATA_PATH, get(auth::resource_metadata))
        .route(
            &format!("{}{}", RESOURCE_METADATA_PATH, MCP_PATH),
            get(auth::resource_metadata),
        )
        .with_state(provider);

    mcp.merge(metadata)
}

/// Serves on loopback until Ctrl-C
pub async fn serve(weather: Weather, provider: Arc<RemoteAuthProvider>, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let router = build_router(weather, provider);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("MCP endpoint: http://{}{}", addr, MCP_PATH);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Received shutdown signal");
        })
        .await?;

    Ok(())
}
