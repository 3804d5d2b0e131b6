use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod config;
mod constants;
mod formatters;
mod models;
mod nws;
mod server;
mod service;

use auth::RemoteAuthProvider;
use config::Config;
use service::Weather;

/// Run MCP Streamable HTTP based weather server
#[derive(Parser, Debug)]
#[command(name = "mcp-weather-auth-server", version, about)]
struct Args {
    /// Localhost port to listen on
    #[arg(long, default_value_t = constants::DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mcp_weather_auth_server=info,rmcp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .init();

    let config = Config::from_env();
    config.log_summary();

    let provider = RemoteAuthProvider::from_config(&config)?;
    tracing::info!(
        jwks_uri = %provider.verifier().settings().jwks_uri,
        issuer = %provider.verifier().settings().issuer,
        "Bearer token verification enabled"
    );

    tracing::info!("Starting MCP weather server");

    let weather = Weather::new(&config)?;
    server::serve(weather, Arc::new(provider), args.port).await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}
