//! # Atlas Relay
//!
//! OpenAI-compatible relay in front of a single upstream AI gateway, rotating
//! through a pool of account credentials when a call fails.
//!
//! ## Usage
//!
//! ```bash
//! # Start with defaults (port 8000, credentials from the config file)
//! atlas-relay
//!
//! # Start with a config file
//! RELAY_CONFIG=/etc/atlas-relay/config.yaml atlas-relay
//!
//! # Environment overrides
//! RELAY_PORT=9000 RELAY_CREDENTIALS_FILE=./credentials.json atlas-relay
//! ```

use anyhow::Context;
use relay_config::{load_config, RelayConfig};
use relay_server::{AppState, Dispatcher, Server, ServerConfig};
use relay_telemetry::{init_logging, LoggingConfig};
use relay_upstream::{CredentialPool, FileCredentials, StaticCredentials, StreamDecoder, UpstreamClient};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().await.context("Failed to load configuration")?;

    init_logging(
        &LoggingConfig::new()
            .with_level(config.logging.level.clone())
            .with_json(config.logging.json),
    )
    .context("Failed to initialize logging")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        upstream = %config.upstream.endpoint,
        "Starting Atlas relay"
    );

    run(config).await
}

async fn run(config: RelayConfig) -> anyhow::Result<()> {
    let pool = Arc::new(credential_pool(&config).await);
    if pool.is_empty() {
        warn!("No upstream credentials loaded; chat requests will fail until a reload succeeds");
    }

    let client = UpstreamClient::http(
        config.upstream.endpoint_url()?,
        config.upstream.max_redirects,
        config.upstream.backoff,
    )
    .context("Failed to build upstream client")?;

    let dispatcher = Dispatcher::new(
        client,
        pool,
        StreamDecoder::new(config.upstream.stream_buffer),
    );

    if config.auth.is_enabled() {
        info!(keys = config.auth.api_keys.len(), "Inbound API key check enabled");
    }

    let state = AppState::builder()
        .dispatcher(Arc::new(dispatcher))
        .models(config.models)
        .auth(config.auth)
        .build()?;

    let server_config = ServerConfig::new()
        .with_host(config.server.host)
        .with_port(config.server.port);

    Server::new(server_config, state).run().await?;

    Ok(())
}

/// The file source wins when configured; inline entries otherwise.
async fn credential_pool(config: &RelayConfig) -> CredentialPool {
    match &config.credentials.file {
        Some(path) => CredentialPool::load(Arc::new(FileCredentials::new(path))).await,
        None => {
            CredentialPool::load(Arc::new(StaticCredentials::new(
                config.credentials.entries.clone(),
            )))
            .await
        }
    }
}
