//! HTTP server lifecycle.

use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;

use crate::{routes::create_router, shutdown::shutdown_signal, state::AppState};

/// Listener configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    /// Default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind address
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the bind port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Server error
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Requested address
        addr: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// Serving failed
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// The relay HTTP server
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    /// Create a server
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Bind and serve until Ctrl+C or SIGTERM, then drain gracefully.
    ///
    /// # Errors
    /// Returns error if the listener cannot be bound or serving fails
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;

        let local = listener
            .local_addr()
            .map_or(addr, |a: SocketAddr| a.to_string());
        info!(addr = %local, "Relay listening");

        let app = create_router(self.state);
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_signal().await;
            })
            .await
            .map_err(ServerError::Serve)?;

        info!("Server stopped");
        Ok(())
    }
}
