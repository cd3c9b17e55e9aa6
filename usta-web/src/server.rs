//! Usta Web Server
//!
//! Binds the listener, serves the router and runs the periodic purge.

use crate::{create_app, AppState, WebConfig, WebError, WebResult};
use axum::serve;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

pub struct UstaServer {
    config: WebConfig,
    state: AppState,
}

impl UstaServer {
    /// Create a server, opening the configured store
    pub async fn new(config: WebConfig) -> WebResult<Self> {
        let state = AppState::new(config.clone()).await?;
        Ok(Self { config, state })
    }

    /// Start the web server
    pub async fn start(self) -> WebResult<()> {
        let address = self.config.address();

        info!(address = %address, dev_mode = self.config.dev_mode, "Starting Usta web server");
        if self.config.dev_mode {
            warn!("Development mode: every phone accepts the fixed one-time code");
        }

        let app = create_app(self.state.clone());
        let listener = TcpListener::bind(&address)
            .await
            .map_err(WebError::Server)?;

        info!("Server listening on http://{}", address);

        let cleanup_state = self.state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(PURGE_INTERVAL);
            loop {
                interval.tick().await;
                cleanup_state.cleanup_expired().await;
            }
        });

        if let Err(e) = serve(listener, app).await {
            error!("Server error: {}", e);
            return Err(WebError::Server(e));
        }

        Ok(())
    }
}

/// Builder for UstaServer
pub struct UstaServerBuilder {
    config: WebConfig,
}

impl UstaServerBuilder {
    /// Start from a loaded configuration
    pub fn from_config(config: WebConfig) -> Self {
        Self { config }
    }

    /// Build the server
    pub async fn build(self) -> WebResult<UstaServer> {
        UstaServer::new(self.config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_creation() {
        let config = WebConfig {
            dev_mode: true,
            port: 3000,
            ..Default::default()
        };
        let server = UstaServerBuilder::from_config(config).build().await.unwrap();
        assert_eq!(server.config.address(), "127.0.0.1:3000");
        assert!(server.config.dev_mode);
    }

    #[tokio::test]
    async fn test_invalid_config_fails_to_build() {
        let config = WebConfig {
            database_url: Some(String::new()),
            ..Default::default()
        };
        assert!(UstaServerBuilder::from_config(config).build().await.is_err());
    }
}
