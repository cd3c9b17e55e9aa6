//! Shared application state

use crate::{WebConfig, WebResult};
use std::sync::Arc;
use tracing::info;
use usta_applications::UstaApplication;

#[derive(Clone)]
pub struct AppState {
    pub config: WebConfig,
    /// Marketplace services
    pub application: Arc<UstaApplication>,
}

impl AppState {
    /// Build the application described by the configuration
    pub async fn new(config: WebConfig) -> WebResult<Self> {
        let usta_config = config.usta_config()?;
        info!(database = %usta_config.database.url, "Opening marketplace store");

        let application = UstaApplication::new(usta_config).await?;
        Ok(Self::with_application(config, Arc::new(application)))
    }

    /// Wrap an already built application
    pub fn with_application(config: WebConfig, application: Arc<UstaApplication>) -> Self {
        Self {
            config,
            application,
        }
    }

    /// Drop expired sessions, pending registrations and codes
    pub async fn cleanup_expired(&self) {
        match self
            .application
            .purge_expired_sessions(chrono::Utc::now())
            .await
        {
            Ok(0) => {}
            Ok(removed) => info!(removed, "Purged expired sessions"),
            Err(e) => e.log(),
        }
    }
}
