//! Usta Web Server
//!
//! HTTP surface of the services marketplace, built on axum.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use server::{UstaServer, UstaServerBuilder};
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    Router,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use usta_core::{LogFormat, OtpMode, UstaConfig, UstaError};

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ]))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_credentials(true)
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    Router::new()
        .nest("/api", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .with_state(state)
}

/// Configuration for the web server
///
/// Layered lowest to highest: built-in defaults, the optional TOML file,
/// `USTA_*` environment variables (`.env` included), then CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
    /// Fixed one-time code and human-readable logs
    pub dev_mode: bool,
    /// Overrides `database.url`
    pub database_url: Option<String>,
    /// Overrides `logging.level`
    pub log_level: Option<String>,
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
    /// Service settings read from the same sources
    #[serde(skip)]
    pub core: UstaConfig,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            dev_mode: false,
            database_url: None,
            log_level: None,
            config_path: None,
            core: UstaConfig::default(),
        }
    }
}

impl WebConfig {
    /// Read the `[server]` table and the service sections from file and environment
    ///
    /// Environment keys use `__` between levels: `USTA_SERVER__PORT=9000`,
    /// `USTA_OTP__MODE=fixed`.
    pub fn load(config_path: Option<&Path>) -> WebResult<Self> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix("USTA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut web = match settings.get::<WebConfig>("server") {
            Ok(web) => web,
            Err(config::ConfigError::NotFound(_)) => WebConfig::default(),
            Err(e) => return Err(e.into()),
        };
        web.core = settings.try_deserialize()?;
        web.config_path = config_path.map(Path::to_path_buf);
        Ok(web)
    }

    /// Service configuration with the server-level overrides applied
    pub fn usta_config(&self) -> WebResult<UstaConfig> {
        let mut config = self.core.clone();

        if let Some(url) = &self.database_url {
            config.database.url = url.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.dev_mode {
            config.otp.mode = OtpMode::Fixed;
            config.logging.format = LogFormat::Pretty;
        }

        config.validate()?;
        Ok(config)
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Error types for the web server
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Application(#[from] UstaError),
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;
