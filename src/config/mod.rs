/// Configuration management for the roomflow engine
///
/// Handles server binding, storage location, Matrix defaults and the limits
/// applied to outbound calls made by step runners.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Matrix homeserver defaults for bots without their own homeserver
    pub matrix: MatrixConfig,
    /// Outbound HTTP behaviour shared by sessions and step runners
    pub http: HttpConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL (default: "sqlite://data/roomflow.db")
    pub url: String,
}

/// Matrix client defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixConfig {
    /// Homeserver base URL used when a bot record carries none
    pub default_homeserver: String,
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Upper bound for every outbound request, in seconds
    pub timeout_secs: u64,
    /// Header name sent with every fetchDataExternal call
    pub external_auth_header: String,
    /// Header value sent with every fetchDataExternal call
    pub external_auth_value: String,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build the reqwest client shared by every session and runner
    pub fn build_client(&self) -> anyhow::Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout())
            .build()?;
        Ok(client)
    }
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for k8s/container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("ROOMFLOW_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("ROOMFLOW_PORT")
                    .unwrap_or_else(|_| "3004".to_string())
                    .parse()
                    .unwrap_or(3004),
            },
            database: DatabaseConfig {
                url: std::env::var("ROOMFLOW_DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/roomflow.db".to_string()),
            },
            matrix: MatrixConfig {
                default_homeserver: std::env::var("ROOMFLOW_HOMESERVER")
                    .unwrap_or_else(|_| "https://matrix.org".to_string()),
            },
            http: HttpConfig {
                timeout_secs: std::env::var("ROOMFLOW_HTTP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
                external_auth_header: std::env::var("ROOMFLOW_EXTERNAL_AUTH_HEADER")
                    .unwrap_or_else(|_| "Authorization".to_string()),
                external_auth_value: std::env::var("ROOMFLOW_EXTERNAL_AUTH_VALUE")
                    .unwrap_or_default(),
            },
        }
    }
}
