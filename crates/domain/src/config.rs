//! Connection configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PORT, SYSTEM_DATABASE};

/// Configuration for a server connection.
///
/// All fields are fixed at construction; a connection never mutates its
/// configuration afterwards, which is what makes it safe to share across
/// execution contexts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Transfer scheme, `http` or `https`.
    pub scheme: String,
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Target database name.
    pub database: String,
    /// Basic-auth username.
    pub username: String,
    /// Basic-auth password.
    pub password: String,
    /// Per-request timeout enforced by the HTTP layer.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,
    /// Total attempts (initial try + retries) the HTTP layer may make.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Base delay of the HTTP layer's exponential backoff.
    #[serde(default = "default_base_backoff")]
    pub base_backoff: Duration,
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_attempts() -> usize {
    3
}

fn default_base_backoff() -> Duration {
    Duration::from_millis(200)
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            database: SYSTEM_DATABASE.to_string(),
            username: "root".to_string(),
            password: String::new(),
            timeout: default_timeout(),
            max_attempts: default_max_attempts(),
            base_backoff: default_base_backoff(),
        }
    }
}

impl ConnectionConfig {
    /// The URL prefix every endpoint path is appended to.
    pub fn url_prefix(&self) -> String {
        format!(
            "{}://{}:{}/_db/{}",
            self.scheme,
            self.host.trim_end_matches('/'),
            self.port,
            self.database
        )
    }

    /// The same configuration pointed at a different database.
    pub fn with_database(&self, database: impl Into<String>) -> Self {
        Self { database: database.into(), ..self.clone() }
    }
}
