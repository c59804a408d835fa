//! Configuration loading with layered overrides.
//!
//! Config is loaded in order (each layer overrides the previous):
//! 1. Default values
//! 2. Config file (TOML)
//! 3. Environment variables
//! 4. CLI arguments
//!
//! JWT secret is never read from config files for security - it must come from
//! environment variable or CLI argument.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub database: Database,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub rate_limit: RateLimit,
}

/// Shared, immutable configuration handed to request handlers.
pub type SharedConfig = Arc<Config>;

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "foreman.db".to_string()
}

/// Authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auth {
    /// JWT secret for token signing/verification.
    /// Must be provided via environment variable or CLI - never from config file.
    #[serde(default)]
    pub jwt_secret: String,

    /// Token expiry in days.
    #[serde(default = "default_token_expiry_days")]
    pub token_expiry_days: u32,
}

impl Default for Auth {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_expiry_days: default_token_expiry_days(),
        }
    }
}

fn default_token_expiry_days() -> u32 {
    30
}

/// Login rate-limiting settings, applied per client IP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimit {
    #[serde(default = "default_login_attempts")]
    pub login_attempts: u32,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            login_attempts: default_login_attempts(),
            window_secs: default_window_secs(),
        }
    }
}

fn default_login_attempts() -> u32 {
    10
}

fn default_window_secs() -> u64 {
    60
}

/// Builder for loading configuration with customizable options.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Environment variable prefix (e.g., "FOREMAN" -> FOREMAN_HOST, FOREMAN_PORT)
    pub env_prefix: String,
    /// Name of the JWT secret environment variable (without prefix)
    pub jwt_secret_env: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            env_prefix: "FOREMAN".to_string(),
            jwt_secret_env: "JWT_SECRET".to_string(),
        }
    }
}

impl ConfigLoader {
    /// Create a new config loader with the given environment prefix.
    pub fn new(env_prefix: impl Into<String>) -> Self {
        Self {
            env_prefix: env_prefix.into(),
            ..Default::default()
        }
    }

    /// Load configuration from file, environment, and CLI arguments.
    ///
    /// # Arguments
    /// * `config_path` - Optional path to TOML config file
    /// * `cli_host` - CLI override for host
    /// * `cli_port` - CLI override for port
    /// * `cli_database_url` - CLI override for database URL
    /// * `cli_jwt_secret` - CLI override for JWT secret
    pub fn load(
        &self,
        config_path: Option<&Path>,
        cli_host: Option<&str>,
        cli_port: Option<u16>,
        cli_database_url: Option<&str>,
        cli_jwt_secret: Option<&str>,
    ) -> crate::Result<Config> {
        // Start with file config or defaults
        let mut config: Config = if let Some(path) = config_path {
            let content = std::fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;
            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?
        } else {
            Config {
                server: Server::default(),
                database: Database::default(),
                auth: Auth::default(),
                rate_limit: RateLimit::default(),
            }
        };

        // Clear any jwt_secret from config file - security requirement
        config.auth.jwt_secret = String::new();

        // Override with environment variables
        let prefix = &self.env_prefix;

        if let Ok(host) = std::env::var(format!("{prefix}_HOST")) {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var(format!("{prefix}_PORT"))
            && let Ok(p) = port.parse()
        {
            config.server.port = p;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = url;
        }
        if let Ok(secret) = std::env::var(format!("{}_{}", prefix, self.jwt_secret_env)) {
            config.auth.jwt_secret = secret;
        }

        // Override with CLI arguments
        if let Some(host) = cli_host {
            config.server.host = host.to_string();
        }
        if let Some(port) = cli_port {
            config.server.port = port;
        }
        if let Some(url) = cli_database_url {
            config.database.url = url.to_string();
        }
        if let Some(secret) = cli_jwt_secret {
            config.auth.jwt_secret = secret.to_string();
        }

        // Validate required fields
        if config.auth.jwt_secret.is_empty() {
            return Err(Error::Config(format!(
                "{}_{} must be set via environment variable or --jwt-secret flag",
                prefix, self.jwt_secret_env
            )));
        }

        Ok(config)
    }
}
