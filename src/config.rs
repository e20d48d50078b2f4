//! Configuration management for the poll service
//!
//! Loads settings from environment variables (and a `.env` file if present)
//! with validation.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// PostgreSQL connection string. The in-memory store is used when unset.
    pub database_url: Option<String>,

    /// Maximum pooled database connections
    pub max_connections: u32,
}

/// Password hashing configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Server-side pepper mixed into every password hash (base64, minimum 32 bytes)
    #[serde(skip_serializing)]
    pub password_pepper: String,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("password_pepper", &"<redacted>")
            .finish()
    }
}

impl SecurityConfig {
    /// Load security configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let password_pepper = std::env::var("LIVEPOLL_PASSWORD_PEPPER").map_err(|_| {
            Error::internal("LIVEPOLL_PASSWORD_PEPPER environment variable required")
        })?;

        Self::validate_pepper(&password_pepper, "LIVEPOLL_PASSWORD_PEPPER")?;

        Ok(Self { password_pepper })
    }

    /// Create configuration for testing
    pub fn for_testing() -> Self {
        use base64::Engine;
        let password_pepper =
            base64::engine::general_purpose::STANDARD.encode(rand::random::<[u8; 32]>());

        Self { password_pepper }
    }

    /// Validate a base64-encoded pepper
    fn validate_pepper(pepper: &str, name: &str) -> Result<()> {
        use base64::Engine;
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(pepper)
            .map_err(|_| Error::internal(format!("{name} must be valid base64")))?;

        if decoded.len() < 32 {
            return Err(Error::internal(format!(
                "{name} must be at least 32 bytes when decoded"
            )));
        }

        Ok(())
    }

    /// Get the pepper as bytes
    pub fn pepper_bytes(&self) -> Result<Vec<u8>> {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(&self.password_pepper)
            .map_err(|_| Error::internal("Invalid password pepper"))
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    /// Load configuration from environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let host = std::env::var("LIVEPOLL_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string())
            .parse()
            .map_err(|_| Error::internal("Invalid LIVEPOLL_HOST"))?;

        let port = std::env::var("LIVEPOLL_PORT")
            .or_else(|_| std::env::var("PORT"))
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| Error::internal("Invalid LIVEPOLL_PORT"))?;

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .map_err(|_| Error::internal("Invalid DATABASE_MAX_CONNECTIONS"))?;

        let security = SecurityConfig::from_env()?;

        let logging = LoggingConfig {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string()),
        };

        Ok(Self {
            server: ServerConfig { host, port },
            store: StoreConfig {
                database_url,
                max_connections,
            },
            security,
            logging,
        })
    }

    /// Create configuration for testing
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig {
                host: IpAddr::from([127, 0, 0, 1]),
                port: 0,
            },
            store: StoreConfig {
                database_url: None,
                max_connections: 1,
            },
            security: SecurityConfig::for_testing(),
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
