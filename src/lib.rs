//! Poll voting service with live vote-count broadcasts
//!
//! Votes arrive over HTTP, are checked against the one-vote-per-user-per-poll
//! rule, persisted, and the poll's recomputed counts are pushed to every
//! WebSocket connection in that poll's room.

pub mod broadcast;
pub mod config;
pub mod directory;
pub mod errors;
pub mod http;
pub mod password;
pub mod store;
pub mod types;
pub mod voting;

// Re-export commonly used types
pub use errors::{Error, Result};

use config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging. `RUST_LOG` wins over the configured level.
pub fn init(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("livepoll={},tower_http=info", logging.level).into());

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match logging.format.as_str() {
        "json" => builder.json().try_init(),
        _ => builder.pretty().try_init(),
    };
    installed.map_err(|e| Error::internal(format!("Failed to initialize logging: {e}")))?;

    tracing::info!("🗳️  livepoll v{} initialized", VERSION);
    Ok(())
}
