use std::process::ExitCode;

use livepoll::{
    config::Config,
    http::{self, state::AppState},
    password::PasswordHasher,
    store,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = livepoll::init(&config.logging) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Server error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> livepoll::Result<()> {
    let store = store::open_store(&config.store).await?;
    let hasher = PasswordHasher::from_config(&config.security)?;

    let app = http::create_app(AppState::new(store, hasher));
    let listener = TcpListener::bind(config.server.socket_addr()).await?;

    http::run_server(app, listener).await
}
