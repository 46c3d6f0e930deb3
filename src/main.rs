mod config;
mod game;
mod registry;
mod routes;
mod state;
mod ws;

use std::time::Duration;

use tokio::net::TcpListener;

use config::{generate_config_template, Config};
use registry::SessionRegistry;
use state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Initialize tracing/logging
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "wordfriends_server=info".parse().unwrap()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "wordfriends_server=info".parse().unwrap()),
            )
            .init();
    }

    tracing::info!(
        "wordfriends server v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let registry = SessionRegistry::new(Duration::from_secs(config.empty_session_timeout_secs));
    let state = AppState {
        registry,
        game_params: config.game.unwrap_or_default(),
    };

    let app = routes::build_router(state);

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(
        address = %addr,
        empty_session_timeout_secs = config.empty_session_timeout_secs,
        "listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
