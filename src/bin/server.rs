use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;

use rusty_rooms::config::ServerConfig;
use rusty_rooms::core::message_handler::MessageHandler;
use rusty_rooms::core::server::ChatServer;
use rusty_rooms::handlers::routes;
use rusty_rooms::storage::open_store;

#[tokio::main]
async fn main() {
    let dotenv = dotenvy::dotenv();

    // Initialize logging
    env_logger::init();

    match dotenv {
        Ok(path) => info!("Environment variables loaded from {}", path.display()),
        Err(e) => warn!("Failed to load .env file: {}", e),
    };

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    // The server must not accept connections without a working store
    let store = match open_store(&config).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open message store: {}", e);
            std::process::exit(1);
        }
    };

    let server = Arc::new(ChatServer::new(store, &config));
    let routes = routes(MessageHandler::new(server), config.client_origin.clone());

    // Build the server address
    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to parse server address: {}", e);
            std::process::exit(1);
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutting down");
    };

    match warp::serve(routes).try_bind_with_graceful_shutdown(addr, shutdown) {
        Ok((bound, serving)) => {
            info!("Server running on http://{}", bound);
            info!("Allowed origin: {}", config.client_origin);
            serving.await;
        }
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    }
}
