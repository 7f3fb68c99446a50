use log::{error, info, warn};
use std::net::SocketAddr;

use nihongo_api::config::ServerConfig;
use nihongo_api::core::AppState;
use nihongo_api::routes;

#[tokio::main]
async fn main() {
    // Initialize env
    let dotenv_result = dotenvy::dotenv();

    // Initialize logging
    env_logger::init();

    match dotenv_result {
        Ok(path) => info!("Environment variables loaded from {}", path.display()),
        Err(e) => warn!("No .env file loaded: {}", e),
    };

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Configuration: host={}, port={}, environment={}, tls={}",
        config.host, config.port, config.environment, config.enable_tls
    );

    // Build the server address
    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to parse server address: {}", e);
            std::process::exit(1);
        }
    };

    let tls_paths = match (&config.tls_cert_path, &config.tls_key_path) {
        (Some(cert), Some(key)) if config.enable_tls => Some((cert.clone(), key.clone())),
        _ => None,
    };

    let state = AppState::in_memory(config);
    state.rate_limiter.clone().start_cleanup_task();
    let routes = routes(state);

    match tls_paths {
        Some((cert, key)) => {
            info!("Starting Nihongo API on https://{}", addr);
            warp::serve(routes)
                .tls()
                .cert_path(cert)
                .key_path(key)
                .run(addr)
                .await;
        }
        None => {
            info!("Starting Nihongo API on http://{}", addr);
            warp::serve(routes).run(addr).await;
        }
    }
}
