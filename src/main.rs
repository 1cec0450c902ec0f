// src/main.rs
use anyhow::Result;
use dotenv::dotenv;
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::Filter;

use india_inflation::config::AppConfig;
use india_inflation::routes;
use india_inflation::services::clock::SystemClock;
use india_inflation::services::exports::ExportResolver;
use india_inflation::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();
    info!("Logger initialized. Starting the application...");

    let config = AppConfig::from_env()?;
    info!("Using PORT: {}", config.port);

    let resolver = ExportResolver::from_config(&config.exports);
    info!("Export backends in order: {:?}", resolver.source_kinds());

    let state = Arc::new(AppState::new(
        resolver,
        Arc::new(SystemClock),
        config.cpi_series_slug.clone(),
        config.historical_cache_ttl,
    ));

    // Bind to 0.0.0.0 so the platform router can reach us.
    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();

    let cors = warp::cors()
        .allow_origins(config.allowed_origins.iter().map(String::as_str))
        .allow_headers(vec!["content-type", "authorization"])
        .allow_methods(vec!["GET", "POST", "OPTIONS"]);

    let api = routes::routes(state).with(cors).with(warp::log("india_inflation::http"));
    info!("Routes configured successfully with CORS.");

    info!("Starting server on {}", addr);
    warp::serve(api).run(addr).await;
    Ok(())
}
