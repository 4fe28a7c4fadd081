use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use metro_server::backend::{MetroClient, MockMetroClient};
use metro_server::cache::{Backend, CacheConfig, CachedMetroClient};
use metro_server::config::ServerConfig;
use metro_server::stations::{StationCache, StationCacheConfig, StationDirectory};
use metro_server::web::{AppState, create_router};

/// How often to refresh the station directory (24 hours).
const STATION_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("metro_server=info")),
        )
        .with_target(false)
        .init();

    let config = ServerConfig::from_env().expect("Invalid configuration");

    let backend = match &config.mock_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "serving mock fixtures");
            Backend::Mock(MockMetroClient::new(dir).expect("Failed to load mock data"))
        }
        None => {
            info!(base_url = %config.api_base_url, "using live metro backend");
            Backend::Live(
                MetroClient::new(config.metro_config()).expect("Failed to create metro client"),
            )
        }
    };
    let metro = Arc::new(CachedMetroClient::new(backend, &CacheConfig::default()));

    // The station list only helps resolve names, so start without it
    // rather than refusing to serve.
    let disk_cache = StationCache::new(StationCacheConfig::new(
        config.station_cache.clone(),
        config.backend_origin(),
    ));
    let stations = match StationDirectory::fetch(metro.clone(), Some(disk_cache.clone())).await {
        Ok(stations) => {
            info!(count = stations.len().await, "loaded station directory");
            stations
        }
        Err(e) => {
            warn!(error = %e, "station directory unavailable, starting empty");
            StationDirectory::empty(metro.clone(), Some(disk_cache))
        }
    };

    // Spawn background task to refresh the directory daily
    let stations_refresh = stations.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(STATION_REFRESH_INTERVAL);
        interval.tick().await; // First tick is immediate, skip it
        loop {
            interval.tick().await;
            match stations_refresh.refresh().await {
                Ok(count) => info!(count, "refreshed station directory"),
                Err(e) => error!(error = %e, "failed to refresh station directory"),
            }
        }
    });

    let state = AppState::new(metro, stations);
    let static_dir = config.static_dir.to_string_lossy();
    let app = create_router(state, &static_dir);

    let addr = config.bind_addr;
    info!("MetroInfo listening on http://{addr}");
    info!("API endpoints: /route /nearby /arrivals /crowding /lines /lines/{{id}} /api/stations/search /health");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
