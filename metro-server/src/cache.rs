//! Caching layer over the metro backend.
//!
//! Routes and line data change rarely, so they are cached for minutes to
//! an hour. Nearby lookups are cached briefly, keyed by coordinates rounded
//! to about 100 m so a user refreshing in place hits the cache. Arrivals and
//! crowding are live data and always go to the backend.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;

use crate::backend::{
    ArrivalInfoRecord, CrowdingBatch, LineRecord, MetroClient, MetroError, MockMetroClient,
    NearbyRecord, NextTrainsResponse, RouteData, StationRecord,
};
use crate::domain::LineId;

/// Cache key for routes, normalized so "人民广场 " and "人民广场" share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum RouteKey {
    Names(String, String),
    Ids(String, String),
}

/// Cache key for nearby lookups: (lat, lng) in thousandths of a degree.
type NearbyKey = (i32, i32);

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for computed routes.
    pub route_ttl: Duration,

    /// TTL for the line list and single lines.
    pub line_ttl: Duration,

    /// TTL for nearby-station lookups.
    pub nearby_ttl: Duration,

    /// Maximum number of entries per cache.
    pub max_capacity: u64,
}

impl CacheConfig {
    pub fn with_route_ttl(mut self, ttl: Duration) -> Self {
        self.route_ttl = ttl;
        self
    }

    pub fn with_line_ttl(mut self, ttl: Duration) -> Self {
        self.line_ttl = ttl;
        self
    }

    pub fn with_nearby_ttl(mut self, ttl: Duration) -> Self {
        self.nearby_ttl = ttl;
        self
    }

    pub fn with_max_capacity(mut self, n: u64) -> Self {
        self.max_capacity = n;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            route_ttl: Duration::from_secs(10 * 60),
            line_ttl: Duration::from_secs(60 * 60),
            nearby_ttl: Duration::from_secs(60),
            max_capacity: 1000,
        }
    }
}

/// Where requests go: the live services or fixture files.
#[derive(Clone)]
pub enum Backend {
    Live(MetroClient),
    Mock(MockMetroClient),
}

/// Dispatch a call to whichever backend is configured.
macro_rules! dispatch {
    ($backend:expr, $method:ident ( $($arg:expr),* )) => {
        match $backend {
            Backend::Live(client) => client.$method($($arg),*).await,
            Backend::Mock(client) => client.$method($($arg),*).await,
        }
    };
}

/// Moka caches for backend responses.
struct MetroCache {
    routes: MokaCache<RouteKey, Arc<RouteData>>,
    lines: MokaCache<(), Arc<Vec<LineRecord>>>,
    line: MokaCache<LineId, Arc<LineRecord>>,
    nearby: MokaCache<NearbyKey, Arc<Vec<NearbyRecord>>>,
}

impl MetroCache {
    fn new(config: &CacheConfig) -> Self {
        Self {
            routes: MokaCache::builder()
                .time_to_live(config.route_ttl)
                .max_capacity(config.max_capacity)
                .build(),
            lines: MokaCache::builder()
                .time_to_live(config.line_ttl)
                .max_capacity(1)
                .build(),
            line: MokaCache::builder()
                .time_to_live(config.line_ttl)
                .max_capacity(config.max_capacity)
                .build(),
            nearby: MokaCache::builder()
                .time_to_live(config.nearby_ttl)
                .max_capacity(config.max_capacity)
                .build(),
        }
    }

    fn entry_count(&self) -> u64 {
        self.routes.entry_count()
            + self.lines.entry_count()
            + self.line.entry_count()
            + self.nearby.entry_count()
    }

    fn invalidate_all(&self) {
        self.routes.invalidate_all();
        self.lines.invalidate_all();
        self.line.invalidate_all();
        self.nearby.invalidate_all();
    }

    async fn run_pending_tasks(&self) {
        self.routes.run_pending_tasks().await;
        self.lines.run_pending_tasks().await;
        self.line.run_pending_tasks().await;
        self.nearby.run_pending_tasks().await;
    }
}

/// Backend client with caching.
///
/// Failed requests are never cached.
pub struct CachedMetroClient {
    backend: Backend,
    cache: MetroCache,
}

impl CachedMetroClient {
    /// Create a new cached client.
    pub fn new(backend: Backend, cache_config: &CacheConfig) -> Self {
        Self {
            backend,
            cache: MetroCache::new(cache_config),
        }
    }

    /// Best route between two named stations, using cache if available.
    pub async fn best_route_by_name(
        &self,
        from: &str,
        to: &str,
    ) -> Result<Arc<RouteData>, MetroError> {
        let key = RouteKey::Names(normalize_name(from), normalize_name(to));

        if let Some(cached) = self.cache.routes.get(&key).await {
            return Ok(cached);
        }

        let route = Arc::new(dispatch!(&self.backend, best_route_by_name(from.trim(), to.trim()))?);
        self.cache.routes.insert(key, route.clone()).await;
        Ok(route)
    }

    /// Best route between two stations by id, using cache if available.
    pub async fn best_route_by_id(
        &self,
        start_station_id: &str,
        end_station_id: &str,
    ) -> Result<Arc<RouteData>, MetroError> {
        let key = RouteKey::Ids(
            start_station_id.trim().to_string(),
            end_station_id.trim().to_string(),
        );

        if let Some(cached) = self.cache.routes.get(&key).await {
            return Ok(cached);
        }

        let route = Arc::new(dispatch!(
            &self.backend,
            best_route_by_id(start_station_id.trim(), end_station_id.trim())
        )?);
        self.cache.routes.insert(key, route.clone()).await;
        Ok(route)
    }

    /// Raw nearby records, using cache if available.
    pub async fn nearby_stations(
        &self,
        lat: f64,
        lng: f64,
    ) -> Result<Arc<Vec<NearbyRecord>>, MetroError> {
        let key = (coordinate_bucket(lat), coordinate_bucket(lng));

        if let Some(cached) = self.cache.nearby.get(&key).await {
            return Ok(cached);
        }

        let records = Arc::new(dispatch!(&self.backend, nearby_stations(lat, lng))?);
        self.cache.nearby.insert(key, records.clone()).await;
        Ok(records)
    }

    /// All lines, using cache if available.
    pub async fn lines(&self) -> Result<Arc<Vec<LineRecord>>, MetroError> {
        if let Some(cached) = self.cache.lines.get(&()).await {
            return Ok(cached);
        }

        let lines = Arc::new(dispatch!(&self.backend, lines())?);
        self.cache.lines.insert((), lines.clone()).await;
        Ok(lines)
    }

    /// A single line, using cache if available.
    pub async fn line(&self, line: LineId) -> Result<Arc<LineRecord>, MetroError> {
        if let Some(cached) = self.cache.line.get(&line).await {
            return Ok(cached);
        }

        let record = Arc::new(dispatch!(&self.backend, line(line))?);
        self.cache.line.insert(line, record.clone()).await;
        Ok(record)
    }

    /// Every station. Not cached here; the station directory keeps its own copy.
    pub async fn stations(&self) -> Result<Vec<StationRecord>, MetroError> {
        dispatch!(&self.backend, stations())
    }

    /// Arrival predictions at a station (never cached).
    pub async fn station_arrivals(
        &self,
        station_id: &str,
    ) -> Result<Vec<ArrivalInfoRecord>, MetroError> {
        dispatch!(&self.backend, station_arrivals(station_id))
    }

    /// Upcoming trains at a station (never cached).
    pub async fn next_trains(&self, station_name: &str) -> Result<NextTrainsResponse, MetroError> {
        dispatch!(&self.backend, next_trains(station_name))
    }

    /// Crowding for a line (never cached).
    pub async fn crowding_batch(&self, line: LineId) -> Result<CrowdingBatch, MetroError> {
        dispatch!(&self.backend, crowding_batch(line))
    }

    /// Whether responses come from fixture files.
    pub fn is_mock(&self) -> bool {
        matches!(self.backend, Backend::Mock(_))
    }

    /// Get cache statistics.
    pub fn cache_entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Apply pending cache maintenance so counts are exact.
    pub async fn sync_cache(&self) {
        self.cache.run_pending_tasks().await;
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Coordinate in thousandths of a degree (about 100 m of latitude).
fn coordinate_bucket(deg: f64) -> i32 {
    (deg * 1000.0).round() as i32
}
