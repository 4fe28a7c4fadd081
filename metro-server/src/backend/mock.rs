//! Mock MetroInfo client for development without a backend.
//!
//! Loads canned responses from JSON fixture files and serves them as if
//! they were live API responses.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use super::client::unwrap_route;
use super::error::MetroError;
use super::types::{
    ArrivalInfoRecord, CrowdingBatch, LineRecord, NearbyPayload, NearbyRecord, NextTrainsResponse,
    RouteData, RouteEnvelope, StationRecord,
};
use crate::domain::LineId;

/// Message the route service gives for an unknown station name.
const INVALID_STATION: &str = "无效的车站名称";

/// Message the route service gives when no path exists.
const NO_PATH: &str = "未找到路径";

/// Everything a fixture directory can provide.
///
/// Missing files leave the matching field empty; the operation backed by
/// it then answers like a backend with no data.
#[derive(Debug, Default)]
struct Fixtures {
    /// `route.json`: envelopes keyed by `"{from}|{to}"` (Chinese names).
    routes: HashMap<String, RouteEnvelope>,
    /// `nearby.json`: a nearest-stations response.
    nearby: Vec<NearbyRecord>,
    /// `stations.json`
    stations: Vec<StationRecord>,
    /// `lines.json`
    lines: Vec<LineRecord>,
    /// `next_trains.json`: keyed by station name.
    next_trains: HashMap<String, NextTrainsResponse>,
    /// `crowding.json`: keyed by line number.
    crowding: HashMap<String, CrowdingBatch>,
    /// `arrivals.json`: keyed by station id.
    arrivals: HashMap<String, Vec<ArrivalInfoRecord>>,
}

/// Mock client that serves data from JSON files.
#[derive(Clone)]
pub struct MockMetroClient {
    fixtures: Arc<RwLock<Fixtures>>,
}

impl MockMetroClient {
    /// Create a new mock client by loading fixture files from a directory.
    ///
    /// Fails if the directory is unreadable, a present file does not parse,
    /// or no fixture file exists at all.
    pub fn new(data_dir: impl AsRef<Path>) -> Result<Self, MetroError> {
        let data_dir = data_dir.as_ref();
        if !data_dir.is_dir() {
            return Err(MetroError::Mock(format!(
                "mock data directory not found: {:?}",
                data_dir
            )));
        }

        let mut found = 0usize;
        let mut fixtures = Fixtures::default();

        if let Some(routes) = load(data_dir, "route.json", &mut found)? {
            fixtures.routes = routes;
        }
        if let Some(payload) = load::<NearbyPayload>(data_dir, "nearby.json", &mut found)? {
            fixtures.nearby = payload.into_records();
        }
        if let Some(stations) = load(data_dir, "stations.json", &mut found)? {
            fixtures.stations = stations;
        }
        if let Some(lines) = load(data_dir, "lines.json", &mut found)? {
            fixtures.lines = lines;
        }
        if let Some(next_trains) = load(data_dir, "next_trains.json", &mut found)? {
            fixtures.next_trains = next_trains;
        }
        if let Some(crowding) = load(data_dir, "crowding.json", &mut found)? {
            fixtures.crowding = crowding;
        }
        if let Some(arrivals) = load(data_dir, "arrivals.json", &mut found)? {
            fixtures.arrivals = arrivals;
        }

        if found == 0 {
            return Err(MetroError::Mock(format!(
                "no fixture files found in {:?}",
                data_dir
            )));
        }

        Ok(Self {
            fixtures: Arc::new(RwLock::new(fixtures)),
        })
    }

    /// Best route between two stations given by name.
    ///
    /// Names are resolved to their Chinese form through `stations.json`
    /// when possible, so English input finds the same fixture.
    pub async fn best_route_by_name(&self, from: &str, to: &str) -> Result<RouteData, MetroError> {
        let fixtures = self.fixtures.read().await;
        let from = fixtures.canonical_name(from)?;
        let to = fixtures.canonical_name(to)?;
        fixtures.route(&from, &to)
    }

    /// Best route between two stations given by id.
    pub async fn best_route_by_id(
        &self,
        start_station_id: &str,
        end_station_id: &str,
    ) -> Result<RouteData, MetroError> {
        let fixtures = self.fixtures.read().await;
        let from = fixtures.name_for_id(start_station_id)?;
        let to = fixtures.name_for_id(end_station_id)?;
        fixtures.route(&from, &to)
    }

    /// Nearby-station records.
    ///
    /// Position is ignored; fixture data is static.
    pub async fn nearby_stations(&self, _lat: f64, _lng: f64) -> Result<Vec<NearbyRecord>, MetroError> {
        Ok(self.fixtures.read().await.nearby.clone())
    }

    /// Every station in the fixtures.
    pub async fn stations(&self) -> Result<Vec<StationRecord>, MetroError> {
        Ok(self.fixtures.read().await.stations.clone())
    }

    /// Every line in the fixtures.
    pub async fn lines(&self) -> Result<Vec<LineRecord>, MetroError> {
        Ok(self.fixtures.read().await.lines.clone())
    }

    /// A single line.
    pub async fn line(&self, line: LineId) -> Result<LineRecord, MetroError> {
        self.fixtures
            .read()
            .await
            .lines
            .iter()
            .find(|l| l.line_id == line)
            .cloned()
            .ok_or_else(|| MetroError::NotFound(format!("line {line}")))
    }

    /// Arrival predictions at a station.
    pub async fn station_arrivals(
        &self,
        station_id: &str,
    ) -> Result<Vec<ArrivalInfoRecord>, MetroError> {
        self.fixtures
            .read()
            .await
            .arrivals
            .get(station_id)
            .cloned()
            .ok_or_else(|| MetroError::NotFound(format!("arrivals for station {station_id}")))
    }

    /// Upcoming trains at a station.
    pub async fn next_trains(&self, station_name: &str) -> Result<NextTrainsResponse, MetroError> {
        let fixtures = self.fixtures.read().await;
        let key = fixtures
            .canonical_name(station_name)
            .unwrap_or_else(|_| station_name.trim().to_string());
        fixtures
            .next_trains
            .get(&key)
            .cloned()
            .ok_or_else(|| MetroError::NotFound(format!("next trains for {station_name}")))
    }

    /// Crowding readings for a line.
    pub async fn crowding_batch(&self, line: LineId) -> Result<CrowdingBatch, MetroError> {
        self.fixtures
            .read()
            .await
            .crowding
            .get(&line.to_string())
            .cloned()
            .ok_or_else(|| MetroError::NotFound(format!("crowding for line {line}")))
    }
}

impl Fixtures {
    /// Resolve a typed name to the Chinese name used as a fixture key.
    ///
    /// Without a station list every name is accepted as typed.
    fn canonical_name(&self, name: &str) -> Result<String, MetroError> {
        let name = name.trim();
        if self.stations.is_empty() {
            return Ok(name.to_string());
        }

        self.stations
            .iter()
            .find(|s| s.name_cn.trim() == name || s.name_en.trim().eq_ignore_ascii_case(name))
            .map(|s| s.name().display_cn().to_string())
            .ok_or_else(|| MetroError::RouteUnavailable(INVALID_STATION.to_string()))
    }

    fn name_for_id(&self, id: &str) -> Result<String, MetroError> {
        self.stations
            .iter()
            .find(|s| s.station_id == id)
            .map(|s| s.name().display_cn().to_string())
            .ok_or_else(|| MetroError::RouteUnavailable(INVALID_STATION.to_string()))
    }

    fn route(&self, from: &str, to: &str) -> Result<RouteData, MetroError> {
        let envelope = self
            .routes
            .get(&format!("{from}|{to}"))
            .cloned()
            .ok_or_else(|| MetroError::RouteUnavailable(NO_PATH.to_string()))?;
        unwrap_route(envelope)
    }
}

/// Read and parse one fixture file, counting it when present.
fn load<T: DeserializeOwned>(
    dir: &Path,
    file: &str,
    found: &mut usize,
) -> Result<Option<T>, MetroError> {
    let path = dir.join(file);
    if !path.is_file() {
        return Ok(None);
    }

    let json = std::fs::read_to_string(&path)
        .map_err(|e| MetroError::Mock(format!("failed to read {:?}: {}", path, e)))?;
    let value = serde_json::from_str(&json)
        .map_err(|e| MetroError::Mock(format!("failed to parse {:?}: {}", path, e)))?;

    *found += 1;
    Ok(Some(value))
}
