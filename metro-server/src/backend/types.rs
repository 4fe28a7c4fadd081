//! MetroInfo backend response DTOs.
//!
//! These types map directly to the backend JSON responses. They use
//! `Option` liberally because the services omit fields rather than sending
//! nulls, and they accept the alternate field names used by the different
//! services (`cn`/`name_cn`, `segment_time`/`time`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::serde_utils::{de_lenient_i64, de_lenient_string, de_line_list};
use crate::domain::{LineId, StationName};

/// Envelope returned by `/Dijkstra` and `/api/metro/best-route`.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteEnvelope {
    /// Whether a route was found.
    #[serde(default)]
    pub success: bool,

    /// The route, present when `success` is true.
    pub data: Option<RouteData>,

    /// Human-readable failure reason.
    pub message: Option<String>,
}

/// A computed route.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteData {
    /// Ordered ride segments and transfer markers.
    #[serde(default)]
    pub path: Vec<PathStep>,

    /// Total travel time in minutes, transfers included.
    pub total_time: Option<u32>,

    /// Number of transfers the backend counted.
    pub transfer_count: Option<u32>,

    /// Origin station.
    pub from_station: Option<StationRef>,

    /// Destination station.
    pub to_station: Option<StationRef>,
}

/// One element of a route path: a ride or a transfer marker.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathStep {
    /// Distinguishes transfer markers from ride segments.
    #[serde(default)]
    pub transfer: bool,

    /// Ride: boarding station.
    pub from_station: Option<StationRef>,

    /// Ride: alighting station.
    pub to_station: Option<StationRef>,

    /// Ride: line travelled.
    #[serde(default, deserialize_with = "de_lenient_i64")]
    pub line_id: Option<i64>,

    /// Ride: minutes between the two stations.
    #[serde(alias = "time")]
    pub segment_time: Option<u32>,

    /// Running total the backend computed (informational only).
    pub cumulative_time: Option<u32>,

    /// Transfer: line being left.
    #[serde(default, deserialize_with = "de_lenient_i64")]
    pub from_line: Option<i64>,

    /// Transfer: line being joined.
    #[serde(default, deserialize_with = "de_lenient_i64")]
    pub to_line: Option<i64>,

    /// Transfer: minutes spent changing lines.
    pub transfer_time: Option<u32>,

    /// Transfer: instruction text, e.g. "换乘到2号线".
    pub message: Option<String>,
}

/// A station reference inside a route payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StationRef {
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub station_id: String,

    #[serde(alias = "name_cn")]
    pub cn: Option<String>,

    #[serde(alias = "name_en")]
    pub en: Option<String>,
}

impl StationRef {
    /// The bilingual name of this station.
    pub fn name(&self) -> StationName {
        StationName::from_parts(self.cn.as_deref(), self.en.as_deref())
    }
}

/// Response from the nearest-stations endpoint.
///
/// The location service wraps results with the user's position; older
/// deployments return a bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NearbyPayload {
    Wrapped {
        user_location: Option<UserLocation>,
        nearest_stations: Vec<NearbyRecord>,
    },
    Bare(Vec<NearbyRecord>),
}

impl NearbyPayload {
    /// The station records, whichever shape they arrived in, with
    /// distances in metres.
    pub fn into_records(self) -> Vec<NearbyRecord> {
        let records = match self {
            NearbyPayload::Wrapped {
                nearest_stations, ..
            } => nearest_stations,
            NearbyPayload::Bare(records) => records,
        };
        records.into_iter().map(NearbyRecord::in_metres).collect()
    }
}

/// Position echoed back by the location service.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct UserLocation {
    pub lat: f64,
    pub lng: f64,
}

/// A raw nearby-station record: one row per (station, line) pair.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NearbyRecord {
    #[serde(alias = "station_id", default, deserialize_with = "de_lenient_string")]
    pub stat_id: String,

    pub name_cn: Option<String>,

    pub name_en: Option<String>,

    /// Distance from the user in metres.
    #[serde(default)]
    pub distance_m: f64,

    /// Distance in kilometres, as `/api/metro/nearest-stations` reports it.
    #[serde(rename = "distance", default)]
    pub distance_km: Option<f64>,

    /// Interchange group shared by platforms of the same station.
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub travel_group: String,

    /// The line this row belongs to.
    pub line_info: Option<LineInfoRef>,

    /// Flat line id used by older deployments instead of `line_info`.
    #[serde(default, deserialize_with = "de_lenient_i64")]
    pub line_id: Option<i64>,

    /// Every line serving the station.
    #[serde(default, deserialize_with = "de_line_list")]
    pub associated_lines: Vec<LineId>,
}

impl NearbyRecord {
    fn in_metres(mut self) -> Self {
        if let Some(km) = self.distance_km.take()
            && self.distance_m <= 0.0
        {
            self.distance_m = km * 1000.0;
        }
        self
    }

    /// The bilingual name of this station.
    pub fn name(&self) -> StationName {
        StationName::from_parts(self.name_cn.as_deref(), self.name_en.as_deref())
    }

    /// The row's own line, from `line_info` or the flat `line_id`.
    pub fn own_line(&self) -> Option<LineId> {
        self.line_info
            .as_ref()
            .and_then(|info| info.line)
            .or(self.line_id)
            .and_then(|n| LineId::from_i64(n).ok())
    }
}

/// Line details attached to a nearby record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LineInfoRef {
    #[serde(default, deserialize_with = "de_lenient_i64")]
    pub line: Option<i64>,

    #[serde(default)]
    pub all_stations: Vec<String>,
}

/// A station from the station list endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StationRecord {
    #[serde(alias = "stat_id", default, deserialize_with = "de_lenient_string")]
    pub station_id: String,

    #[serde(default)]
    pub name_cn: String,

    #[serde(default)]
    pub name_en: String,

    #[serde(default, deserialize_with = "de_lenient_i64")]
    pub line_id: Option<i64>,

    #[serde(default, deserialize_with = "de_line_list")]
    pub associated_lines: Vec<LineId>,
}

impl StationRecord {
    /// The bilingual name of this station.
    pub fn name(&self) -> StationName {
        StationName::new(&self.name_cn, &self.name_en)
    }
}

/// A line from `/api/lines`.
#[derive(Debug, Clone, Deserialize)]
pub struct LineRecord {
    pub line_id: LineId,

    /// Some deployments echo the line number here as an integer.
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub name_cn: String,

    #[serde(default, deserialize_with = "de_lenient_string")]
    pub name_en: String,

    /// Backend colour; the fixed palette is used when absent.
    pub color: Option<String>,

    /// Ordered stations along the line.
    #[serde(default)]
    pub stations: Vec<StationRecord>,
}

/// Arrival prediction from `/api/arrival-time/station/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ArrivalInfoRecord {
    #[serde(default, deserialize_with = "de_lenient_i64")]
    pub line_id: Option<i64>,

    #[serde(default, deserialize_with = "de_lenient_string")]
    pub station_id: String,

    #[serde(default)]
    pub station_name: String,

    pub line_name: Option<String>,

    #[serde(default)]
    pub direction_desc: String,

    pub first_arrival_time: Option<String>,

    pub next_arrival_time: Option<String>,

    #[serde(default, deserialize_with = "de_lenient_i64")]
    pub minutes_remaining: Option<i64>,

    pub first_train: Option<String>,

    pub last_train: Option<String>,

    pub is_operating: Option<bool>,

    pub service_status: Option<String>,
}

/// Response from `/smartmetro/next_trains`.
#[derive(Debug, Clone, Deserialize)]
pub struct NextTrainsResponse {
    #[serde(default)]
    pub station_name: String,

    /// Keyed by line number as a string.
    #[serde(default)]
    pub lines: BTreeMap<String, LineDirections>,
}

/// Upcoming trains on one line, per direction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LineDirections {
    #[serde(default)]
    pub up_direction: Vec<TrainArrival>,

    #[serde(default)]
    pub down_direction: Vec<TrainArrival>,
}

/// A single predicted train arrival.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainArrival {
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub train_number: String,

    #[serde(default)]
    pub direction: String,

    /// "HH:MM:SS" or "HH:MM".
    #[serde(default)]
    pub expected_arrival_time: String,

    #[serde(default, deserialize_with = "de_lenient_i64")]
    pub path_id: Option<i64>,

    #[serde(default, deserialize_with = "de_lenient_i64")]
    pub line_id: Option<i64>,
}

/// Response from `/smartmetro/crowding/batch`.
#[derive(Debug, Clone, Deserialize)]
pub struct CrowdingBatch {
    #[serde(default, deserialize_with = "de_lenient_i64")]
    pub line_number: Option<i64>,

    /// Keyed by train (or line record) id.
    #[serde(default)]
    pub data: BTreeMap<String, Vec<CarriageCrowding>>,
}

/// Crowding reading for one carriage.
#[derive(Debug, Clone, Deserialize)]
pub struct CarriageCrowding {
    pub line_carriage: u32,

    #[serde(default)]
    pub person_num: u32,

    #[serde(default, deserialize_with = "de_lenient_i64")]
    pub crowd_level: Option<i64>,

    pub timestamp: Option<String>,
}
