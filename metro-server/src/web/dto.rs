//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::arrivals::{ArrivalBoard, ArrivalRow};
use crate::backend::LineRecord;
use crate::crowding::{CrowdingReport, TrainCrowding};
use crate::domain::{LineId, StationName};
use crate::nearby::NearbyStation;
use crate::route::{Itinerary, RouteStep};
use crate::stations::Station;

/// Request to plan a route, by name or by station id.
#[derive(Debug, Default, Deserialize)]
pub struct RouteRequest {
    /// Origin station name (Chinese or English)
    pub from: Option<String>,

    /// Destination station name
    pub to: Option<String>,

    /// Origin station id; used with `to_id` instead of names
    pub from_id: Option<String>,

    /// Destination station id
    pub to_id: Option<String>,
}

/// Request for stations near a position.
#[derive(Debug, Deserialize)]
pub struct NearbyRequest {
    pub lat: f64,
    pub lng: f64,

    /// Maximum stations to return (default 10, at most 50)
    pub limit: Option<usize>,
}

/// Request for a station's arrival board.
#[derive(Debug, Deserialize)]
pub struct ArrivalsRequest {
    /// Station name (Chinese or English)
    pub station: String,
}

/// Request for crowding on one or more lines.
#[derive(Debug, Deserialize)]
pub struct CrowdingRequest {
    /// A line number or a comma-separated list, e.g. "2" or "1,2,8"
    pub line: String,
}

/// Request for station name completions.
#[derive(Debug, Deserialize)]
pub struct StationSearchRequest {
    /// Search query (partial station name)
    pub q: String,

    /// Maximum results (default 10, at most 50)
    pub limit: Option<usize>,
}

/// Bilingual station name.
#[derive(Debug, Clone, Serialize)]
pub struct StationNameResult {
    pub cn: String,
    pub en: String,
}

impl From<&StationName> for StationNameResult {
    fn from(name: &StationName) -> Self {
        Self {
            cn: name.display_cn().to_string(),
            en: name.display_en().to_string(),
        }
    }
}

/// A line with its display attributes.
#[derive(Debug, Clone, Serialize)]
pub struct LineBadge {
    pub line: LineId,
    pub name_cn: String,
    pub color: String,
}

impl From<LineId> for LineBadge {
    fn from(line: LineId) -> Self {
        Self {
            line,
            name_cn: line.name_cn(),
            color: line.color_hex().to_string(),
        }
    }
}

/// One step of a route.
///
/// Ride fields are set for rides and transfer fields for transfers; the
/// `transfer` flag tells them apart.
#[derive(Debug, Serialize)]
pub struct RouteStepResult {
    pub transfer: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_station: Option<StationNameResult>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_station: Option<StationNameResult>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<LineBadge>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_line: Option<LineBadge>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_line: Option<LineBadge>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Minutes spent on this step
    pub minutes: u32,

    /// Minutes elapsed at the end of this step
    pub cumulative_minutes: u32,
}

impl RouteStepResult {
    pub fn from_step(step: &RouteStep) -> Self {
        match step {
            RouteStep::Ride(r) => Self {
                transfer: false,
                from_station: Some((&r.from).into()),
                to_station: Some((&r.to).into()),
                line: Some(r.line.into()),
                from_line: None,
                to_line: None,
                message: None,
                minutes: r.minutes,
                cumulative_minutes: r.cumulative_minutes,
            },
            RouteStep::Transfer(t) => Self {
                transfer: true,
                from_station: None,
                to_station: None,
                line: None,
                from_line: Some(t.from_line.into()),
                to_line: Some(t.to_line.into()),
                message: Some(t.message.clone()),
                minutes: t.minutes,
                cumulative_minutes: t.cumulative_minutes,
            },
        }
    }
}

/// A normalized route.
#[derive(Debug, Serialize)]
pub struct RouteResponse {
    pub origin: StationNameResult,
    pub destination: StationNameResult,
    pub total_minutes: u32,
    pub transfer_count: usize,
    /// Station-to-station hops ridden
    pub ride_count: usize,
    pub lines: Vec<LineBadge>,
    pub steps: Vec<RouteStepResult>,
}

impl RouteResponse {
    pub fn from_itinerary(itinerary: &Itinerary) -> Self {
        Self {
            origin: (&itinerary.origin).into(),
            destination: (&itinerary.destination).into(),
            total_minutes: itinerary.total_minutes,
            transfer_count: itinerary.transfer_count,
            ride_count: itinerary.ride_segments(),
            lines: itinerary.lines_used().into_iter().map(LineBadge::from).collect(),
            steps: itinerary.steps.iter().map(RouteStepResult::from_step).collect(),
        }
    }
}

/// A merged nearby station.
#[derive(Debug, Serialize)]
pub struct NearbyResult {
    pub station_id: String,
    pub name: StationNameResult,
    pub distance_m: f64,
    pub distance_label: String,
    pub is_transfer: bool,
    pub lines: Vec<LineBadge>,
}

impl NearbyResult {
    pub fn from_station(station: &NearbyStation) -> Self {
        Self {
            station_id: station.id.clone(),
            name: (&station.name).into(),
            distance_m: station.distance_m,
            distance_label: station.distance_label(),
            is_transfer: station.is_transfer(),
            lines: station.lines.iter().copied().map(LineBadge::from).collect(),
        }
    }
}

/// Response for nearby stations.
#[derive(Debug, Serialize)]
pub struct NearbyResponse {
    pub lat: f64,
    pub lng: f64,
    pub stations: Vec<NearbyResult>,
}

/// One upcoming train.
#[derive(Debug, Serialize)]
pub struct ArrivalResult {
    pub line: LineBadge,
    pub direction: String,
    pub train_number: Option<String>,
    /// "HH:MM"
    pub expected: Option<String>,
    pub next: Option<String>,
    pub minutes_remaining: Option<u32>,
    /// e.g. "即将到站", "4分钟", "停运"
    pub status: String,
}

impl ArrivalResult {
    pub fn from_row(row: &ArrivalRow) -> Self {
        Self {
            line: row.line.into(),
            direction: row.direction.clone(),
            train_number: row.train_number.clone(),
            expected: row.expected.map(|t| t.format("%H:%M").to_string()),
            next: row.next.map(|t| t.format("%H:%M").to_string()),
            minutes_remaining: row.minutes_remaining,
            status: row.status.label_cn(),
        }
    }
}

/// A station's arrival board.
#[derive(Debug, Serialize)]
pub struct ArrivalsResponse {
    pub station: String,
    pub arrivals: Vec<ArrivalResult>,
}

impl ArrivalsResponse {
    pub fn from_board(board: &ArrivalBoard) -> Self {
        Self {
            station: board.station.clone(),
            arrivals: board.rows.iter().map(ArrivalResult::from_row).collect(),
        }
    }
}

/// Crowding for one carriage.
#[derive(Debug, Serialize)]
pub struct CarriageResult {
    pub carriage: u32,
    pub person_count: u32,
    pub level: u8,
    pub level_label: String,
}

/// Crowding for one train.
#[derive(Debug, Serialize)]
pub struct TrainCrowdingResult {
    pub train_id: String,
    pub busiest_level: u8,
    pub recommended_carriage: u32,
    pub carriages: Vec<CarriageResult>,
}

impl TrainCrowdingResult {
    pub fn from_train(train: &TrainCrowding) -> Self {
        Self {
            train_id: train.train_id.clone(),
            busiest_level: train.busiest.code(),
            recommended_carriage: train.recommended_carriage,
            carriages: train
                .carriages
                .iter()
                .map(|c| CarriageResult {
                    carriage: c.carriage,
                    person_count: c.person_count,
                    level: c.level.code(),
                    level_label: c.level.label_cn().to_string(),
                })
                .collect(),
        }
    }
}

/// Crowding for one line, or why it is unavailable.
#[derive(Debug, Serialize)]
pub struct LineCrowdingResult {
    pub line: LineBadge,
    /// Highest level on any train of the line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub busiest_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub busiest_label: Option<String>,
    pub trains: Vec<TrainCrowdingResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LineCrowdingResult {
    pub fn from_report(line: LineId, report: &CrowdingReport) -> Self {
        let busiest = report.busiest();
        Self {
            line: line.into(),
            busiest_level: busiest.map(|l| l.code()),
            busiest_label: busiest.map(|l| l.label_cn().to_string()),
            trains: report.trains.iter().map(TrainCrowdingResult::from_train).collect(),
            error: None,
        }
    }

    pub fn unavailable(line: LineId, error: String) -> Self {
        Self {
            line: line.into(),
            busiest_level: None,
            busiest_label: None,
            trains: Vec::new(),
            error: Some(error),
        }
    }
}

/// Response for crowding.
#[derive(Debug, Serialize)]
pub struct CrowdingResponse {
    pub lines: Vec<LineCrowdingResult>,
}

/// A metro line.
#[derive(Debug, Serialize)]
pub struct LineResult {
    pub line: LineId,
    pub name_cn: String,
    pub name_en: String,
    pub color: String,
    pub stations: Vec<StationNameResult>,
}

impl LineResult {
    /// The backend colour wins over the built-in palette when present.
    /// A name that is only the line number counts as missing.
    pub fn from_record(record: &LineRecord) -> Self {
        let line = record.line_id;
        let number = line.to_string();
        let non_empty = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());
        let real_name = |s: &str| non_empty(s).filter(|s| *s != number);
        Self {
            line,
            name_cn: real_name(&record.name_cn).unwrap_or_else(|| line.name_cn()),
            name_en: real_name(&record.name_en).unwrap_or_else(|| line.name_en()),
            color: record
                .color
                .as_deref()
                .and_then(non_empty)
                .unwrap_or_else(|| line.color_hex().to_string()),
            stations: record
                .stations
                .iter()
                .map(|s| StationNameResult::from(&s.name()))
                .collect(),
        }
    }
}

/// Response for the line list.
#[derive(Debug, Serialize)]
pub struct LinesResponse {
    pub lines: Vec<LineResult>,
}

/// A station in search results.
#[derive(Debug, Serialize)]
pub struct StationSearchResult {
    pub station_id: String,
    pub name: StationNameResult,
    pub lines: Vec<LineId>,
}

impl StationSearchResult {
    pub fn from_station(station: &Station) -> Self {
        Self {
            station_id: station.id.clone(),
            name: (&station.name).into(),
            lines: station.lines.clone(),
        }
    }
}

/// Response for station search.
#[derive(Debug, Serialize)]
pub struct StationSearchResponse {
    pub stations: Vec<StationSearchResult>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
