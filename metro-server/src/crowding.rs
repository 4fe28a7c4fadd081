//! Carriage crowding reports.

use tracing::debug;

use crate::backend::{CarriageCrowding, CrowdingBatch};
use crate::domain::{CrowdLevel, LineId};

/// Latest reading for one carriage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarriageReading {
    pub carriage: u32,
    pub person_count: u32,
    pub level: CrowdLevel,
    pub timestamp: Option<String>,
}

/// Crowding across the carriages of one train.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainCrowding {
    pub train_id: String,
    /// Ascending by carriage number.
    pub carriages: Vec<CarriageReading>,
    /// Highest level of any carriage.
    pub busiest: CrowdLevel,
    /// Carriage with the fewest people; lower number wins ties.
    pub recommended_carriage: u32,
}

/// Crowding for every reporting train on a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrowdingReport {
    pub line: Option<LineId>,
    pub trains: Vec<TrainCrowding>,
}

impl CrowdingReport {
    /// Build a report from a batch response.
    ///
    /// A carriage reported more than once keeps its latest reading. A level
    /// code outside 0-2 is replaced by one derived from the head count.
    /// Trains with no readings are omitted.
    pub fn from_batch(batch: &CrowdingBatch) -> Self {
        let line = batch.line_number.and_then(|n| LineId::from_i64(n).ok());

        let trains = batch
            .data
            .iter()
            .filter_map(|(train_id, readings)| train_crowding(train_id, readings))
            .collect();

        Self { line, trains }
    }

    /// The most crowded level across all trains, if any reported.
    pub fn busiest(&self) -> Option<CrowdLevel> {
        self.trains.iter().map(|t| t.busiest).max()
    }

    pub fn is_empty(&self) -> bool {
        self.trains.is_empty()
    }
}

fn train_crowding(train_id: &str, readings: &[CarriageCrowding]) -> Option<TrainCrowding> {
    let mut sorted: Vec<&CarriageCrowding> = readings.iter().collect();
    sorted.sort_by(|a, b| {
        a.line_carriage
            .cmp(&b.line_carriage)
            .then_with(|| a.timestamp.cmp(&b.timestamp))
    });

    let mut carriages: Vec<CarriageReading> = Vec::with_capacity(sorted.len());
    for reading in sorted {
        let entry = CarriageReading {
            carriage: reading.line_carriage,
            person_count: reading.person_num,
            level: reading_level(reading),
            timestamp: reading.timestamp.clone(),
        };
        match carriages.last_mut() {
            // Same carriage, later timestamp
            Some(last) if last.carriage == entry.carriage => *last = entry,
            _ => carriages.push(entry),
        }
    }

    let busiest = carriages.iter().map(|c| c.level).max()?;
    let recommended_carriage = carriages
        .iter()
        .min_by_key(|c| (c.person_count, c.carriage))
        .map(|c| c.carriage)?;

    Some(TrainCrowding {
        train_id: train_id.to_string(),
        carriages,
        busiest,
        recommended_carriage,
    })
}

fn reading_level(reading: &CarriageCrowding) -> CrowdLevel {
    let derived = || CrowdLevel::from_person_count(reading.person_num);
    match reading.crowd_level {
        Some(code) => u8::try_from(code)
            .ok()
            .and_then(|c| CrowdLevel::from_code(c).ok())
            .unwrap_or_else(|| {
                debug!(
                    carriage = reading.line_carriage,
                    code, "crowd level out of range, deriving from head count"
                );
                derived()
            }),
        None => derived(),
    }
}
