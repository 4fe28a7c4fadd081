//! Normalized itinerary types.

use crate::domain::{LineId, StationName};

/// Riding one line between two stations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RideStep {
    pub from: StationName,
    pub to: StationName,
    pub line: LineId,
    /// Minutes spent on this segment.
    pub minutes: u32,
    /// Minutes elapsed since departure, this segment included.
    pub cumulative_minutes: u32,
}

/// Changing from one line to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferStep {
    pub from_line: LineId,
    pub to_line: LineId,
    /// Minutes allowed for the change.
    pub minutes: u32,
    /// Instruction shown to the rider, e.g. "换乘到2号线".
    pub message: String,
    /// Minutes elapsed since departure, this transfer included.
    pub cumulative_minutes: u32,
}

/// One step of an itinerary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteStep {
    Ride(RideStep),
    Transfer(TransferStep),
}

impl RouteStep {
    /// Whether this step is a line change.
    pub fn is_transfer(&self) -> bool {
        matches!(self, RouteStep::Transfer(_))
    }

    /// Minutes spent on this step alone.
    pub fn minutes(&self) -> u32 {
        match self {
            RouteStep::Ride(r) => r.minutes,
            RouteStep::Transfer(t) => t.minutes,
        }
    }

    /// Minutes elapsed since departure at the end of this step.
    pub fn cumulative_minutes(&self) -> u32 {
        match self {
            RouteStep::Ride(r) => r.cumulative_minutes,
            RouteStep::Transfer(t) => t.cumulative_minutes,
        }
    }
}

/// A route from origin to destination as an ordered list of steps.
///
/// Built by [`super::normalize`]; every itinerary has at least one ride.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Itinerary {
    pub origin: StationName,
    pub destination: StationName,
    pub steps: Vec<RouteStep>,
    pub total_minutes: u32,
    pub transfer_count: usize,
}

impl Itinerary {
    /// The ride steps, in order.
    pub fn rides(&self) -> impl Iterator<Item = &RideStep> {
        self.steps.iter().filter_map(|s| match s {
            RouteStep::Ride(r) => Some(r),
            RouteStep::Transfer(_) => None,
        })
    }

    /// Lines used, in travel order, without consecutive repeats.
    pub fn lines_used(&self) -> Vec<LineId> {
        let mut lines: Vec<LineId> = self.rides().map(|r| r.line).collect();
        lines.dedup();
        lines
    }

    /// Number of ride segments (one per pair of adjacent stations).
    pub fn ride_segments(&self) -> usize {
        self.rides().count()
    }
}
