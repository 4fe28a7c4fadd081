//! MetroInfo backend client.
//!
//! HTTP client for the metro REST services: route planning, station and
//! line lists, arrival predictions and carriage crowding.
//!
//! Key characteristics of the backend:
//! - Several independently deployed services; crowding and next-train data
//!   may live on their own hosts
//! - Route endpoints wrap results in a `{success, data, message}` envelope
//!   and use 400/404 for "unknown station" and "no path"
//! - Identifiers arrive as numbers or strings depending on the service

mod client;
mod error;
mod mock;
mod serde_utils;
mod types;

pub use client::{DEFAULT_BASE_URL, MetroClient, MetroConfig};
pub use error::MetroError;
pub use mock::MockMetroClient;
pub use types::{
    ArrivalInfoRecord, CarriageCrowding, CrowdingBatch, LineDirections, LineInfoRef, LineRecord,
    NearbyPayload, NearbyRecord, NextTrainsResponse, PathStep, RouteData, RouteEnvelope,
    StationRecord, StationRef, TrainArrival, UserLocation,
};
