//! Route-response normalization.
//!
//! The backend computes the route; this module only reshapes its path
//! array into ordered, typed steps with elapsed times.

mod error;
mod itinerary;
mod normalize;

pub use error::RouteError;
pub use itinerary::{Itinerary, RideStep, RouteStep, TransferStep};
pub use normalize::{DEFAULT_TRANSFER_MINUTES, normalize, transfer_message};
