//! Station directory and name lookup.
//!
//! Provides name → station mapping, loaded from the backend station list
//! (or a fresh disk cache) at startup and refreshed daily.

mod cache;
mod directory;
mod error;

pub use cache::{StationCache, StationCacheConfig};
pub use directory::{DEFAULT_SEARCH_LIMIT, Station, StationDirectory};
pub use error::StationError;
