//! Station directory error types.

use crate::backend::MetroError;

/// Errors that can occur when loading the station directory.
#[derive(Debug, thiserror::Error)]
pub enum StationError {
    /// Fetching the station list from the backend failed
    #[error("failed to fetch stations: {0}")]
    Backend(#[from] MetroError),

    /// The backend answered with no stations
    #[error("backend returned an empty station list")]
    Empty,

    /// Cache operation failed
    #[error("cache error: {message}")]
    Cache { message: String },
}
