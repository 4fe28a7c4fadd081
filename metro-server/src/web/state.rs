//! Application state for the web layer.

use std::sync::Arc;

use crate::cache::CachedMetroClient;
use crate::stations::StationDirectory;

/// Shared application state.
///
/// Contains all the services needed to handle requests.
#[derive(Clone)]
pub struct AppState {
    /// Cached MetroInfo backend client
    pub metro: Arc<CachedMetroClient>,

    /// Station names for resolving user input and completions
    pub stations: StationDirectory,
}

impl AppState {
    /// Create a new app state.
    pub fn new(metro: Arc<CachedMetroClient>, stations: StationDirectory) -> Self {
        Self { metro, stations }
    }
}
