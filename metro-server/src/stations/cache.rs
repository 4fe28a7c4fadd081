//! On-disk snapshot of the backend's station list.
//!
//! A snapshot remembers which backend produced it. Loading a snapshot
//! written by a different backend, such as fixture stations left behind by
//! a mock session, counts as a miss.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::StationError;
use crate::backend::StationRecord;

/// Snapshots older than this are refetched.
const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// File contents.
#[derive(Debug, Serialize, Deserialize)]
struct StationSnapshot {
    /// Backend the stations came from.
    origin: String,
    /// Unix seconds.
    saved_at: i64,
    stations: Vec<StationRecord>,
}

/// Why a snapshot was not used.
#[derive(Debug, thiserror::Error)]
enum Miss {
    #[error("no snapshot file")]
    Absent,
    #[error("unreadable snapshot: {0}")]
    Unreadable(String),
    #[error("snapshot belongs to {0}")]
    OtherOrigin(String),
    #[error("snapshot is {0}s old")]
    Stale(i64),
    #[error("snapshot has no stations")]
    Empty,
}

/// Where the snapshot lives and which backend it must match.
#[derive(Debug, Clone)]
pub struct StationCacheConfig {
    pub path: PathBuf,
    /// Backend base URL, or the fixture directory for mock runs.
    pub origin: String,
    pub max_age: Duration,
}

impl StationCacheConfig {
    pub fn new(path: impl Into<PathBuf>, origin: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            origin: origin.into(),
            max_age: DEFAULT_MAX_AGE,
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }
}

/// Station list snapshot for one backend.
#[derive(Debug, Clone)]
pub struct StationCache {
    config: StationCacheConfig,
}

impl StationCache {
    pub fn new(config: StationCacheConfig) -> Self {
        Self { config }
    }

    /// Stations from a fresh snapshot of this backend, if there is one.
    pub fn load(&self) -> Option<Vec<StationRecord>> {
        match self.read() {
            Ok(stations) => Some(stations),
            Err(miss) => {
                debug!(path = ?self.config.path, reason = %miss, "station snapshot not used");
                None
            }
        }
    }

    fn read(&self) -> Result<Vec<StationRecord>, Miss> {
        let contents = match std::fs::read_to_string(&self.config.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(Miss::Absent),
            Err(e) => return Err(Miss::Unreadable(e.to_string())),
        };
        let snapshot: StationSnapshot =
            serde_json::from_str(&contents).map_err(|e| Miss::Unreadable(e.to_string()))?;

        if snapshot.origin != self.config.origin {
            return Err(Miss::OtherOrigin(snapshot.origin));
        }

        let age = Utc::now().timestamp() - snapshot.saved_at;
        let max_age = i64::try_from(self.config.max_age.as_secs()).unwrap_or(i64::MAX);
        if age >= max_age {
            return Err(Miss::Stale(age));
        }

        if snapshot.stations.is_empty() {
            return Err(Miss::Empty);
        }
        Ok(snapshot.stations)
    }

    /// Replace the snapshot with `stations`.
    ///
    /// The file is written beside the target and renamed into place, so a
    /// reader never sees a partial snapshot.
    pub fn save(&self, stations: &[StationRecord]) -> Result<(), StationError> {
        let snapshot = StationSnapshot {
            origin: self.config.origin.clone(),
            saved_at: Utc::now().timestamp(),
            stations: stations.to_vec(),
        };
        let json = serde_json::to_string(&snapshot).map_err(|e| StationError::Cache {
            message: format!("failed to serialize stations: {e}"),
        })?;

        let path = &self.config.path;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| StationError::Cache {
                message: format!("failed to create {}: {e}", dir.display()),
            })?;
        }

        let partial = path.with_extension("partial");
        std::fs::write(&partial, json)
            .and_then(|()| std::fs::rename(&partial, path))
            .map_err(|e| StationError::Cache {
                message: format!("failed to write {}: {e}", path.display()),
            })
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    pub fn origin(&self) -> &str {
        &self.config.origin
    }
}
