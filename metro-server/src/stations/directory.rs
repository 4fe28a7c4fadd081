//! Station name directory.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use super::cache::StationCache;
use super::error::StationError;
use crate::backend::StationRecord;
use crate::cache::CachedMetroClient;
use crate::domain::{LineId, StationName};

/// Default number of search completions.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// A metro station as known to the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Station {
    pub id: String,
    pub name: StationName,
    /// Every line serving the station, ascending.
    pub lines: Vec<LineId>,
}

impl Station {
    pub fn is_transfer(&self) -> bool {
        self.lines.len() > 1
    }
}

/// Stations plus a lookup from lowercased names (Chinese and English) to
/// positions in `stations`.
#[derive(Debug, Default)]
struct Index {
    stations: Vec<Station>,
    by_name: HashMap<String, usize>,
}

impl Index {
    /// Build the index, merging per-line records of the same station.
    fn build(records: Vec<StationRecord>) -> Self {
        let mut index = Index::default();

        for record in records {
            let name = record.name();
            let Some(key) = name.grouping_key() else {
                continue;
            };

            let mut lines = record.associated_lines.clone();
            lines.extend(record.line_id.and_then(|n| LineId::from_i64(n).ok()));

            let position = match index.by_name.get(&key.to_lowercase()) {
                Some(&position) => position,
                None => {
                    index.stations.push(Station {
                        id: record.station_id.clone(),
                        name: name.clone(),
                        lines: Vec::new(),
                    });
                    index.stations.len() - 1
                }
            };

            index.stations[position].lines.extend(lines);
            for alias in [name.cn(), name.en()] {
                if !alias.is_empty() {
                    index
                        .by_name
                        .entry(alias.to_lowercase())
                        .or_insert(position);
                }
            }
        }

        for station in &mut index.stations {
            station.lines.sort_unstable();
            station.lines.dedup();
        }

        index
    }

    fn lookup(&self, name: &str) -> Option<&Station> {
        self.by_name
            .get(&name.trim().to_lowercase())
            .map(|&i| &self.stations[i])
    }

    /// Prefix matches first, then substring matches; shorter names first
    /// within each group.
    fn search(&self, query: &str, limit: usize) -> Vec<Station> {
        let query = query.trim().to_lowercase();
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut matches: Vec<(u8, usize, &Station)> = self
            .stations
            .iter()
            .filter_map(|station| {
                let cn = station.name.cn().to_lowercase();
                let en = station.name.en().to_lowercase();
                let rank = if cn.starts_with(&query) || en.starts_with(&query) {
                    0
                } else if cn.contains(&query) || en.contains(&query) {
                    1
                } else {
                    return None;
                };
                Some((rank, station.name.display_cn().chars().count(), station))
            })
            .collect();

        matches.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then(a.1.cmp(&b.1))
                .then_with(|| a.2.name.display_cn().cmp(b.2.name.display_cn()))
        });

        matches
            .into_iter()
            .take(limit)
            .map(|(_, _, s)| s.clone())
            .collect()
    }
}

/// Thread-safe station directory.
///
/// Maps station names to stations, with support for background refresh.
#[derive(Clone)]
pub struct StationDirectory {
    inner: Arc<RwLock<Index>>,
    client: Arc<CachedMetroClient>,
    disk_cache: Option<StationCache>,
}

impl StationDirectory {
    /// Load the directory, preferring a fresh disk cache over the network.
    ///
    /// A successful network fetch is written back to the disk cache; a
    /// failed write is logged and otherwise ignored.
    pub async fn fetch(
        client: Arc<CachedMetroClient>,
        disk_cache: Option<StationCache>,
    ) -> Result<Self, StationError> {
        let records = match disk_cache.as_ref().and_then(StationCache::load) {
            Some(records) => {
                info!(count = records.len(), "loaded stations from disk cache");
                records
            }
            None => fetch_records(&client, disk_cache.as_ref()).await?,
        };

        Ok(Self {
            inner: Arc::new(RwLock::new(Index::build(records))),
            client,
            disk_cache,
        })
    }

    /// Create an empty directory.
    ///
    /// Lookups miss until a [`refresh`](Self::refresh) succeeds.
    pub fn empty(client: Arc<CachedMetroClient>, disk_cache: Option<StationCache>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Index::default())),
            client,
            disk_cache,
        }
    }

    /// Find a station by exact Chinese or English name (case-insensitive).
    pub async fn lookup(&self, name: &str) -> Option<Station> {
        let guard = self.inner.read().await;
        guard.lookup(name).cloned()
    }

    /// Station name completions for a partial query.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<Station> {
        let guard = self.inner.read().await;
        guard.search(query, limit)
    }

    /// Get the number of stations in the directory.
    pub async fn len(&self) -> usize {
        let guard = self.inner.read().await;
        guard.stations.len()
    }

    pub async fn is_empty(&self) -> bool {
        let guard = self.inner.read().await;
        guard.stations.is_empty()
    }

    /// Refresh the station data from the backend.
    ///
    /// On success, replaces the current directory. On failure, the existing
    /// directory is preserved and the error is returned.
    pub async fn refresh(&self) -> Result<usize, StationError> {
        let records = fetch_records(&self.client, self.disk_cache.as_ref()).await?;
        let index = Index::build(records);
        let count = index.stations.len();

        let mut guard = self.inner.write().await;
        *guard = index;

        Ok(count)
    }
}

async fn fetch_records(
    client: &CachedMetroClient,
    disk_cache: Option<&StationCache>,
) -> Result<Vec<StationRecord>, StationError> {
    let records = client.stations().await?;
    if records.is_empty() {
        return Err(StationError::Empty);
    }

    if let Some(cache) = disk_cache
        && let Err(e) = cache.save(&records)
    {
        warn!(error = %e, path = ?cache.path(), "failed to write station cache");
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockMetroClient;
    use crate::cache::{Backend, CacheConfig};
    use crate::stations::StationCacheConfig;
    use std::path::Path;

    fn record(id: &str, cn: &str, en: &str, line: i64, assoc: &[u16]) -> StationRecord {
        StationRecord {
            station_id: id.to_string(),
            name_cn: cn.to_string(),
            name_en: en.to_string(),
            line_id: Some(line),
            associated_lines: assoc.iter().map(|&n| LineId::new(n).unwrap()).collect(),
        }
    }

    fn nums(lines: &[LineId]) -> Vec<u16> {
        lines.iter().map(LineId::get).collect()
    }

    fn mock_client() -> Arc<CachedMetroClient> {
        let mock = MockMetroClient::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("data/mock"))
            .unwrap();
        Arc::new(CachedMetroClient::new(
            Backend::Mock(mock),
            &CacheConfig::default(),
        ))
    }

    #[test]
    fn build_merges_per_line_records() {
        let index = Index::build(vec![
            record("0112", "人民广场", "People's Square", 1, &[]),
            record("0212", "人民广场", "People's Square", 2, &[8]),
            record("0214", "陆家嘴", "Lujiazui", 2, &[14]),
            record("x", "", "", 3, &[]),
        ]);

        assert_eq!(index.stations.len(), 2);
        let square = index.lookup("人民广场").unwrap();
        assert_eq!(square.id, "0112");
        assert_eq!(nums(&square.lines), vec![1, 2, 8]);
        assert!(square.is_transfer());
    }

    #[test]
    fn lookup_is_case_insensitive_in_both_languages() {
        let index = Index::build(vec![record("0214", "陆家嘴", "Lujiazui", 2, &[])]);
        assert_eq!(index.lookup("lujiazui").unwrap().id, "0214");
        assert_eq!(index.lookup(" LUJIAZUI ").unwrap().id, "0214");
        assert_eq!(index.lookup("陆家嘴").unwrap().id, "0214");
        assert!(index.lookup("陆家").is_none());
    }

    #[test]
    fn search_ranks_prefix_then_substring() {
        let index = Index::build(vec![
            record("1", "南京东路", "East Nanjing Road", 2, &[]),
            record("2", "南京西路", "West Nanjing Road", 2, &[]),
            record("3", "东南京路口", "Dongnanjing Lukou", 9, &[]),
            record("4", "南翔", "Nanxiang", 11, &[]),
        ]);

        let names: Vec<String> = index
            .search("南京", 10)
            .iter()
            .map(|s| s.name.cn().to_string())
            .collect();
        assert_eq!(names, vec!["南京东路", "南京西路", "东南京路口"]);

        let names: Vec<String> = index
            .search("nan", 2)
            .iter()
            .map(|s| s.name.cn().to_string())
            .collect();
        assert_eq!(names, vec!["南翔", "南京东路"]);
    }

    #[test]
    fn empty_query_finds_nothing() {
        let index = Index::build(vec![record("1", "南翔", "Nanxiang", 11, &[])]);
        assert!(index.search("  ", 10).is_empty());
        assert!(index.search("南", 0).is_empty());
    }

    #[tokio::test]
    async fn fetch_from_mock_and_write_disk_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = StationCache::new(StationCacheConfig::new(
            dir.path().join("stations.json"),
            "mock:test",
        ));

        let directory = StationDirectory::fetch(mock_client(), Some(cache.clone()))
            .await
            .unwrap();
        assert!(!directory.is_empty().await);
        assert!(directory.lookup("people's square").await.is_some());
        assert!(cache.load().is_some());
    }

    #[tokio::test]
    async fn fresh_disk_cache_wins_over_backend() {
        let dir = tempfile::tempdir().unwrap();
        let cache = StationCache::new(StationCacheConfig::new(
            dir.path().join("stations.json"),
            "mock:test",
        ));
        cache
            .save(&[record("9", "只在缓存", "Cache Only", 1, &[])])
            .unwrap();

        let directory = StationDirectory::fetch(mock_client(), Some(cache))
            .await
            .unwrap();
        assert_eq!(directory.len().await, 1);
        assert!(directory.lookup("cache only").await.is_some());
    }

    #[tokio::test]
    async fn snapshot_from_another_backend_is_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stations.json");
        StationCache::new(StationCacheConfig::new(&path, "http://old.backend"))
            .save(&[record("9", "只在缓存", "Cache Only", 1, &[])])
            .unwrap();

        let cache = StationCache::new(StationCacheConfig::new(&path, "mock:test"));
        let directory = StationDirectory::fetch(mock_client(), Some(cache.clone()))
            .await
            .unwrap();
        assert!(directory.lookup("cache only").await.is_none());
        assert!(directory.lookup("人民广场").await.is_some());
        assert!(cache.load().is_some());
    }

    #[tokio::test]
    async fn refresh_replaces_empty_directory() {
        let directory = StationDirectory::empty(mock_client(), None);
        assert!(directory.lookup("人民广场").await.is_none());

        let count = directory.refresh().await.unwrap();
        assert!(count > 0);
        assert_eq!(directory.len().await, count);
        assert!(directory.lookup("人民广场").await.is_some());
    }
}
