//! Nearby-station merging.
//!
//! The location service returns one record per (station, line) pair, so an
//! interchange shows up several times. Records sharing a name are merged
//! into one station carrying the union of their lines.

use std::collections::HashMap;

use crate::backend::NearbyRecord;
use crate::domain::{LineId, StationName};

/// A station near the user, after merging.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyStation {
    /// Backend id of the closest merged record.
    pub id: String,
    pub name: StationName,
    /// Distance in metres.
    pub distance_m: f64,
    /// Every line serving the station, ascending.
    pub lines: Vec<LineId>,
}

impl NearbyStation {
    /// Whether more than one line serves this station.
    pub fn is_transfer(&self) -> bool {
        self.lines.len() > 1
    }

    /// Distance for display: metres below 1 km, otherwise km to one decimal.
    pub fn distance_label(&self) -> String {
        if self.distance_m >= 1000.0 {
            format!("{:.1}km", self.distance_m / 1000.0)
        } else {
            format!("{}m", self.distance_m.round() as u64)
        }
    }
}

/// Merge raw nearby records into one entry per station.
///
/// Records are grouped by Chinese name (English, case-insensitive, when
/// Chinese is missing). The merged entry keeps the closest member's id,
/// names and distance, and the union of every member's lines. Output is
/// sorted by distance then name, truncated to `limit` when given.
/// Nameless records are dropped.
pub fn merge_nearby(records: Vec<NearbyRecord>, limit: Option<usize>) -> Vec<NearbyStation> {
    let mut groups: HashMap<String, NearbyStation> = HashMap::new();

    for record in records {
        let name = record.name();
        let Some(key) = name.grouping_key() else {
            continue;
        };

        let mut lines = record.associated_lines.clone();
        lines.extend(record.own_line());

        let distance_m = if record.distance_m.is_finite() {
            record.distance_m.max(0.0)
        } else {
            f64::MAX
        };

        match groups.get_mut(&key) {
            Some(existing) => {
                existing.lines.extend(lines);
                if distance_m < existing.distance_m {
                    existing.id = record.stat_id;
                    existing.name = name;
                    existing.distance_m = distance_m;
                }
            }
            None => {
                groups.insert(
                    key,
                    NearbyStation {
                        id: record.stat_id,
                        name,
                        distance_m,
                        lines,
                    },
                );
            }
        }
    }

    let mut stations: Vec<NearbyStation> = groups
        .into_values()
        .map(|mut s| {
            s.lines.sort_unstable();
            s.lines.dedup();
            s
        })
        .collect();

    stations.sort_by(|a, b| {
        a.distance_m
            .total_cmp(&b.distance_m)
            .then_with(|| a.name.display_cn().cmp(b.name.display_cn()))
    });

    if let Some(limit) = limit {
        stations.truncate(limit);
    }

    stations
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_record() -> impl Strategy<Value = NearbyRecord> {
        (
            0usize..6,
            0.0f64..5000.0,
            1i64..19,
            proptest::collection::vec(1u16..19, 0..4),
        )
            .prop_map(|(name, distance, line, assoc)| NearbyRecord {
                stat_id: format!("{name}-{line}"),
                name_cn: Some(format!("站{name}")),
                distance_m: distance,
                line_id: Some(line),
                associated_lines: assoc.into_iter().map(|n| LineId::new(n).unwrap()).collect(),
                ..Default::default()
            })
    }

    proptest! {
        /// Each name appears once and carries the union of its records' lines
        #[test]
        fn names_unique_and_lines_union(records in proptest::collection::vec(arb_record(), 0..20)) {
            let merged = merge_nearby(records.clone(), None);

            let mut names: Vec<&str> = merged.iter().map(|s| s.name.cn()).collect();
            names.sort();
            let before = names.len();
            names.dedup();
            prop_assert_eq!(before, names.len());

            for station in &merged {
                let mut expected: Vec<LineId> = records
                    .iter()
                    .filter(|r| r.name_cn.as_deref() == Some(station.name.cn()))
                    .flat_map(|r| r.associated_lines.iter().copied().chain(r.own_line()))
                    .collect();
                expected.sort_unstable();
                expected.dedup();
                prop_assert_eq!(&station.lines, &expected);
            }
        }

        /// Output is ordered by distance
        #[test]
        fn sorted_by_distance(records in proptest::collection::vec(arb_record(), 0..20)) {
            let merged = merge_nearby(records, None);
            prop_assert!(merged.windows(2).all(|w| w[0].distance_m <= w[1].distance_m));
        }
    }
}
