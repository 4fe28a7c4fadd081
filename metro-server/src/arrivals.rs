//! Arrival boards.
//!
//! Flattens the two arrival shapes the backend serves, next-train
//! predictions per line and direction and the per-station arrival-time
//! list, into one sorted board.

use std::cmp::Ordering;
use std::fmt;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use tracing::warn;

use crate::backend::{ArrivalInfoRecord, NextTrainsResponse, TrainArrival};
use crate::domain::LineId;

/// Service status text for a suspended line.
const NOT_OPERATING: &str = "停运";

/// Next-train timestamps, e.g. `2025-04-15 08:03:00`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const LINE_KEY_PREFIX: &str = "Line_";

/// What the rider should be told about a train.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalStatus {
    /// Due within a minute.
    Arriving,
    /// Due in this many minutes.
    InMinutes(u32),
    /// The line is not running.
    NotOperating,
    /// The backend gave no usable time.
    Unknown,
}

impl ArrivalStatus {
    /// Status for a train `minutes` away.
    pub fn from_minutes(minutes: u32) -> Self {
        if minutes <= 1 {
            ArrivalStatus::Arriving
        } else {
            ArrivalStatus::InMinutes(minutes)
        }
    }

    /// Chinese status text.
    pub fn label_cn(&self) -> String {
        match self {
            ArrivalStatus::Arriving => "即将到站".to_string(),
            ArrivalStatus::InMinutes(n) => format!("{n}分钟"),
            ArrivalStatus::NotOperating => NOT_OPERATING.to_string(),
            ArrivalStatus::Unknown => "--".to_string(),
        }
    }
}

impl fmt::Display for ArrivalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label_cn())
    }
}

/// One row of an arrival board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrivalRow {
    pub line: LineId,
    /// Terminus or direction description.
    pub direction: String,
    pub train_number: Option<String>,
    /// Expected arrival time of the first train.
    pub expected: Option<NaiveTime>,
    /// Expected arrival time of the train after it.
    pub next: Option<NaiveTime>,
    pub minutes_remaining: Option<u32>,
    pub status: ArrivalStatus,
}

/// Upcoming trains at a station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrivalBoard {
    pub station: String,
    pub rows: Vec<ArrivalRow>,
}

impl ArrivalBoard {
    /// Build a board from a next-trains response.
    ///
    /// Times arrive as `YYYY-MM-DD HH:MM:SS`; a full timestamp already
    /// past counts as arriving now. Bare clock times earlier than `now`
    /// are taken to be tomorrow. Trains with an unparseable time or line
    /// are skipped.
    pub fn from_next_trains(response: &NextTrainsResponse, now: NaiveDateTime) -> Self {
        let mut keyed: Vec<(LineId, i64, ArrivalRow)> = Vec::new();

        for (key, directions) in &response.lines {
            let trains = directions
                .up_direction
                .iter()
                .chain(directions.down_direction.iter());

            for train in trains {
                let Some(line) = train_line(key, train) else {
                    warn!(line = %key, train = %train.train_number, "skipping train with unknown line");
                    continue;
                };

                let Some(expected) = parse_expected(&train.expected_arrival_time, now) else {
                    warn!(
                        line = %line,
                        time = %train.expected_arrival_time,
                        "skipping train with unparseable arrival time"
                    );
                    continue;
                };

                let seconds = (expected - now).num_seconds().max(0);
                let minutes = u32::try_from(seconds / 60).unwrap_or(u32::MAX);
                let train_number = Some(train.train_number.clone()).filter(|t| !t.is_empty());

                keyed.push((
                    line,
                    seconds,
                    ArrivalRow {
                        line,
                        direction: train.direction.trim().to_string(),
                        train_number,
                        expected: Some(expected.time()),
                        next: None,
                        minutes_remaining: Some(minutes),
                        status: ArrivalStatus::from_minutes(minutes),
                    },
                ));
            }
        }

        keyed.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        Self {
            station: response.station_name.trim().to_string(),
            rows: keyed.into_iter().map(|(_, _, row)| row).collect(),
        }
    }

    /// Build a board from the per-station arrival-time list.
    ///
    /// The backend's `minutes_remaining` is kept as given.
    pub fn from_arrival_infos(station: &str, infos: &[ArrivalInfoRecord]) -> Self {
        let mut rows: Vec<ArrivalRow> = infos
            .iter()
            .filter_map(|info| {
                let Some(line) = info.line_id.and_then(|n| LineId::from_i64(n).ok()) else {
                    warn!(station = %info.station_id, "skipping arrival with unknown line");
                    return None;
                };

                let minutes_remaining = info
                    .minutes_remaining
                    .map(|m| u32::try_from(m.max(0)).unwrap_or(u32::MAX));

                let status = if !is_operating(info) {
                    ArrivalStatus::NotOperating
                } else {
                    minutes_remaining
                        .map(ArrivalStatus::from_minutes)
                        .unwrap_or(ArrivalStatus::Unknown)
                };

                Some(ArrivalRow {
                    line,
                    direction: info.direction_desc.trim().to_string(),
                    train_number: None,
                    expected: info.first_arrival_time.as_deref().and_then(parse_clock),
                    next: info.next_arrival_time.as_deref().and_then(parse_clock),
                    minutes_remaining,
                    status,
                })
            })
            .collect();

        rows.sort_by(|a, b| {
            a.line
                .cmp(&b.line)
                .then_with(|| cmp_minutes(a.minutes_remaining, b.minutes_remaining))
                .then_with(|| a.direction.cmp(&b.direction))
        });

        let station = infos
            .iter()
            .map(|i| i.station_name.trim())
            .find(|n| !n.is_empty())
            .unwrap_or(station)
            .to_string();

        Self { station, rows }
    }

    /// Fill lines missing from this board with rows from `other`.
    ///
    /// Live predictions take precedence; the timetable-based list covers
    /// lines the prediction service does not report.
    pub fn fill_from(mut self, other: ArrivalBoard) -> Self {
        let missing: Vec<ArrivalRow> = other
            .rows
            .into_iter()
            .filter(|row| !self.rows.iter().any(|r| r.line == row.line))
            .collect();

        if !missing.is_empty() {
            self.rows.extend(missing);
            // Stable sort keeps each source's internal order
            self.rows.sort_by_key(|r| r.line);
        }
        if self.station.is_empty() {
            self.station = other.station;
        }
        self
    }

    /// Lines present on the board, ascending.
    pub fn lines(&self) -> Vec<LineId> {
        let mut lines: Vec<LineId> = self.rows.iter().map(|r| r.line).collect();
        lines.dedup();
        lines
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parse `HH:MM:SS` or `HH:MM`.
pub fn parse_clock(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

/// Parse a next-train timestamp into an absolute time.
fn parse_expected(s: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(at) = NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT) {
        return Some(at);
    }
    parse_clock(s).map(|time| next_occurrence(now, time))
}

/// Line number from a `Line_2` or `2` key, else the train's own field.
fn train_line(key: &str, train: &TrainArrival) -> Option<LineId> {
    let key = key.trim();
    key.strip_prefix(LINE_KEY_PREFIX)
        .unwrap_or(key)
        .parse::<i64>()
        .ok()
        .or(train.line_id)
        .and_then(|n| LineId::from_i64(n).ok())
}

fn next_occurrence(now: NaiveDateTime, time: NaiveTime) -> NaiveDateTime {
    let expected = now.date().and_time(time);
    if expected < now {
        expected + Duration::days(1)
    } else {
        expected
    }
}

fn is_operating(info: &ArrivalInfoRecord) -> bool {
    if info.is_operating == Some(false) {
        return false;
    }
    !info
        .service_status
        .as_deref()
        .is_some_and(|s| s.contains(NOT_OPERATING))
}

fn cmp_minutes(a: Option<u32>, b: Option<u32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 4, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn next_trains(json: &str) -> NextTrainsResponse {
        serde_json::from_str(json).unwrap()
    }

    fn info(line: i64, direction: &str, minutes: Option<i64>) -> ArrivalInfoRecord {
        ArrivalInfoRecord {
            line_id: Some(line),
            station_id: "0112".to_string(),
            station_name: "人民广场".to_string(),
            line_name: None,
            direction_desc: direction.to_string(),
            first_arrival_time: Some("08:05".to_string()),
            next_arrival_time: Some("08:09".to_string()),
            minutes_remaining: minutes,
            first_train: None,
            last_train: None,
            is_operating: None,
            service_status: None,
        }
    }

    #[test]
    fn parses_both_clock_formats() {
        assert_eq!(parse_clock("08:03:30"), NaiveTime::from_hms_opt(8, 3, 30));
        assert_eq!(parse_clock(" 08:03 "), NaiveTime::from_hms_opt(8, 3, 0));
        assert_eq!(parse_clock("8h03"), None);
        assert_eq!(parse_clock("25:00"), None);
    }

    #[test]
    fn next_trains_sorted_by_line_then_time() {
        let resp = next_trains(
            r#"{"station_name": "人民广场", "lines": {
                "8": {"up_direction": [{"train_number": "T801", "direction": "沈杜公路",
                        "expected_arrival_time": "08:10:00"}]},
                "2": {"up_direction": [{"train_number": "T202", "direction": "徐泾东",
                        "expected_arrival_time": "08:09"}],
                      "down_direction": [{"train_number": "T201", "direction": "浦东国际机场",
                        "expected_arrival_time": "08:01:00"}]}
            }}"#,
        );

        let board = ArrivalBoard::from_next_trains(&resp, at(8, 0));
        assert_eq!(board.station, "人民广场");
        let trains: Vec<&str> = board
            .rows
            .iter()
            .map(|r| r.train_number.as_deref().unwrap())
            .collect();
        assert_eq!(trains, vec!["T201", "T202", "T801"]);
        assert_eq!(board.rows[0].status, ArrivalStatus::Arriving);
        assert_eq!(board.rows[1].minutes_remaining, Some(9));
        assert_eq!(board.rows[1].status.label_cn(), "9分钟");
        assert_eq!(board.lines().iter().map(LineId::get).collect::<Vec<_>>(), vec![2, 8]);
    }

    #[test]
    fn full_timestamps_under_prefixed_line_keys() {
        let resp = next_trains(
            r#"{"station_name": "人民广场", "lines": {"Line_1": {"up_direction": [
                {"train_number": "T101", "direction": "富锦路",
                 "expected_arrival_time": "2025-04-15 08:03:00"}
            ]}}}"#,
        );
        let board = ArrivalBoard::from_next_trains(&resp, at(8, 0));
        assert_eq!(board.rows.len(), 1);
        assert_eq!(board.rows[0].line.get(), 1);
        assert_eq!(board.rows[0].minutes_remaining, Some(3));
        assert_eq!(board.rows[0].expected, NaiveTime::from_hms_opt(8, 3, 0));
    }

    #[test]
    fn departed_timestamp_is_arriving_not_tomorrow() {
        let resp = next_trains(
            r#"{"station_name": "人民广场", "lines": {"Line_2": {"down_direction": [
                {"train_number": "T201", "expected_arrival_time": "2025-04-15 07:59:30"}
            ]}}}"#,
        );
        let board = ArrivalBoard::from_next_trains(&resp, at(8, 0));
        assert_eq!(board.rows[0].minutes_remaining, Some(0));
        assert_eq!(board.rows[0].status, ArrivalStatus::Arriving);
    }

    #[test]
    fn past_time_rolls_to_next_day() {
        let resp = next_trains(
            r#"{"station_name": "莘庄", "lines": {"1": {"up_direction": [
                {"train_number": "T1", "direction": "富锦路", "expected_arrival_time": "00:05"}
            ]}}}"#,
        );
        let board = ArrivalBoard::from_next_trains(&resp, at(23, 55));
        assert_eq!(board.rows[0].minutes_remaining, Some(10));
    }

    #[test]
    fn bad_times_are_skipped() {
        let resp = next_trains(
            r#"{"station_name": "莘庄", "lines": {"1": {"up_direction": [
                {"train_number": "T1", "expected_arrival_time": "soon"},
                {"train_number": "T2", "expected_arrival_time": "08:30"}
            ]}, "x": {"up_direction": [
                {"train_number": "T3", "expected_arrival_time": "08:30"}
            ]}}}"#,
        );
        let board = ArrivalBoard::from_next_trains(&resp, at(8, 0));
        assert_eq!(board.rows.len(), 1);
        assert_eq!(board.rows[0].train_number.as_deref(), Some("T2"));
    }

    #[test]
    fn line_falls_back_to_train_field() {
        let resp = next_trains(
            r#"{"station_name": "莘庄", "lines": {"north": {"up_direction": [
                {"train_number": "T1", "expected_arrival_time": "08:30", "line_id": 5}
            ]}}}"#,
        );
        let board = ArrivalBoard::from_next_trains(&resp, at(8, 0));
        assert_eq!(board.rows[0].line.get(), 5);
    }

    #[test]
    fn arrival_infos_keep_backend_minutes() {
        let board = ArrivalBoard::from_arrival_infos(
            "ignored",
            &[
                info(2, "浦东国际机场", Some(6)),
                info(1, "富锦路", Some(0)),
                info(2, "徐泾东", Some(3)),
                info(2, "徐泾东", None),
            ],
        );

        assert_eq!(board.station, "人民广场");
        let minutes: Vec<Option<u32>> = board.rows.iter().map(|r| r.minutes_remaining).collect();
        assert_eq!(minutes, vec![Some(0), Some(3), Some(6), None]);
        assert_eq!(board.rows[0].status.label_cn(), "即将到站");
        assert_eq!(board.rows[3].status, ArrivalStatus::Unknown);
        assert_eq!(board.rows[0].next, NaiveTime::from_hms_opt(8, 9, 0));
    }

    #[test]
    fn suspended_lines_show_not_operating() {
        let mut closed = info(3, "江杨北路", Some(4));
        closed.is_operating = Some(false);
        let mut status_only = info(4, "内圈", Some(2));
        status_only.service_status = Some("停运".to_string());

        let board = ArrivalBoard::from_arrival_infos("", &[closed, status_only]);
        assert!(board.rows.iter().all(|r| r.status == ArrivalStatus::NotOperating));
        assert_eq!(board.rows[0].status.to_string(), "停运");
    }

    #[test]
    fn fill_from_adds_only_missing_lines() {
        let resp = next_trains(
            r#"{"station_name": "人民广场", "lines": {"2": {"up_direction": [
                {"train_number": "T2", "direction": "徐泾东", "expected_arrival_time": "08:05"}
            ]}}}"#,
        );
        let live = ArrivalBoard::from_next_trains(&resp, at(8, 0));
        let timetable = ArrivalBoard::from_arrival_infos(
            "人民广场",
            &[info(1, "富锦路", Some(2)), info(2, "徐泾东", Some(4))],
        );

        let board = live.fill_from(timetable);
        assert_eq!(board.rows.len(), 2);
        assert_eq!(board.rows[0].line.get(), 1);
        assert_eq!(board.rows[1].train_number.as_deref(), Some("T2"));
    }
}
