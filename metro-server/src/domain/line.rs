//! Metro line identifiers.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::DomainError;

/// Colour used for lines outside the known network.
pub const FALLBACK_COLOR: &str = "#666666";

/// Official line colours, indexed by line number minus one.
const LINE_COLORS: [&str; 18] = [
    "#E4002B", // 1
    "#00AD56", // 2
    "#FFD100", // 3
    "#5F259F", // 4
    "#9A48A0", // 5
    "#D9027D", // 6
    "#F3965E", // 7
    "#009FDB", // 8
    "#71C5E8", // 9
    "#C8ACD6", // 10
    "#8B1538", // 11
    "#007B5F", // 12
    "#EC91C4", // 13
    "#82C0C0", // 14
    "#68217A", // 15
    "#32D0C6", // 16
    "#C4A484", // 17
    "#D4A574", // 18
];

/// A metro line number.
///
/// Line numbers are always positive. This type guarantees that any `LineId`
/// value is non-zero by construction.
///
/// # Examples
///
/// ```
/// use metro_server::domain::LineId;
///
/// let line = LineId::new(8).unwrap();
/// assert_eq!(line.get(), 8);
/// assert_eq!(line.color_hex(), "#009FDB");
/// assert_eq!(line.name_cn(), "8号线");
///
/// assert!(LineId::new(0).is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineId(u16);

impl LineId {
    /// Create a line id, rejecting zero.
    pub fn new(n: u16) -> Result<Self, DomainError> {
        if n == 0 {
            return Err(DomainError::InvalidLine(n.into()));
        }
        Ok(Self(n))
    }

    /// Create a line id from a wider integer, as found in JSON payloads.
    pub fn from_i64(n: i64) -> Result<Self, DomainError> {
        u16::try_from(n)
            .map_err(|_| DomainError::InvalidLine(n))
            .and_then(Self::new)
    }

    /// Returns the line number.
    pub fn get(&self) -> u16 {
        self.0
    }

    /// Hex display colour for the line.
    pub fn color_hex(&self) -> &'static str {
        LINE_COLORS
            .get(usize::from(self.0) - 1)
            .copied()
            .unwrap_or(FALLBACK_COLOR)
    }

    /// Chinese display name, e.g. "8号线".
    pub fn name_cn(&self) -> String {
        format!("{}号线", self.0)
    }

    /// English display name, e.g. "Line 8".
    pub fn name_en(&self) -> String {
        format!("Line {}", self.0)
    }

    /// Parse a comma-separated list such as `"1, 2,8"`.
    ///
    /// Non-numeric and zero entries are skipped. The result is sorted and
    /// free of duplicates.
    pub fn parse_list(s: &str) -> Vec<LineId> {
        let mut lines: Vec<LineId> = s
            .split(',')
            .filter_map(|part| part.trim().parse::<u16>().ok())
            .filter_map(|n| LineId::new(n).ok())
            .collect();
        lines.sort_unstable();
        lines.dedup();
        lines
    }
}

impl fmt::Debug for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LineId({})", self.0)
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for LineId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.0)
    }
}

impl<'de> Deserialize<'de> for LineId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let n = u16::deserialize(deserializer)?;
        LineId::new(n).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero() {
        assert!(LineId::new(0).is_err());
        assert!(LineId::new(1).is_ok());
    }

    #[test]
    fn from_i64_range() {
        assert!(LineId::from_i64(-1).is_err());
        assert!(LineId::from_i64(70_000).is_err());
        assert_eq!(LineId::from_i64(11).unwrap().get(), 11);
    }

    #[test]
    fn known_colors() {
        assert_eq!(LineId::new(1).unwrap().color_hex(), "#E4002B");
        assert_eq!(LineId::new(18).unwrap().color_hex(), "#D4A574");
    }

    #[test]
    fn unknown_line_is_grey() {
        assert_eq!(LineId::new(19).unwrap().color_hex(), FALLBACK_COLOR);
        assert_eq!(LineId::new(99).unwrap().color_hex(), FALLBACK_COLOR);
    }

    #[test]
    fn display_names() {
        let line = LineId::new(10).unwrap();
        assert_eq!(line.name_cn(), "10号线");
        assert_eq!(line.name_en(), "Line 10");
        assert_eq!(line.to_string(), "10");
        assert_eq!(format!("{:?}", line), "LineId(10)");
    }

    #[test]
    fn parse_list_sorts_and_dedups() {
        let lines = LineId::parse_list("8, 1,2 ,8");
        let nums: Vec<u16> = lines.iter().map(LineId::get).collect();
        assert_eq!(nums, vec![1, 2, 8]);
    }

    #[test]
    fn parse_list_skips_junk() {
        let lines = LineId::parse_list("1,,x, 0 ,3");
        let nums: Vec<u16> = lines.iter().map(LineId::get).collect();
        assert_eq!(nums, vec![1, 3]);
        assert!(LineId::parse_list("").is_empty());
    }

    #[test]
    fn serde_roundtrip_rejects_zero() {
        let line: LineId = serde_json::from_str("4").unwrap();
        assert_eq!(line.get(), 4);
        assert_eq!(serde_json::to_string(&line).unwrap(), "4");
        assert!(serde_json::from_str::<LineId>("0").is_err());
    }
}
