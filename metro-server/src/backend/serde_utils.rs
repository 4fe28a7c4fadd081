//! Lenient deserializers for backend payloads.
//!
//! The MetroInfo backends are a handful of independently written services.
//! The same field arrives as a number from one and a string from another
//! (`station_id`, `line_id`), and `associated_lines` is either a JSON array
//! or a comma-separated string. These helpers accept every shape observed.

use serde::{Deserialize, Deserializer};

use crate::domain::LineId;

#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrStr {
    Int(i64),
    Float(f64),
    Str(String),
}

impl NumOrStr {
    fn as_i64(&self) -> Option<i64> {
        match self {
            NumOrStr::Int(n) => Some(*n),
            NumOrStr::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            NumOrStr::Float(_) => None,
            NumOrStr::Str(s) => s.trim().parse().ok(),
        }
    }

    fn into_string(self) -> String {
        match self {
            NumOrStr::Int(n) => n.to_string(),
            NumOrStr::Float(f) => f.to_string(),
            NumOrStr::Str(s) => s.trim().to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LineListRepr {
    List(Vec<NumOrStr>),
    Single(i64),
    Csv(String),
}

/// deserialize an optional integer sent as a number or a numeric string
/// returns `None` for null or non-numeric strings
pub fn de_lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<NumOrStr>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(NumOrStr::as_i64))
}

/// deserialize an identifier sent as a number or a string
pub fn de_lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<NumOrStr>::deserialize(deserializer)?;
    Ok(value.map(NumOrStr::into_string).unwrap_or_default())
}

/// deserialize a list of line numbers from an array, a single number or a
/// comma-separated string
///
/// Invalid entries are skipped; the result is sorted and deduplicated.
pub fn de_line_list<'de, D>(deserializer: D) -> Result<Vec<LineId>, D::Error>
where
    D: Deserializer<'de>,
{
    let repr = Option::<LineListRepr>::deserialize(deserializer)?;
    let mut lines: Vec<LineId> = match repr {
        None => Vec::new(),
        Some(LineListRepr::Csv(s)) => return Ok(LineId::parse_list(&s)),
        Some(LineListRepr::Single(n)) => LineId::from_i64(n).into_iter().collect(),
        Some(LineListRepr::List(items)) => items
            .iter()
            .filter_map(NumOrStr::as_i64)
            .filter_map(|n| LineId::from_i64(n).ok())
            .collect(),
    };
    lines.sort_unstable();
    lines.dedup();
    Ok(lines)
}
