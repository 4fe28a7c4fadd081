//! Domain types for the metro client.
//!
//! Validated values shared by the normalizers and the web layer. All types
//! enforce their invariants at construction time, so code that receives
//! them can trust their validity.

mod crowd;
mod error;
mod line;
mod station;

pub use crowd::CrowdLevel;
pub use error::DomainError;
pub use line::{FALLBACK_COLOR, LineId};
pub use station::{StationName, UNKNOWN_CN, UNKNOWN_EN};
