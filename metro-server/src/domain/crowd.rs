//! Carriage crowding levels.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Head counts below this are comfortable.
const COMFORTABLE_BELOW: u32 = 15;

/// Head counts above this are crowded.
const CROWDED_ABOVE: u32 = 30;

/// Coarse occupancy of a train carriage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrowdLevel {
    Comfortable,
    Moderate,
    Crowded,
}

impl CrowdLevel {
    /// Decode the backend's 0-2 level code.
    pub fn from_code(code: u8) -> Result<Self, DomainError> {
        match code {
            0 => Ok(CrowdLevel::Comfortable),
            1 => Ok(CrowdLevel::Moderate),
            2 => Ok(CrowdLevel::Crowded),
            other => Err(DomainError::InvalidCrowdLevel(other)),
        }
    }

    /// Derive a level from the number of people counted in a carriage.
    pub fn from_person_count(count: u32) -> Self {
        if count < COMFORTABLE_BELOW {
            CrowdLevel::Comfortable
        } else if count > CROWDED_ABOVE {
            CrowdLevel::Crowded
        } else {
            CrowdLevel::Moderate
        }
    }

    /// The backend's numeric code for this level.
    pub fn code(&self) -> u8 {
        match self {
            CrowdLevel::Comfortable => 0,
            CrowdLevel::Moderate => 1,
            CrowdLevel::Crowded => 2,
        }
    }

    /// Chinese label.
    pub fn label_cn(&self) -> &'static str {
        match self {
            CrowdLevel::Comfortable => "舒适",
            CrowdLevel::Moderate => "适中",
            CrowdLevel::Crowded => "拥挤",
        }
    }
}

impl fmt::Display for CrowdLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CrowdLevel::Comfortable => "comfortable",
            CrowdLevel::Moderate => "moderate",
            CrowdLevel::Crowded => "crowded",
        };
        f.write_str(s)
    }
}
