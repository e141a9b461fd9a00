//! Zoom level ranges for tile pyramids.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Highest zoom level accepted for a tile pyramid.
pub const MAX_ZOOM: u8 = 24;

/// An inclusive `low-high` range of web-map zoom levels.
///
/// Always satisfies `min <= max <= MAX_ZOOM`. Serializes as the `"10-15"`
/// string form used on the tiling tool's command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZoomRange {
    min: u8,
    max: u8,
}

impl ZoomRange {
    pub fn new(min: u8, max: u8) -> Result<Self, ZoomRangeError> {
        if min > max {
            return Err(ZoomRangeError::Inverted { min, max });
        }
        if max > MAX_ZOOM {
            return Err(ZoomRangeError::OutOfRange(max));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u8 {
        self.min
    }

    pub fn max(&self) -> u8 {
        self.max
    }
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self { min: 10, max: 15 }
    }
}

impl fmt::Display for ZoomRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

impl FromStr for ZoomRange {
    type Err = ZoomRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (low, high) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| ZoomRangeError::InvalidFormat(s.to_string()))?;

        let parse = |v: &str| {
            v.trim()
                .parse::<u8>()
                .map_err(|_| ZoomRangeError::InvalidFormat(s.to_string()))
        };

        Self::new(parse(low)?, parse(high)?)
    }
}

impl Serialize for ZoomRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ZoomRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ZoomRangeError {
    #[error("Invalid zoom range: {0}. Expected 'low-high'")]
    InvalidFormat(String),

    #[error("Zoom range low {min} is greater than high {max}")]
    Inverted { min: u8, max: u8 },

    #[error("Zoom level {0} exceeds maximum of {}", MAX_ZOOM)]
    OutOfRange(u8),
}
