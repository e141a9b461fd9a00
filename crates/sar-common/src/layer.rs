//! Layer identifiers.

use serde::{Deserialize, Serialize};

/// Unique identifier for a layer in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier for a Sentinel-1 layer keyed by acquisition date
    /// (e.g. "sentinel1-2023-03-29").
    ///
    /// Reprocessing any archive acquired on the same date yields the same id.
    pub fn sentinel1(date_key: &str) -> Self {
        Self(format!("sentinel1-{}", date_key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LayerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel1_id() {
        assert_eq!(LayerId::sentinel1("2023-03-29").as_str(), "sentinel1-2023-03-29");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&LayerId::new("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }
}
