//! Acquisition identity extraction from Sentinel-1 archive names.
//!
//! Archive names follow a fixed, underscore-delimited grammar:
//!
//! ```text
//! S1A_IW_GRDH_1SDV_20230329T233419_20230329T233444_047865_05C06C_0883
//! ^   ^  ^    ^    ^
//! |   |  |    |    acquisition start (YYYYMMDDTHHMMSS)
//! |   |  |    product class / polarisation (ignored)
//! |   |  product type
//! |   acquisition mode
//! satellite
//! ```
//!
//! Only the first five fields are interpreted. Everything after them is kept
//! solely as part of the granule id.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::warn;

use crate::error::{IngestionError, Result};

/// Delimiter between positional fields.
pub const FIELD_DELIMITER: char = '_';

/// Separator between the date and time portions of the start token.
pub const DATE_TIME_SEPARATOR: char = 'T';

/// Position of the acquisition start token.
const START_TOKEN_INDEX: usize = 4;

/// Structured metadata derived from an archive's base filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionIdentity {
    /// Platform code (S1A, S1B, ...)
    pub satellite: String,
    /// Acquisition mode (IW, EW, SM, WV)
    pub mode: String,
    /// Product type (GRDH, SLC, ...)
    pub product_type: String,
    /// Full base filename
    pub granule_id: String,
    /// Acquisition start. Date and time are parsed from one token, so they
    /// are either both known or both absent.
    acquired_at: Option<NaiveDateTime>,
}

impl AcquisitionIdentity {
    /// Acquisition date as `YYYY-MM-DD`.
    pub fn acquisition_date_string(&self) -> Option<String> {
        self.acquired_at.map(|dt| dt.format("%Y-%m-%d").to_string())
    }

    /// Acquisition time as `HH:MM:SSZ` (UTC).
    pub fn acquisition_time_string(&self) -> Option<String> {
        self.acquired_at.map(|dt| dt.format("%H:%M:%SZ").to_string())
    }

    /// True when the name carried no usable acquisition start.
    pub fn is_degraded(&self) -> bool {
        self.acquired_at.is_none()
    }

    /// Key used for layer ids and directory names: the acquisition date, or
    /// the granule id when the date is unknown.
    pub fn layer_key(&self) -> String {
        self.acquisition_date_string()
            .unwrap_or_else(|| self.granule_id.clone())
    }

    /// Human-readable layer name, e.g. "Sentinel-1A - 2023-03-29".
    pub fn display_name(&self) -> String {
        let unit = self.satellite.chars().last().map(String::from).unwrap_or_default();
        format!("Sentinel-1{} - {}", unit, self.layer_key())
    }
}

/// Extract the acquisition identity from an archive path or filename.
///
/// Directory components and the final extension are stripped first. Fewer
/// than three fields is an error; a missing or unparseable fifth field only
/// leaves the acquisition date and time unset.
pub fn extract_identity(name: &str) -> Result<AcquisitionIdentity> {
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    let malformed = |reason: &str| IngestionError::MalformedIdentity {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let parts: Vec<&str> = stem.split(FIELD_DELIMITER).collect();
    if parts.len() < 3 {
        return Err(malformed(&format!(
            "expected at least 3 '{}'-separated fields, found {}",
            FIELD_DELIMITER,
            parts.len()
        )));
    }

    let acquired_at = parts
        .get(START_TOKEN_INDEX)
        .and_then(|token| parse_start_token(token, stem));

    Ok(AcquisitionIdentity {
        satellite: parts[0].to_string(),
        mode: parts[1].to_string(),
        product_type: parts[2].to_string(),
        granule_id: stem.to_string(),
        acquired_at,
    })
}

/// Parse `YYYYMMDDTHHMMSS`. Returns `None` when the separator is absent or
/// the digits do not form a valid date and time.
fn parse_start_token(token: &str, granule: &str) -> Option<NaiveDateTime> {
    let (date_part, time_part) = token.split_once(DATE_TIME_SEPARATOR)?;

    let parsed = parse_date(date_part).zip(parse_time(time_part));
    if parsed.is_none() {
        warn!(
            granule = %granule,
            token = %token,
            "Acquisition start token is not YYYYMMDDTHHMMSS, leaving date unset"
        );
    }
    parsed.map(|(date, time)| NaiveDateTime::new(date, time))
}

fn digits(s: &str, range: std::ops::Range<usize>) -> Option<u32> {
    let part = s.get(range)?;
    if !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 {
        return None;
    }
    let year = digits(s, 0..4)? as i32;
    NaiveDate::from_ymd_opt(year, digits(s, 4..6)?, digits(s, 6..8)?)
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(digits(s, 0..2)?, digits(s, 2..4)?, digits(s, 4..6)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRANULE: &str =
        "S1A_IW_GRDH_1SDV_20230329T233419_20230329T233444_047865_05C06C_0883";

    #[test]
    fn test_full_sentinel1_name() {
        let id = extract_identity(&format!("src/data/{}.zip", GRANULE)).unwrap();
        assert_eq!(id.satellite, "S1A");
        assert_eq!(id.mode, "IW");
        assert_eq!(id.product_type, "GRDH");
        assert_eq!(id.granule_id, GRANULE);
        assert_eq!(id.acquisition_date_string().as_deref(), Some("2023-03-29"));
        assert_eq!(id.acquisition_time_string().as_deref(), Some("23:34:19Z"));
        assert!(!id.is_degraded());
    }

    #[test]
    fn test_three_fields_is_degraded_not_error() {
        let id = extract_identity("A_B_C").unwrap();
        assert_eq!(id.satellite, "A");
        assert_eq!(id.mode, "B");
        assert_eq!(id.product_type, "C");
        assert_eq!(id.acquisition_date_string(), None);
        assert_eq!(id.acquisition_time_string(), None);
        assert!(id.is_degraded());
    }

    #[test]
    fn test_fewer_than_three_fields_is_malformed() {
        for name in ["", "S1A", "S1A_IW", "S1A_IW.zip"] {
            assert!(
                matches!(
                    extract_identity(name),
                    Err(IngestionError::MalformedIdentity { .. })
                ),
                "expected malformed identity for {:?}",
                name
            );
        }
    }

    #[test]
    fn test_empty_fields_are_kept() {
        let id = extract_identity("S1A__GRDH_1SDV").unwrap();
        assert_eq!(id.satellite, "S1A");
        assert_eq!(id.mode, "");
        assert_eq!(id.product_type, "GRDH");

        let id = extract_identity("__").unwrap();
        assert_eq!(id.satellite, "");
        assert_eq!(id.display_name(), "Sentinel-1 - __");
    }

    #[test]
    fn test_fifth_field_without_separator() {
        let id = extract_identity("S1A_IW_GRDH_1SDV_20230329").unwrap();
        assert!(id.is_degraded());
        assert_eq!(id.product_type, "GRDH");
    }

    #[test]
    fn test_fifth_field_with_bad_digits() {
        assert!(extract_identity("S1A_IW_GRDH_1SDV_2023XX29T233419").unwrap().is_degraded());
        assert!(extract_identity("S1A_IW_GRDH_1SDV_20231329T233419").unwrap().is_degraded());
        assert!(extract_identity("S1A_IW_GRDH_1SDV_20230329T2534").unwrap().is_degraded());
    }

    #[test]
    fn test_four_fields() {
        let id = extract_identity("S1B_EW_GRDM_1SDH").unwrap();
        assert_eq!(id.satellite, "S1B");
        assert!(id.is_degraded());
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(extract_identity(GRANULE).unwrap(), extract_identity(GRANULE).unwrap());
    }

    #[test]
    fn test_layer_key_and_display_name() {
        let id = extract_identity(GRANULE).unwrap();
        assert_eq!(id.layer_key(), "2023-03-29");
        assert_eq!(id.display_name(), "Sentinel-1A - 2023-03-29");

        let degraded = extract_identity("S1B_IW_GRDH").unwrap();
        assert_eq!(degraded.layer_key(), "S1B_IW_GRDH");
        assert_eq!(degraded.display_name(), "Sentinel-1B - S1B_IW_GRDH");
    }
}
