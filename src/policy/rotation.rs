//! # Rotation Staleness
//!
//! Fail-closed check of the `lastRotated` annotation.

use crate::constants::LAST_ROTATED_ANNOTATION;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

/// Whether rotation is overdue
///
/// A missing or unparseable `lastRotated` timestamp counts as expired.
#[must_use]
pub fn rotation_expired(
    annotations: Option<&BTreeMap<String, String>>,
    interval_days: i32,
    now: DateTime<Utc>,
) -> bool {
    let Some(raw) = annotations.and_then(|a| a.get(LAST_ROTATED_ANNOTATION)) else {
        return true;
    };
    match DateTime::parse_from_rfc3339(raw) {
        Ok(last_rotated) => {
            now.signed_duration_since(last_rotated) > Duration::days(i64::from(interval_days))
        }
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotated(value: &str) -> BTreeMap<String, String> {
        BTreeMap::from([(LAST_ROTATED_ANNOTATION.to_string(), value.to_string())])
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_missing_annotation_is_expired() {
        assert!(rotation_expired(None, 365, now()));
        assert!(rotation_expired(Some(&BTreeMap::new()), 365, now()));
    }

    #[test]
    fn test_malformed_timestamp_is_expired() {
        assert!(rotation_expired(Some(&annotated("yesterday")), 365, now()));
        assert!(rotation_expired(Some(&annotated("")), 365, now()));
        assert!(rotation_expired(Some(&annotated("2025-06-15")), 365, now()));
    }

    #[test]
    fn test_recent_rotation_is_fresh() {
        assert!(!rotation_expired(
            Some(&annotated("2025-06-10T12:00:00Z")),
            30,
            now()
        ));
    }

    #[test]
    fn test_old_rotation_is_expired() {
        assert!(rotation_expired(
            Some(&annotated("2025-04-01T00:00:00Z")),
            30,
            now()
        ));
    }

    #[test]
    fn test_boundary_is_exclusive() {
        // Exactly intervalDays old is not yet overdue
        assert!(!rotation_expired(
            Some(&annotated("2025-06-14T12:00:00Z")),
            1,
            now()
        ));
        assert!(rotation_expired(
            Some(&annotated("2025-06-14T11:59:59Z")),
            1,
            now()
        ));
    }

    #[test]
    fn test_offset_timestamps_are_honoured() {
        // 14:00+02:00 is 12:00Z, one day before now
        assert!(!rotation_expired(
            Some(&annotated("2025-06-14T14:00:00+02:00")),
            1,
            now()
        ));
    }
}
