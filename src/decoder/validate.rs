use chrono::{DateTime, Utc};
use serde::Serialize;

use super::record::Record;
use super::stream::Records;
use super::check_buffer;
use crate::telemetry::GeodeticCoordinate;

/// Outcome of the fast pre-acceptance check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Validation {
    pub is_valid: bool,
    pub reason: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub start_location: Option<GeodeticCoordinate>,
}

/// Buffer limit checks plus a short scan for the first dated sentence and
/// the first valid position fix. Stops as soon as both are found.
pub fn validate(buffer: &[u8]) -> Validation {
    if let Err(e) = check_buffer(buffer) {
        return Validation {
            is_valid: false,
            reason: Some(e.to_string()),
            start_date: None,
            start_location: None,
        };
    }

    let mut start_date = None;
    let mut start_location = None;

    for record in Records::new(buffer) {
        match record {
            Record::TrackAndSpeed {
                utc: Some(utc),
                date: Some(date),
                valid: true,
                ..
            } if start_date.is_none() => {
                start_date = Some(date.and_time(utc).and_utc());
            }
            Record::PositionFix {
                latitude,
                longitude,
                altitude_m,
                quality,
                ..
            } if quality > 0 && start_location.is_none() => {
                start_location = Some(GeodeticCoordinate::new(latitude, longitude, altitude_m));
            }
            _ => {}
        }
        if start_date.is_some() && start_location.is_some() {
            break;
        }
    }

    Validation {
        is_valid: true,
        reason: None,
        start_date,
        start_location,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{pad, sentence};
    use chrono::TimeZone;

    #[test]
    fn test_empty_buffer() {
        let v = validate(b"");
        assert!(!v.is_valid);
        assert_eq!(v.reason.as_deref(), Some("Empty log file"));
    }

    #[test]
    fn test_small_buffer() {
        let v = validate(b"$PVER");
        assert!(!v.is_valid);
        assert_eq!(v.reason.as_deref(), Some("Log file too small"));
    }

    #[test]
    fn test_large_buffer() {
        let buffer = vec![b'\n'; 16 * 1024 * 1024 + 1];
        let v = validate(&buffer);
        assert!(!v.is_valid);
        assert_eq!(v.reason.as_deref(), Some("Log file too large (>16MB)"));
    }

    #[test]
    fn test_finds_start_date_and_location() {
        let text = [
            sentence("PVER,2,1.4.0"),
            sentence("GPGGA,101500.00,,,,,0,00,99.9,,M,,M,,"),
            sentence("GPGGA,101501.00,4730.0000,N,00830.0000,E,1,08,1.1,450.0,M,,M,,"),
            sentence("GPRMC,101501.00,A,4730.0000,N,00830.0000,E,0.5,12.0,180926,,,A"),
        ]
        .join("\n");
        let v = validate(pad(text).as_bytes());

        assert!(v.is_valid);
        assert_eq!(v.reason, None);
        assert_eq!(
            v.start_date,
            Some(Utc.with_ymd_and_hms(2026, 9, 18, 10, 15, 1).unwrap())
        );
        let location = v.start_location.unwrap();
        assert!((location.latitude - 47.5).abs() < 1e-9);
        assert!((location.longitude - 8.5).abs() < 1e-9);
        assert_eq!(location.altitude, 450.0);
    }

    #[test]
    fn test_valid_without_gnss() {
        let v = validate(pad(sentence("PSFC,1200")).as_bytes());
        assert!(v.is_valid);
        assert_eq!(v.start_date, None);
        assert_eq!(v.start_location, None);
    }
}
