use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::series::{Interpolate, TimeSeries};
use crate::decoder::DecodeStats;

/// Raw sensor position. Degrees, metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticCoordinate {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

impl GeodeticCoordinate {
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude.to_radians()
    }
}

impl Interpolate for GeodeticCoordinate {
    fn lerp(&self, other: &Self, fraction: f64) -> Self {
        // Blend across the antimeridian the short way round
        let mut dlon = other.longitude - self.longitude;
        if dlon > 180.0 {
            dlon -= 360.0;
        } else if dlon < -180.0 {
            dlon += 360.0;
        }
        let mut longitude = self.longitude + dlon * fraction;
        if longitude > 180.0 {
            longitude -= 360.0;
        } else if longitude < -180.0 {
            longitude += 360.0;
        }
        Self {
            latitude: self.latitude.lerp(&other.latitude, fraction),
            longitude,
            altitude: self.altitude.lerp(&other.altitude, fraction),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GpsFix {
    pub position: GeodeticCoordinate,
    pub quality: u8,
    pub satellites: u8,
}

impl Interpolate for GpsFix {
    fn lerp(&self, other: &Self, fraction: f64) -> Self {
        Self {
            position: self.position.lerp(&other.position, fraction),
            quality: self.quality.min(other.quality),
            satellites: self.satellites.min(other.satellites),
        }
    }
}

/// Step-valued ground track and speed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackSpeed {
    pub track_deg: f64,
    pub speed_mps: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InertialSample {
    pub accel_g: [f64; 3],
    pub gyro_dps: [f64; 3],
}

impl Interpolate for InertialSample {
    fn lerp(&self, other: &Self, fraction: f64) -> Self {
        Self {
            accel_g: self.accel_g.lerp(&other.accel_g, fraction),
            gyro_dps: self.gyro_dps.lerp(&other.gyro_dps, fraction),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub decode: DecodeStats,
    /// Samples discarded because the recording gate was closed.
    pub gated: usize,
    pub out_of_order: usize,
}

/// Seconds offset as a millisecond-resolution duration. `None` when the
/// offset is not finite or does not fit.
pub fn offset_delta(offset_s: f64) -> Option<Duration> {
    let millis = (offset_s * 1000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    Duration::try_milliseconds(millis as i64)
}

/// Everything assembled from one raw log buffer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedLogData {
    pub start_time: Option<DateTime<Utc>>,
    pub duration_s: f64,
    pub sample_rate_hz: f64,
    /// Pressure altitude, ft MSL.
    pub altitude: TimeSeries<f64>,
    /// m/s, positive up.
    pub vertical_speed: TimeSeries<f64>,
    pub gps: TimeSeries<GpsFix>,
    pub track: TimeSeries<TrackSpeed>,
    pub inertial: TimeSeries<InertialSample>,
    pub has_gps: bool,
    pub has_valid_data: bool,
    pub error: Option<String>,
    pub format_version: Option<String>,
    pub firmware: Option<String>,
    pub surface_altitude_ft: Option<f64>,
    /// Device-reported `PTHR` values. Carried for callers; event detection
    /// uses [`DetectorConfig`](crate::analysis::DetectorConfig) only.
    pub thresholds: BTreeMap<String, f64>,
    pub diagnostics: Diagnostics,
}

impl ParsedLogData {
    /// Number of barometric entries kept.
    pub fn entries(&self) -> usize {
        self.altitude.len()
    }

    /// `None` without a start time or when the instant is out of range.
    pub fn absolute_time(&self, offset: f64) -> Option<DateTime<Utc>> {
        self.start_time?.checked_add_signed(offset_delta(offset)?)
    }

    /// Altitude above the recorded surface reference, ft. Falls back to MSL
    /// when the log carries no surface reference.
    pub fn altitude_agl_at(&self, offset: f64) -> Option<f64> {
        let msl = self.altitude.sample_at(offset)?.value;
        Some(msl - self.surface_altitude_ft.unwrap_or(0.0))
    }
}
