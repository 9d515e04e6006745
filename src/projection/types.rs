use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::geodesy::LocalOffset;
use crate::telemetry::ParsedLogData;

/// One jumper in a projection request.
#[derive(Debug, Clone)]
pub struct ParticipantData {
    pub id: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub visible: bool,
    /// Absolute time of offset zero in `log`.
    pub start_time: DateTime<Utc>,
    pub log: ParsedLogData,
}

impl ParticipantData {
    /// `None` when the log has no absolute start time to align on.
    pub fn from_log(id: Uuid, name: impl Into<String>, log: ParsedLogData) -> Option<Self> {
        Some(Self {
            id,
            name: name.into(),
            color: None,
            visible: true,
            start_time: log.start_time?,
            log,
        })
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Seconds into this participant's log for an absolute instant.
    pub fn offset_at(&self, time: DateTime<Utc>) -> f64 {
        (time - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

/// Where one participant is, relative to the base, at a query time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedPosition {
    pub participant_id: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub is_base: bool,
    /// North/east/down from the shared origin.
    pub local: LocalOffset,
    /// Forward/right/down from the base.
    pub relative: LocalOffset,
    pub distance_m: f64,
    /// Positive while closing on the base.
    pub closure_rate_mps: Option<f64>,
    pub normalized_fall_rate_mph: Option<f64>,
    pub fall_rate_delta_mph: Option<f64>,
    pub ground_track_deg: Option<f64>,
    pub ground_speed_mps: Option<f64>,
    pub is_interpolated: bool,
}
