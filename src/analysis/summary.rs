use serde::Serialize;

use super::events::{DetectorConfig, EventDetector, JumpEvent};
use super::fall_rate::normalize_fall_rate;
use crate::telemetry::{ParsedLogData, TimeSeries};

/// Structured result handed back to callers for one log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JumpAnalysis {
    pub has_valid_data: bool,
    pub error: Option<String>,
    pub events: JumpEvent,
    pub notes: Vec<String>,
    pub exit_altitude_agl_ft: Option<f64>,
    pub deployment_altitude_agl_ft: Option<f64>,
    pub freefall_time_s: Option<f64>,
    pub peak_normalized_fall_rate_mph: Option<f64>,
    pub mean_normalized_fall_rate_mph: Option<f64>,
}

/// Normalized fall rate (mph) at every vertical-speed sample that has a
/// matching altitude.
pub fn fall_rate_series(data: &ParsedLogData) -> TimeSeries<f64> {
    data.vertical_speed
        .iter()
        .filter_map(|s| {
            let altitude = data.altitude.sample_at(s.offset)?.value;
            Some((s.offset, normalize_fall_rate(s.value, altitude)))
        })
        .collect()
}

pub fn analyze(data: &ParsedLogData, config: &DetectorConfig) -> JumpAnalysis {
    let detection = EventDetector::new(config.clone()).detect(&data.vertical_speed);
    let events = detection.events;
    let mut notes = detection.notes;
    if let Some(error) = &data.error {
        notes.insert(0, error.clone());
    }

    let freefall_end = events.deployment_offset;
    let freefall_time_s = match (events.exit_offset, freefall_end) {
        (Some(exit), Some(end)) if end > exit => Some(end - exit),
        _ => None,
    };

    let (peak, mean) = match (events.exit_offset, freefall_end) {
        (Some(exit), Some(end)) => {
            let rates: Vec<f64> = fall_rate_series(data)
                .iter()
                .filter(|s| s.offset >= exit && s.offset <= end)
                .map(|s| s.value)
                .collect();
            if rates.is_empty() {
                (None, None)
            } else {
                let peak = rates.iter().cloned().fold(f64::MIN, f64::max);
                let mean = rates.iter().sum::<f64>() / rates.len() as f64;
                (Some(peak), Some(mean))
            }
        }
        _ => (None, None),
    };

    JumpAnalysis {
        has_valid_data: data.has_valid_data,
        error: data.error.clone(),
        events,
        notes,
        exit_altitude_agl_ft: events.exit_offset.and_then(|t| data.altitude_agl_at(t)),
        deployment_altitude_agl_ft: events
            .deployment_offset
            .and_then(|t| data.altitude_agl_at(t)),
        freefall_time_s,
        peak_normalized_fall_rate_mph: peak,
        mean_normalized_fall_rate_mph: mean,
    }
}
