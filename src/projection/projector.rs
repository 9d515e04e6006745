use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::error::ProjectionError;
use super::geodesy::{base_relative, local_offset, LocalOffset};
use super::types::{ParticipantData, ProjectedPosition};
use crate::analysis::normalize_fall_rate;
use crate::telemetry::{offset_delta, GeodeticCoordinate, TrackSpeed};

const DEFAULT_CLOSURE_WINDOW: Duration = Duration::from_millis(500);

/// Instantaneous state of one participant, read from its series.
#[derive(Debug, Clone, Copy)]
struct State {
    local: LocalOffset,
    is_interpolated: bool,
    track: Option<TrackSpeed>,
    fall_rate_mph: Option<f64>,
}

fn position_at(
    participant: &ParticipantData,
    offset: f64,
    origin: &GeodeticCoordinate,
) -> Option<(LocalOffset, bool)> {
    let fix = participant.log.gps.sample_at(offset)?;
    Some((local_offset(&fix.value.position, origin), fix.is_interpolated))
}

fn state_at(
    participant: &ParticipantData,
    time: DateTime<Utc>,
    origin: &GeodeticCoordinate,
) -> Option<State> {
    let offset = participant.offset_at(time);
    let (local, is_interpolated) = position_at(participant, offset, origin)?;
    let log = &participant.log;
    let fall_rate_mph = match (
        log.vertical_speed.sample_at(offset),
        log.altitude.sample_at(offset),
    ) {
        (Some(speed), Some(altitude)) => Some(normalize_fall_rate(speed.value, altitude.value)),
        _ => None,
    };
    Some(State {
        local,
        is_interpolated,
        track: log.track.latest_at(offset).map(|s| s.value),
        fall_rate_mph,
    })
}

/// Absolute time of the first GPS fix.
fn gps_start(participant: &ParticipantData) -> Option<DateTime<Utc>> {
    let first = participant.log.gps.first()?.offset;
    participant
        .start_time
        .checked_add_signed(offset_delta(first)?)
}

/// Rate at which `participant` closes on `base` between `earlier` and `time`.
/// The look-back never reaches before either GPS series starts, so the rate is
/// taken over the interval both positions actually cover.
fn closure_rate(
    base: &ParticipantData,
    participant: &ParticipantData,
    earlier: DateTime<Utc>,
    time: DateTime<Utc>,
    distance_m: f64,
    origin: &GeodeticCoordinate,
) -> Option<f64> {
    let from = earlier.max(gps_start(base)?).max(gps_start(participant)?);
    let elapsed_s = time.signed_duration_since(from).num_milliseconds() as f64 / 1000.0;
    if elapsed_s <= 0.0 {
        return None;
    }
    let (base_local, _) = position_at(base, base.offset_at(from), origin)?;
    let (local, _) = position_at(participant, participant.offset_at(from), origin)?;
    let previous = (local - base_local).norm();
    Some((previous - distance_m) / elapsed_s)
}

/// Stateless relative-position projector. Recomputes everything per call.
#[derive(Debug, Clone)]
pub struct Projector {
    closure_window: Duration,
}

impl Default for Projector {
    fn default() -> Self {
        Self::new(DEFAULT_CLOSURE_WINDOW)
    }
}

impl Projector {
    /// `closure_window` is the look-back used for closure rates.
    pub fn new(closure_window: Duration) -> Self {
        Self { closure_window }
    }

    pub fn project_at_time(
        &self,
        participants: &[ParticipantData],
        time: DateTime<Utc>,
        base_id: Uuid,
        origin: &GeodeticCoordinate,
    ) -> Result<Vec<ProjectedPosition>, ProjectionError> {
        let base = participants
            .iter()
            .find(|p| p.id == base_id)
            .ok_or(ProjectionError::BaseNotFound(base_id))?;
        let base_state =
            state_at(base, time, origin).ok_or(ProjectionError::BaseHasNoData(base_id))?;

        let rotation = -base_state
            .track
            .map(|t| t.track_deg)
            .unwrap_or(0.0)
            .to_radians();

        let look_back = chrono::Duration::from_std(self.closure_window)
            .ok()
            .filter(|window| *window > chrono::Duration::zero())
            .and_then(|window| time.checked_sub_signed(window));

        let mut projected = Vec::with_capacity(participants.len());
        for participant in participants.iter().filter(|p| p.visible) {
            let is_base = participant.id == base_id;
            let state = if is_base {
                base_state
            } else {
                match state_at(participant, time, origin) {
                    Some(state) => state,
                    None => {
                        log::debug!(
                            "Skipping {} ({}): no position samples",
                            participant.name,
                            participant.id
                        );
                        continue;
                    }
                }
            };

            let distance_m = (state.local - base_state.local).norm();
            let closure_rate_mps = if is_base {
                None
            } else {
                look_back.and_then(|earlier| {
                    closure_rate(base, participant, earlier, time, distance_m, origin)
                })
            };
            let fall_rate_delta_mph = match (state.fall_rate_mph, base_state.fall_rate_mph) {
                (Some(own), Some(base)) => Some(own - base),
                _ => None,
            };

            projected.push(ProjectedPosition {
                participant_id: participant.id,
                name: participant.name.clone(),
                color: participant.color.clone(),
                is_base,
                local: state.local,
                relative: base_relative(state.local, base_state.local, rotation),
                distance_m,
                closure_rate_mps,
                normalized_fall_rate_mph: state.fall_rate_mph,
                fall_rate_delta_mph,
                ground_track_deg: state.track.map(|t| t.track_deg),
                ground_speed_mps: state.track.map(|t| t.speed_mps),
                is_interpolated: state.is_interpolated,
            });
        }
        Ok(projected)
    }
}

/// Projects every visible participant relative to `base_id` at `time`.
pub fn project_at_time(
    participants: &[ParticipantData],
    time: DateTime<Utc>,
    base_id: Uuid,
    origin: &GeodeticCoordinate,
) -> Result<Vec<ProjectedPosition>, ProjectionError> {
    Projector::default().project_at_time(participants, time, base_id, origin)
}

/// First recorded position of the base, a convenient shared origin.
pub fn default_origin(
    participants: &[ParticipantData],
    base_id: Uuid,
) -> Result<GeodeticCoordinate, ProjectionError> {
    let base = participants
        .iter()
        .find(|p| p.id == base_id)
        .ok_or(ProjectionError::BaseNotFound(base_id))?;
    base.log
        .gps
        .first()
        .map(|s| s.value.position)
        .ok_or(ProjectionError::BaseHasNoData(base_id))
}
