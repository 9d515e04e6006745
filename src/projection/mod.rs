mod error;
pub mod geodesy;
mod projector;
mod types;

pub use crate::telemetry::GeodeticCoordinate;
pub use error::ProjectionError;
pub use geodesy::{base_relative, local_offset, LocalOffset};
pub use projector::{default_origin, project_at_time, Projector};
pub use types::{ParticipantData, ProjectedPosition};
