mod error;
mod grouper;
mod types;

pub use error::FormationError;
pub use grouper::{group_by_proximity, FormationGrouper, DEFAULT_TOLERANCE_S};
pub use types::{FormationGroup, JumpRecord};
