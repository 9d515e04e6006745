use thiserror::Error;
use uuid::Uuid;

/// Invalid projection calls. Every projected value depends on the base, so
/// these are rejected instead of degraded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    #[error("base participant not found: {0}")]
    BaseNotFound(Uuid),
    #[error("base participant {0} has no position samples")]
    BaseHasNoData(Uuid),
}
