use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormationError {
    #[error("unknown jump record: {0}")]
    UnknownRecord(Uuid),
    #[error("{base} is not in the same formation as {member}")]
    NotAMember { member: Uuid, base: Uuid },
}
