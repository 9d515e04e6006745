use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The part of an analysed jump the grouper needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JumpRecord {
    pub id: Uuid,
    pub start_time: DateTime<Utc>,
}

impl JumpRecord {
    pub fn new(id: Uuid, start_time: DateTime<Utc>) -> Self {
        Self { id, start_time }
    }
}

/// Jumps whose start times chain together within the tolerance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormationGroup {
    /// Ordered by start time.
    pub members: Vec<Uuid>,
    /// Suggested reference participant. Callers may project against any member.
    pub base: Uuid,
    pub start_time: DateTime<Utc>,
}

impl FormationGroup {
    /// More than one jumper.
    pub fn is_formation(&self) -> bool {
        self.members.len() > 1
    }
}
