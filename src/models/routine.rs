use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The workout plan for one weekday.
///
/// Routines are created lazily: asking the store for a day's routine creates
/// one if it does not exist yet, so lookups never fail with "not found".
/// At most one routine per `day` is canonical at any time. Duplicate rows
/// are a transient corruption state (a creation race from an older build)
/// that the startup reconciler merges away.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Routine {
    pub id: Uuid,
    /// Weekday, 0 (Sunday) through 6 (Saturday).
    pub day: i64,
    /// Touched whenever this routine or anything beneath it changes.
    pub last_updated: DateTime<Utc>,
}
