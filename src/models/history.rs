use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An append-only record of an actually-performed set.
///
/// History mirrors the set's prescription with "actual" fields: what was
/// really lifted and for how many reps, on a specific date.
/// Entries are immutable once created; the only removal paths are deleting
/// an ancestor (cascade) and the store-wide bulk clear.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetHistory {
    pub id: Uuid,
    pub set_id: Uuid,
    pub completed_date: DateTime<Utc>,
    pub actual_reps: Option<i64>,
    pub actual_weight: Option<f64>,
    pub actual_weight_unit: Option<String>,
    /// Seconds.
    pub actual_duration: Option<f64>,
    pub actual_description: Option<String>,
    pub actual_rpe: Option<i64>,
    pub note: Option<String>,
}

/// Input for recording a history entry against a set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordHistoryInput {
    /// Defaults to now when absent.
    pub completed_date: Option<DateTime<Utc>>,
    pub actual_reps: Option<i64>,
    pub actual_weight: Option<f64>,
    pub actual_weight_unit: Option<String>,
    pub actual_duration: Option<f64>,
    pub actual_description: Option<String>,
    pub actual_rpe: Option<i64>,
    pub note: Option<String>,
}
