use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One prescribed unit of work within an exercise.
///
/// Which target fields are meaningful depends on `set_type`: reps/AMAP sets
/// carry `target_reps` and `weight`, duration sets carry `target_duration`
/// (seconds), freeform sets carry `description`. Sibling sets keep
/// contiguous `order_index` values scoped to their exercise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Set {
    pub id: Uuid,
    pub exercise_id: Uuid,
    pub set_type: SetType,
    pub target_reps: Option<i64>,
    pub weight: Option<f64>,
    /// Seconds.
    pub target_duration: Option<f64>,
    pub description: Option<String>,
    /// Perceived-effort score, 0–10.
    pub rpe: Option<i64>,
    pub order_index: i64,
}

/// How a set prescribes its work.
///
/// - `Reps`: a fixed rep count at a weight
/// - `Amap`: as many reps as possible
/// - `Duration`: hold/work for a number of seconds
/// - `Freeform`: described in prose only
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SetType {
    Reps,
    Amap,
    Duration,
    Freeform,
}

impl SetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reps => "reps",
            Self::Amap => "amap",
            Self::Duration => "duration",
            Self::Freeform => "freeform",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "reps" => Some(Self::Reps),
            "amap" => Some(Self::Amap),
            "duration" => Some(Self::Duration),
            "freeform" => Some(Self::Freeform),
            _ => None,
        }
    }
}

/// Input for creating a new set. The type defaults to `Reps`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSetInput {
    pub set_type: Option<SetType>,
    pub target_reps: Option<i64>,
    pub weight: Option<f64>,
    pub target_duration: Option<f64>,
    pub description: Option<String>,
    pub rpe: Option<i64>,
}

/// Input for updating an existing set. Absent fields keep their current
/// value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSetInput {
    pub set_type: Option<SetType>,
    pub target_reps: Option<i64>,
    pub weight: Option<f64>,
    pub target_duration: Option<f64>,
    pub description: Option<String>,
    pub rpe: Option<i64>,
}

/// Input for the combined save-and-record path used when a user finishes a
/// set mid-session: the provided fields are written to the set's targets,
/// then a history entry is recorded from the just-applied values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteSetInput {
    pub reps: Option<i64>,
    pub weight: Option<f64>,
    pub rpe: Option<i64>,
}
