use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An exercise row from the older flat schema.
///
/// Legacy data is tagged with a weekday instead of belonging to a routine
/// entity. It is read exactly once, by the migration pipeline, and never
/// written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyExercise {
    pub id: Uuid,
    pub weekday: i64,
    pub order_index: i64,
    pub name: String,
}

/// A set row from the older flat schema, child of a [`LegacyExercise`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacySet {
    pub id: Uuid,
    pub exercise_id: Uuid,
    pub goal_type: GoalType,
    pub repetitions_to_do: i64,
    /// Seconds.
    pub duration_to_do: i64,
    pub weight_to_lift: i64,
    pub timestamp: DateTime<Utc>,
}

/// The legacy schema's two-way split of what a set aims for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    Weight,
    Duration,
}

impl GoalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weight => "weight",
            Self::Duration => "duration",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "weight" => Some(Self::Weight),
            "duration" => Some(Self::Duration),
            _ => None,
        }
    }
}
