use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named movement within a routine.
///
/// Sibling exercises within one routine keep contiguous `order_index`
/// values (`0..n-1`) matching presentation order. Deleting an exercise
/// cascades to its sets and their history, then reindexes the survivors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    pub id: Uuid,
    pub routine_id: Uuid,
    pub name: String,
    pub note: Option<String>,
    pub video_url: Option<String>,
    pub equipment: Option<String>,
    pub is_warmup: bool,
    pub muscle_groups: Vec<MuscleGroup>,
    pub order_index: i64,
}

/// Muscle-group tags attachable to an exercise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MuscleGroup {
    Chest,
    Shoulders,
    Triceps,
    Back,
    Lats,
    Traps,
    Biceps,
    Forearms,
    Quads,
    Hamstrings,
    Glutes,
    Calves,
    Abs,
    Obliques,
    LowerBack,
    Neck,
    Serratus,
    RotatorCuff,
    FullBody,
    Cardio,
}

/// Input for creating a new exercise.
///
/// The store appends the exercise at the end of the routine's order and
/// unconditionally gives it one default set (reps, target 10, weight 0,
/// RPE 6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExerciseInput {
    pub name: String,
    #[serde(default)]
    pub is_warmup: bool,
    pub note: Option<String>,
}

/// Input for updating an existing exercise. All fields are optional for
/// partial updates; absent fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateExerciseInput {
    pub name: Option<String>,
    pub note: Option<String>,
    pub video_url: Option<String>,
    pub equipment: Option<String>,
    pub is_warmup: Option<bool>,
    pub muscle_groups: Option<Vec<MuscleGroup>>,
}
