use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::db::StoreError;
use crate::migration::MigrationStatus;
use crate::models::*;

use super::AppState;

// ============================================================
// Error Handling
// ============================================================

/// Map a store error onto a response. Validation failures carry their typed
/// message to the client; persistence failures are logged server-side and
/// sanitized so internals never leak.
fn store_error(e: StoreError) -> (StatusCode, String) {
    match e {
        StoreError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        StoreError::InvalidDay(_) | StoreError::InvalidReorder(_) => {
            tracing::warn!("Validation error: {}", e);
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        StoreError::Persistence(_) => {
            tracing::error!("Internal error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Routines
// ============================================================

pub async fn list_routines(
    State(state): State<AppState>,
) -> Result<Json<Vec<Routine>>, (StatusCode, String)> {
    state.db.all_routines().map(Json).map_err(store_error)
}

/// Upsert: returns the day's routine, creating one if absent. Never 404s.
pub async fn get_or_create_routine(
    State(state): State<AppState>,
    Path(day): Path<i64>,
) -> Result<Json<Routine>, (StatusCode, String)> {
    state
        .db
        .get_or_create_routine(day)
        .map(Json)
        .map_err(store_error)
}

// ============================================================
// Exercises
// ============================================================

pub async fn list_exercises(
    State(state): State<AppState>,
    Path(day): Path<i64>,
) -> Result<Json<Vec<Exercise>>, (StatusCode, String)> {
    state.db.exercises_for_day(day).map(Json).map_err(store_error)
}

pub async fn add_exercise(
    State(state): State<AppState>,
    Path(day): Path<i64>,
    Json(input): Json<CreateExerciseInput>,
) -> Result<(StatusCode, Json<Exercise>), (StatusCode, String)> {
    state
        .db
        .add_exercise_for_day(day, input)
        .map(|e| (StatusCode::CREATED, Json(e)))
        .map_err(store_error)
}

pub async fn reorder_exercises(
    State(state): State<AppState>,
    Path(day): Path<i64>,
    Json(new_order): Json<Vec<Uuid>>,
) -> Result<StatusCode, (StatusCode, String)> {
    let routine = state.db.get_or_create_routine(day).map_err(store_error)?;
    state
        .db
        .reorder_exercises(routine.id, &new_order)
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(store_error)
}

pub async fn get_exercise(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Exercise>, (StatusCode, String)> {
    state
        .db
        .get_exercise(id)
        .map_err(store_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "exercise not found".to_string()))
}

pub async fn update_exercise(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateExerciseInput>,
) -> Result<Json<Exercise>, (StatusCode, String)> {
    state
        .db
        .update_exercise(id, input)
        .map(Json)
        .map_err(store_error)
}

pub async fn delete_exercise(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .db
        .delete_exercise(id)
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(store_error)
}

// ============================================================
// Sets
// ============================================================

pub async fn list_sets(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Set>>, (StatusCode, String)> {
    state.db.sets_for_exercise(id).map(Json).map_err(store_error)
}

pub async fn add_set(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CreateSetInput>,
) -> Result<(StatusCode, Json<Set>), (StatusCode, String)> {
    state
        .db
        .add_set(id, input)
        .map(|s| (StatusCode::CREATED, Json(s)))
        .map_err(store_error)
}

pub async fn reorder_sets(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(new_order): Json<Vec<Uuid>>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .db
        .reorder_sets(id, &new_order)
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(store_error)
}

pub async fn update_set(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateSetInput>,
) -> Result<Json<Set>, (StatusCode, String)> {
    state.db.update_set(id, input).map(Json).map_err(store_error)
}

pub async fn delete_set(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .db
        .delete_set(id)
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(store_error)
}

// ============================================================
// History
// ============================================================

pub async fn record_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<RecordHistoryInput>,
) -> Result<(StatusCode, Json<SetHistory>), (StatusCode, String)> {
    state
        .db
        .record_history(id, input)
        .map(|h| (StatusCode::CREATED, Json(h)))
        .map_err(store_error)
}

/// The save-and-record path a session UI calls when the user finishes a set.
pub async fn complete_set(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CompleteSetInput>,
) -> Result<(StatusCode, Json<SetHistory>), (StatusCode, String)> {
    state
        .db
        .complete_set(id, input)
        .map(|h| (StatusCode::CREATED, Json(h)))
        .map_err(store_error)
}

pub async fn all_history(
    State(state): State<AppState>,
) -> Result<Json<Vec<SetHistory>>, (StatusCode, String)> {
    state.db.all_history().map(Json).map_err(store_error)
}

pub async fn exercise_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SetHistory>>, (StatusCode, String)> {
    state
        .db
        .history_for_exercise(id)
        .map(Json)
        .map_err(store_error)
}

pub async fn clear_history(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    state
        .db
        .clear_all_history()
        .map(|removed| Json(serde_json::json!({ "removed": removed })))
        .map_err(store_error)
}

// ============================================================
// Change polling
// ============================================================

pub async fn changes(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({ "change_count": state.db.change_count() }))
}

// ============================================================
// Legacy migration
// ============================================================

pub async fn migration_status(State(state): State<AppState>) -> Json<MigrationStatus> {
    Json(state.migrator.status())
}

/// Kicks off the legacy migration as a background task and returns
/// immediately; progress is observable at `GET /migration/status`. Invoking
/// this while a run is active is harmless (the pipeline's re-entrancy guard
/// makes it a no-op).
pub async fn start_migration(State(state): State<AppState>) -> impl IntoResponse {
    let migrator = state.migrator.clone();
    tokio::spawn(async move {
        if let Err(e) = migrator.perform_migration().await {
            tracing::error!("Legacy migration failed: {}", e);
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "status": "started" })),
    )
}
