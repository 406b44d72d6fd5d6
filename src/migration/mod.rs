//! One-time migration from the legacy flat schema into the workout
//! hierarchy.
//!
//! The pipeline reads the legacy tables once, builds the full set of new
//! entities in memory, then persists everything in a single transaction.
//! Progress is published (with a cooperative yield) after every unit of
//! work, so a UI-facing caller stays responsive. Re-invoking it is always
//! safe: an empty legacy store or an already-populated hierarchy
//! short-circuits straight to `Completed`.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

use crate::db::{self, Database, StoreError};
use crate::models::*;

/// Where a migration run currently stands.
///
/// `progress` is in `[0, 1]`, non-decreasing within one run, and reaches 1.0
/// with the final unit of work, immediately before the `Completed`
/// transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MigrationStatus {
    Idle,
    Preparing { message: String },
    Running { message: String, progress: f64 },
    Completed,
    Failed { reason: String },
}

/// A migration run that could not complete. Unlike ordinary store errors,
/// these halt the pipeline and are surfaced to the caller.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to read legacy data: {0}")]
    LegacyRead(#[source] StoreError),

    #[error("failed to save migrated data: {0}")]
    Flush(#[source] StoreError),
}

/// Drives the legacy migration and publishes its status over a watch
/// channel. Cloning shares the run state, so one migrator instance can be
/// held by the API while another clone drives the run.
#[derive(Clone)]
pub struct LegacyMigrator {
    db: Database,
    status: Arc<watch::Sender<MigrationStatus>>,
}

impl LegacyMigrator {
    pub fn new(db: Database) -> Self {
        let (tx, _rx) = watch::channel(MigrationStatus::Idle);
        Self {
            db,
            status: Arc::new(tx),
        }
    }

    pub fn status(&self) -> MigrationStatus {
        self.status.borrow().clone()
    }

    /// A receiver for progress UIs. The current value is observable
    /// immediately; every later transition is delivered in order.
    pub fn subscribe(&self) -> watch::Receiver<MigrationStatus> {
        self.status.subscribe()
    }

    fn publish(&self, status: MigrationStatus) {
        self.status.send_replace(status);
    }

    /// Runs the migration to completion.
    ///
    /// At most one run is active at a time: invoking this while a run is in
    /// `Running` state returns immediately without side effects. The guard
    /// is a status check, not a lock; invocations are expected to be
    /// serialized by the caller (the API spawns at most one task).
    pub async fn perform_migration(&self) -> Result<(), MigrationError> {
        if matches!(self.status(), MigrationStatus::Running { .. }) {
            return Ok(());
        }

        self.publish(MigrationStatus::Preparing {
            message: "Scanning legacy data…".to_string(),
        });

        let legacy_exercises = match self.db.legacy_exercises() {
            Ok(exercises) => exercises,
            Err(e) => return Err(self.fail_read(e)),
        };

        if legacy_exercises.is_empty() {
            self.publish(MigrationStatus::Completed);
            return Ok(());
        }

        // If any routine already exists, assume the migration was already
        // performed.
        match self.db.routine_count() {
            Ok(0) => {}
            Ok(_) => {
                self.publish(MigrationStatus::Completed);
                return Ok(());
            }
            Err(e) => return Err(self.fail_read(e)),
        }

        let mut legacy: Vec<(LegacyExercise, Vec<LegacySet>)> =
            Vec::with_capacity(legacy_exercises.len());
        for exercise in legacy_exercises {
            let sets = match self.db.legacy_sets_for_exercise(exercise.id) {
                Ok(sets) => sets,
                Err(e) => return Err(self.fail_read(e)),
            };
            legacy.push((exercise, sets));
        }

        // Group by weekday to form routines; every unit of work (routine,
        // exercise, set) advances the shared progress denominator.
        let days: BTreeSet<i64> = legacy.iter().map(|(e, _)| e.weekday).collect();
        let total_sets: usize = legacy.iter().map(|(_, s)| s.len()).sum();
        let total_units = (days.len() + legacy.len() + total_sets).max(1);
        let mut processed = 0usize;

        let running = |processed: usize, message: String| MigrationStatus::Running {
            message,
            progress: processed as f64 / total_units as f64,
        };

        self.publish(running(processed, "Creating routines…".to_string()));

        let mut routines_by_day: HashMap<i64, Uuid> = HashMap::new();
        let mut routines = Vec::with_capacity(days.len());
        for day in days {
            let routine = Routine {
                id: Uuid::new_v4(),
                day,
                last_updated: Utc::now(),
            };
            routines_by_day.insert(day, routine.id);
            routines.push(routine);
            processed += 1;
            self.publish(running(processed, format!("Created routine for day {day}")));
            tokio::task::yield_now().await;
        }

        tracing::info!("Found {} legacy exercises to migrate", legacy.len());

        let mut exercises = Vec::with_capacity(legacy.len());
        let mut sets = Vec::with_capacity(total_sets);
        for (legacy_exercise, legacy_sets) in &legacy {
            let routine_id = routines_by_day[&legacy_exercise.weekday];
            let exercise = Exercise {
                id: Uuid::new_v4(),
                routine_id,
                name: legacy_exercise.name.clone(),
                note: None,
                video_url: None,
                equipment: None,
                is_warmup: false,
                muscle_groups: Vec::new(),
                order_index: legacy_exercise.order_index,
            };
            processed += 1;
            self.publish(running(
                processed,
                format!("Migrating exercise: {}", legacy_exercise.name),
            ));
            tokio::task::yield_now().await;

            for (idx, legacy_set) in legacy_sets.iter().enumerate() {
                sets.push(convert_set(legacy_set, exercise.id, idx as i64));
                processed += 1;
                self.publish(running(
                    processed,
                    format!("Added set #{} for {}", idx + 1, legacy_exercise.name),
                ));
                tokio::task::yield_now().await;
            }

            exercises.push(exercise);
        }

        match self.flush(&routines, &exercises, &sets) {
            Ok(()) => {
                self.publish(MigrationStatus::Completed);
                Ok(())
            }
            Err(e) => {
                let err = MigrationError::Flush(e);
                self.publish(MigrationStatus::Failed {
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn fail_read(&self, e: StoreError) -> MigrationError {
        let err = MigrationError::LegacyRead(e);
        self.publish(MigrationStatus::Failed {
            reason: err.to_string(),
        });
        err
    }

    /// Persists the whole migrated tree in one transaction and marks the
    /// migration complete. A failed commit leaves the database untouched;
    /// the in-memory plan is simply dropped by the caller.
    fn flush(
        &self,
        routines: &[Routine],
        exercises: &[Exercise],
        sets: &[Set],
    ) -> Result<(), StoreError> {
        let conn = self.db.lock();
        let tx = conn.unchecked_transaction()?;

        for routine in routines {
            tx.execute(
                "INSERT INTO routines (id, day, last_updated) VALUES (?, ?, ?)",
                (
                    routine.id.to_string(),
                    routine.day,
                    routine.last_updated.to_rfc3339(),
                ),
            )?;
        }
        for exercise in exercises {
            tx.execute(
                "INSERT INTO exercises (id, routine_id, name, note, video_url, equipment,
                                        is_warmup, muscle_groups, order_index)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                (
                    exercise.id.to_string(),
                    exercise.routine_id.to_string(),
                    &exercise.name,
                    &exercise.note,
                    &exercise.video_url,
                    &exercise.equipment,
                    exercise.is_warmup as i64,
                    serde_json::to_string(&exercise.muscle_groups)?,
                    exercise.order_index,
                ),
            )?;
        }
        for set in sets {
            db::insert_set(&tx, set)?;
        }
        tx.execute(
            "INSERT OR REPLACE INTO app_settings (key, value) VALUES (?, 'true')",
            [Database::migration_complete_key()],
        )?;

        tx.commit()?;
        drop(conn);

        self.db.bump();
        Ok(())
    }
}

/// Maps a legacy set onto the new model by goal type: weight goals become
/// rep sets, duration goals become duration sets. The legacy position
/// becomes the new `order_index`.
fn convert_set(legacy: &LegacySet, exercise_id: Uuid, order_index: i64) -> Set {
    let base = Set {
        id: Uuid::new_v4(),
        exercise_id,
        set_type: SetType::Reps,
        target_reps: None,
        weight: None,
        target_duration: None,
        description: None,
        rpe: None,
        order_index,
    };
    match legacy.goal_type {
        GoalType::Weight => Set {
            set_type: SetType::Reps,
            target_reps: Some(legacy.repetitions_to_do),
            weight: Some(legacy.weight_to_lift as f64),
            ..base
        },
        GoalType::Duration => Set {
            set_type: SetType::Duration,
            target_duration: Some(legacy.duration_to_do as f64),
            ..base
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Database {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    fn seed_legacy_exercise(db: &Database, weekday: i64, order_index: i64, name: &str) -> Uuid {
        let exercise = LegacyExercise {
            id: Uuid::new_v4(),
            weekday,
            order_index,
            name: name.to_string(),
        };
        db.insert_legacy_exercise(&exercise).unwrap();
        exercise.id
    }

    #[tokio::test]
    async fn is_a_noop_while_already_running() {
        let db = setup();
        seed_legacy_exercise(&db, 1, 0, "Legacy Squat");

        let migrator = LegacyMigrator::new(db.clone());
        migrator.status.send_replace(MigrationStatus::Running {
            message: "Already migrating…".to_string(),
            progress: 0.4,
        });

        migrator.perform_migration().await.unwrap();

        assert_eq!(
            migrator.status(),
            MigrationStatus::Running {
                message: "Already migrating…".to_string(),
                progress: 0.4,
            }
        );
        assert_eq!(db.routine_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn existing_routine_skips_the_run() {
        let db = setup();
        seed_legacy_exercise(&db, 1, 0, "Legacy Squat");
        db.get_or_create_routine(1).unwrap();

        let migrator = LegacyMigrator::new(db.clone());
        migrator.perform_migration().await.unwrap();

        assert_eq!(db.routine_count().unwrap(), 1);
        assert_eq!(db.exercise_count().unwrap(), 0);
        assert_eq!(migrator.status(), MigrationStatus::Completed);
    }
}
