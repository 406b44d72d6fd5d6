mod error;
mod reconcile;
mod schema;

pub use error::StoreError;

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::models::*;

const MIGRATION_COMPLETE_KEY: &str = "legacy_migration_complete";

/// The workout hierarchy store.
///
/// Owns the SQLite connection and exposes every read and mutation on the
/// routine → exercise → set → history tree. All access is serialized behind
/// one connection mutex; each mutation is written through in its own
/// statement or transaction, so a failed write aborts the whole logical
/// operation and leaves no partial state behind.
///
/// Cloning is cheap and shares the underlying connection and change counter.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    change_count: Arc<AtomicU64>,
}

impl Database {
    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            change_count: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn open_default() -> anyhow::Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "setdeck")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("setdeck.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            change_count: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn migrate(&self) -> anyhow::Result<()> {
        let conn = self.lock();
        schema::run_migrations(&conn)
    }

    /// Monotonically increasing counter, bumped after every successful
    /// mutation. Consumers compare values to detect "something changed"
    /// without diffing the tree.
    pub fn change_count(&self) -> u64 {
        self.change_count.load(Ordering::SeqCst)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database lock poisoned")
    }

    pub(crate) fn bump(&self) {
        self.change_count.fetch_add(1, Ordering::SeqCst);
    }

    // ============================================================
    // Routine operations
    // ============================================================

    /// All routines ordered by day ascending.
    pub fn all_routines(&self) -> Result<Vec<Routine>, StoreError> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare("SELECT id, day, last_updated FROM routines ORDER BY day")?;
        let routines = stmt
            .query_map([], routine_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(routines)
    }

    /// Returns the routine for `day`, creating and persisting one if absent.
    ///
    /// This is an upsert, not a plain query: the first call for a day writes
    /// a row. Repeated calls return the same identity, and the lookup never
    /// fails with "not found".
    pub fn get_or_create_routine(&self, day: i64) -> Result<Routine, StoreError> {
        if !(0..=6).contains(&day) {
            return Err(StoreError::InvalidDay(day));
        }

        let conn = self.lock();
        let existing = conn
            .query_row(
                "SELECT id, day, last_updated FROM routines WHERE day = ? ORDER BY rowid LIMIT 1",
                [day],
                routine_from_row,
            )
            .optional()?;
        if let Some(routine) = existing {
            return Ok(routine);
        }

        let routine = Routine {
            id: Uuid::new_v4(),
            day,
            last_updated: Utc::now(),
        };
        conn.execute(
            "INSERT INTO routines (id, day, last_updated) VALUES (?, ?, ?)",
            (
                routine.id.to_string(),
                routine.day,
                routine.last_updated.to_rfc3339(),
            ),
        )?;
        drop(conn);

        self.bump();
        Ok(routine)
    }

    // ============================================================
    // Exercise operations
    // ============================================================

    /// Child exercises of the routine for `day`, ordered by `order_index`.
    pub fn exercises_for_day(&self, day: i64) -> Result<Vec<Exercise>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT e.id, e.routine_id, e.name, e.note, e.video_url, e.equipment,
                    e.is_warmup, e.muscle_groups, e.order_index
             FROM exercises e JOIN routines r ON e.routine_id = r.id
             WHERE r.day = ? ORDER BY e.order_index",
        )?;
        let mut exercises = stmt
            .query_map([day], exercise_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        // Re-sort defensively; presentation order must not depend on the query plan
        exercises.sort_by_key(|e| e.order_index);
        Ok(exercises)
    }

    pub fn exercises_for_routine(&self, routine_id: Uuid) -> Result<Vec<Exercise>, StoreError> {
        let conn = self.lock();
        let exercises = fetch_exercises(&conn, routine_id)?;
        Ok(exercises)
    }

    pub fn get_exercise(&self, id: Uuid) -> Result<Option<Exercise>, StoreError> {
        let conn = self.lock();
        Ok(fetch_exercise(&conn, id)?)
    }

    /// Appends an exercise to the routine for `day`, creating the routine if
    /// it does not exist yet.
    pub fn add_exercise_for_day(
        &self,
        day: i64,
        input: CreateExerciseInput,
    ) -> Result<Exercise, StoreError> {
        let routine = self.get_or_create_routine(day)?;
        self.add_exercise(routine.id, input)
    }

    /// Appends an exercise at the end of the routine's order and gives it
    /// one default set (reps, target 10, weight 0, RPE 6).
    pub fn add_exercise(
        &self,
        routine_id: Uuid,
        input: CreateExerciseInput,
    ) -> Result<Exercise, StoreError> {
        let conn = self.lock();
        let tx = conn.unchecked_transaction()?;

        fetch_routine(&tx, routine_id)?.ok_or(StoreError::NotFound("routine"))?;

        let next_index: i64 = tx.query_row(
            "SELECT COALESCE(MAX(order_index) + 1, 0) FROM exercises WHERE routine_id = ?",
            [routine_id.to_string()],
            |row| row.get(0),
        )?;

        let exercise = Exercise {
            id: Uuid::new_v4(),
            routine_id,
            name: input.name,
            note: input.note,
            video_url: None,
            equipment: None,
            is_warmup: input.is_warmup,
            muscle_groups: Vec::new(),
            order_index: next_index,
        };
        tx.execute(
            "INSERT INTO exercises (id, routine_id, name, note, video_url, equipment,
                                    is_warmup, muscle_groups, order_index)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            (
                exercise.id.to_string(),
                routine_id.to_string(),
                &exercise.name,
                &exercise.note,
                &exercise.video_url,
                &exercise.equipment,
                exercise.is_warmup as i64,
                serde_json::to_string(&exercise.muscle_groups)?,
                exercise.order_index,
            ),
        )?;

        // Every new exercise starts with exactly one set
        tx.execute(
            "INSERT INTO sets (id, exercise_id, set_type, target_reps, weight, rpe, order_index)
             VALUES (?, ?, 'reps', 10, 0, 6, 0)",
            (Uuid::new_v4().to_string(), exercise.id.to_string()),
        )?;

        touch_routine(&tx, routine_id)?;
        tx.commit()?;
        drop(conn);

        self.bump();
        Ok(exercise)
    }

    /// Applies a partial update and touches the owning routine.
    pub fn update_exercise(
        &self,
        id: Uuid,
        input: UpdateExerciseInput,
    ) -> Result<Exercise, StoreError> {
        let conn = self.lock();
        let existing = fetch_exercise(&conn, id)?.ok_or(StoreError::NotFound("exercise"))?;

        let updated = Exercise {
            name: input.name.unwrap_or(existing.name),
            note: input.note.or(existing.note),
            video_url: input.video_url.or(existing.video_url),
            equipment: input.equipment.or(existing.equipment),
            is_warmup: input.is_warmup.unwrap_or(existing.is_warmup),
            muscle_groups: input.muscle_groups.unwrap_or(existing.muscle_groups),
            ..existing
        };

        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE exercises SET name = ?, note = ?, video_url = ?, equipment = ?,
                                  is_warmup = ?, muscle_groups = ? WHERE id = ?",
            (
                &updated.name,
                &updated.note,
                &updated.video_url,
                &updated.equipment,
                updated.is_warmup as i64,
                serde_json::to_string(&updated.muscle_groups)?,
                id.to_string(),
            ),
        )?;
        touch_routine(&tx, updated.routine_id)?;
        tx.commit()?;
        drop(conn);

        self.bump();
        Ok(updated)
    }

    pub fn rename_exercise(&self, id: Uuid, name: String) -> Result<Exercise, StoreError> {
        self.update_exercise(
            id,
            UpdateExerciseInput {
                name: Some(name),
                ..Default::default()
            },
        )
    }

    /// Reassigns `order_index` by position in `new_order`.
    ///
    /// `new_order` must be a permutation of the routine's current children;
    /// anything else is rejected with `InvalidReorder` before any index is
    /// written.
    pub fn reorder_exercises(
        &self,
        routine_id: Uuid,
        new_order: &[Uuid],
    ) -> Result<(), StoreError> {
        let conn = self.lock();
        let current: Vec<Uuid> = fetch_exercises(&conn, routine_id)?
            .into_iter()
            .map(|e| e.id)
            .collect();
        verify_permutation(&current, new_order, "exercise")?;

        let tx = conn.unchecked_transaction()?;
        for (idx, id) in new_order.iter().enumerate() {
            tx.execute(
                "UPDATE exercises SET order_index = ? WHERE id = ?",
                (idx as i64, id.to_string()),
            )?;
        }
        touch_routine(&tx, routine_id)?;
        tx.commit()?;
        drop(conn);

        self.bump();
        Ok(())
    }

    /// Deletes an exercise, cascading to its sets and their history, then
    /// reindexes the surviving siblings back to `0..n-1`.
    pub fn delete_exercise(&self, id: Uuid) -> Result<(), StoreError> {
        let conn = self.lock();
        let exercise = fetch_exercise(&conn, id)?.ok_or(StoreError::NotFound("exercise"))?;

        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM exercises WHERE id = ?", [id.to_string()])?;
        reindex_exercises(&tx, exercise.routine_id)?;
        touch_routine(&tx, exercise.routine_id)?;
        tx.commit()?;
        drop(conn);

        self.bump();
        Ok(())
    }

    // ============================================================
    // Set operations
    // ============================================================

    pub fn sets_for_exercise(&self, exercise_id: Uuid) -> Result<Vec<Set>, StoreError> {
        let conn = self.lock();
        let sets = fetch_sets(&conn, exercise_id)?;
        Ok(sets)
    }

    pub fn get_set(&self, id: Uuid) -> Result<Option<Set>, StoreError> {
        let conn = self.lock();
        Ok(fetch_set(&conn, id)?)
    }

    /// Appends a set at the end of the exercise's order.
    pub fn add_set(&self, exercise_id: Uuid, input: CreateSetInput) -> Result<Set, StoreError> {
        let conn = self.lock();
        let exercise =
            fetch_exercise(&conn, exercise_id)?.ok_or(StoreError::NotFound("exercise"))?;

        let next_index: i64 = conn.query_row(
            "SELECT COALESCE(MAX(order_index) + 1, 0) FROM sets WHERE exercise_id = ?",
            [exercise_id.to_string()],
            |row| row.get(0),
        )?;

        let set = Set {
            id: Uuid::new_v4(),
            exercise_id,
            set_type: input.set_type.unwrap_or(SetType::Reps),
            target_reps: input.target_reps,
            weight: input.weight,
            target_duration: input.target_duration,
            description: input.description,
            rpe: input.rpe,
            order_index: next_index,
        };

        let tx = conn.unchecked_transaction()?;
        insert_set(&tx, &set)?;
        touch_routine(&tx, exercise.routine_id)?;
        tx.commit()?;
        drop(conn);

        self.bump();
        Ok(set)
    }

    /// Applies a partial update and touches the owning routine.
    pub fn update_set(&self, id: Uuid, input: UpdateSetInput) -> Result<Set, StoreError> {
        let conn = self.lock();
        let existing = fetch_set(&conn, id)?.ok_or(StoreError::NotFound("set"))?;
        let exercise = fetch_exercise(&conn, existing.exercise_id)?
            .ok_or(StoreError::NotFound("exercise"))?;

        let updated = Set {
            set_type: input.set_type.unwrap_or(existing.set_type),
            target_reps: input.target_reps.or(existing.target_reps),
            weight: input.weight.or(existing.weight),
            target_duration: input.target_duration.or(existing.target_duration),
            description: input.description.or(existing.description),
            rpe: input.rpe.or(existing.rpe),
            ..existing
        };

        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE sets SET set_type = ?, target_reps = ?, weight = ?, target_duration = ?,
                             description = ?, rpe = ? WHERE id = ?",
            (
                updated.set_type.as_str(),
                updated.target_reps,
                updated.weight,
                updated.target_duration,
                &updated.description,
                updated.rpe,
                id.to_string(),
            ),
        )?;
        touch_routine(&tx, exercise.routine_id)?;
        tx.commit()?;
        drop(conn);

        self.bump();
        Ok(updated)
    }

    /// Same permutation contract as [`Database::reorder_exercises`], scoped
    /// to one exercise's sets.
    pub fn reorder_sets(&self, exercise_id: Uuid, new_order: &[Uuid]) -> Result<(), StoreError> {
        let conn = self.lock();
        let exercise =
            fetch_exercise(&conn, exercise_id)?.ok_or(StoreError::NotFound("exercise"))?;
        let current: Vec<Uuid> = fetch_sets(&conn, exercise_id)?
            .into_iter()
            .map(|s| s.id)
            .collect();
        verify_permutation(&current, new_order, "set")?;

        let tx = conn.unchecked_transaction()?;
        for (idx, id) in new_order.iter().enumerate() {
            tx.execute(
                "UPDATE sets SET order_index = ? WHERE id = ?",
                (idx as i64, id.to_string()),
            )?;
        }
        touch_routine(&tx, exercise.routine_id)?;
        tx.commit()?;
        drop(conn);

        self.bump();
        Ok(())
    }

    /// Deletes a set, cascading to its history, then reindexes the
    /// surviving siblings.
    pub fn delete_set(&self, id: Uuid) -> Result<(), StoreError> {
        let conn = self.lock();
        let set = fetch_set(&conn, id)?.ok_or(StoreError::NotFound("set"))?;
        let exercise = fetch_exercise(&conn, set.exercise_id)?
            .ok_or(StoreError::NotFound("exercise"))?;

        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM sets WHERE id = ?", [id.to_string()])?;
        reindex_sets(&tx, set.exercise_id)?;
        touch_routine(&tx, exercise.routine_id)?;
        tx.commit()?;
        drop(conn);

        self.bump();
        Ok(())
    }

    // ============================================================
    // History operations
    // ============================================================

    /// Appends a history entry to a set and touches the owning routine.
    pub fn record_history(
        &self,
        set_id: Uuid,
        input: RecordHistoryInput,
    ) -> Result<SetHistory, StoreError> {
        let conn = self.lock();
        let set = fetch_set(&conn, set_id)?.ok_or(StoreError::NotFound("set"))?;
        let exercise = fetch_exercise(&conn, set.exercise_id)?
            .ok_or(StoreError::NotFound("exercise"))?;

        let entry = SetHistory {
            id: Uuid::new_v4(),
            set_id,
            completed_date: input.completed_date.unwrap_or_else(Utc::now),
            actual_reps: input.actual_reps,
            actual_weight: input.actual_weight,
            actual_weight_unit: input.actual_weight_unit,
            actual_duration: input.actual_duration,
            actual_description: input.actual_description,
            actual_rpe: input.actual_rpe,
            note: input.note,
        };

        let tx = conn.unchecked_transaction()?;
        insert_history(&tx, &entry)?;
        touch_routine(&tx, exercise.routine_id)?;
        tx.commit()?;
        drop(conn);

        self.bump();
        Ok(entry)
    }

    /// The combined write path used when a user finishes a set during a
    /// session: patches the set's targets from the provided fields (RPE
    /// clamped to be non-negative), then records a history entry with the
    /// just-applied values. Duration-type sets have no separate "actual
    /// duration" input, so the set's current target duration is recorded.
    pub fn complete_set(
        &self,
        set_id: Uuid,
        input: CompleteSetInput,
    ) -> Result<SetHistory, StoreError> {
        let conn = self.lock();
        let existing = fetch_set(&conn, set_id)?.ok_or(StoreError::NotFound("set"))?;
        let exercise = fetch_exercise(&conn, existing.exercise_id)?
            .ok_or(StoreError::NotFound("exercise"))?;

        let updated = Set {
            target_reps: input.reps.or(existing.target_reps),
            weight: input.weight.or(existing.weight),
            rpe: input.rpe.map(|r| r.max(0)).or(existing.rpe),
            ..existing
        };

        let entry = SetHistory {
            id: Uuid::new_v4(),
            set_id,
            completed_date: Utc::now(),
            actual_reps: input.reps,
            actual_weight: input.weight,
            actual_weight_unit: None,
            actual_duration: match updated.set_type {
                SetType::Duration => updated.target_duration,
                _ => None,
            },
            actual_description: None,
            actual_rpe: input.rpe.map(|r| r.max(0)),
            note: None,
        };

        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE sets SET target_reps = ?, weight = ?, rpe = ? WHERE id = ?",
            (
                updated.target_reps,
                updated.weight,
                updated.rpe,
                set_id.to_string(),
            ),
        )?;
        insert_history(&tx, &entry)?;
        touch_routine(&tx, exercise.routine_id)?;
        tx.commit()?;
        drop(conn);

        self.bump();
        Ok(entry)
    }

    /// Every history entry store-wide, ordered by completion date ascending.
    pub fn all_history(&self) -> Result<Vec<SetHistory>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, set_id, completed_date, actual_reps, actual_weight, actual_weight_unit,
                    actual_duration, actual_description, actual_rpe, note
             FROM set_history ORDER BY completed_date",
        )?;
        let entries = stmt
            .query_map([], history_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// History for every set belonging to one exercise, ordered by
    /// completion date ascending.
    pub fn history_for_exercise(&self, exercise_id: Uuid) -> Result<Vec<SetHistory>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT h.id, h.set_id, h.completed_date, h.actual_reps, h.actual_weight,
                    h.actual_weight_unit, h.actual_duration, h.actual_description,
                    h.actual_rpe, h.note
             FROM set_history h JOIN sets s ON h.set_id = s.id
             WHERE s.exercise_id = ? ORDER BY h.completed_date",
        )?;
        let entries = stmt
            .query_map([exercise_id.to_string()], history_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Deletes every history entry store-wide. Routine, exercise, and set
    /// counts are unchanged. Returns how many entries were removed.
    pub fn clear_all_history(&self) -> Result<usize, StoreError> {
        let conn = self.lock();
        let removed = conn.execute("DELETE FROM set_history", [])?;
        drop(conn);

        if removed > 0 {
            self.bump();
        }
        Ok(removed)
    }

    // ============================================================
    // Legacy schema access (read path for the migration pipeline)
    // ============================================================

    /// Every legacy exercise, ordered by `(weekday, order_index)`, which is
    /// the order the migration pipeline consumes them in.
    pub fn legacy_exercises(&self) -> Result<Vec<LegacyExercise>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, weekday, order_index, name
             FROM legacy_exercises ORDER BY weekday, order_index",
        )?;
        let exercises = stmt
            .query_map([], |row| {
                Ok(LegacyExercise {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    weekday: row.get(1)?,
                    order_index: row.get(2)?,
                    name: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(exercises)
    }

    /// A legacy exercise's sets in original (timestamp) order.
    pub fn legacy_sets_for_exercise(
        &self,
        exercise_id: Uuid,
    ) -> Result<Vec<LegacySet>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, exercise_id, goal_type, repetitions_to_do, duration_to_do,
                    weight_to_lift, timestamp
             FROM legacy_sets WHERE exercise_id = ? ORDER BY timestamp, rowid",
        )?;
        let sets = stmt
            .query_map([exercise_id.to_string()], |row| {
                Ok(LegacySet {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    exercise_id: parse_uuid(row.get::<_, String>(1)?),
                    goal_type: GoalType::from_str(&row.get::<_, String>(2)?)
                        .unwrap_or(GoalType::Weight),
                    repetitions_to_do: row.get(3)?,
                    duration_to_do: row.get(4)?,
                    weight_to_lift: row.get(5)?,
                    timestamp: parse_datetime(row.get::<_, String>(6)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sets)
    }

    /// Inserts a row into the legacy tables. The server never writes these
    /// during normal operation; this supports importing a snapshot of the
    /// old app's database, and test fixtures.
    pub fn insert_legacy_exercise(&self, exercise: &LegacyExercise) -> Result<(), StoreError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO legacy_exercises (id, weekday, order_index, name) VALUES (?, ?, ?, ?)",
            (
                exercise.id.to_string(),
                exercise.weekday,
                exercise.order_index,
                &exercise.name,
            ),
        )?;
        Ok(())
    }

    /// See [`Database::insert_legacy_exercise`].
    pub fn insert_legacy_set(&self, set: &LegacySet) -> Result<(), StoreError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO legacy_sets (id, exercise_id, goal_type, repetitions_to_do,
                                      duration_to_do, weight_to_lift, timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                set.id.to_string(),
                set.exercise_id.to_string(),
                set.goal_type.as_str(),
                set.repetitions_to_do,
                set.duration_to_do,
                set.weight_to_lift,
                set.timestamp.to_rfc3339(),
            ),
        )?;
        Ok(())
    }

    /// Whether the one-time legacy migration has run to completion.
    pub fn legacy_migration_complete(&self) -> Result<bool, StoreError> {
        let conn = self.lock();
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM app_settings WHERE key = ?",
                [MIGRATION_COMPLETE_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.as_deref() == Some("true"))
    }

    pub(crate) fn migration_complete_key() -> &'static str {
        MIGRATION_COMPLETE_KEY
    }

    // ============================================================
    // Counts
    // ============================================================

    pub fn routine_count(&self) -> Result<i64, StoreError> {
        self.count("routines")
    }

    pub fn exercise_count(&self) -> Result<i64, StoreError> {
        self.count("exercises")
    }

    pub fn set_count(&self) -> Result<i64, StoreError> {
        self.count("sets")
    }

    pub fn history_count(&self) -> Result<i64, StoreError> {
        self.count("set_history")
    }

    fn count(&self, table: &str) -> Result<i64, StoreError> {
        let conn = self.lock();
        let count =
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count)
    }
}

// ============================================================
// Row mapping and shared statement helpers
// ============================================================

fn routine_from_row(row: &Row) -> rusqlite::Result<Routine> {
    Ok(Routine {
        id: parse_uuid(row.get::<_, String>(0)?),
        day: row.get(1)?,
        last_updated: parse_datetime(row.get::<_, String>(2)?),
    })
}

fn exercise_from_row(row: &Row) -> rusqlite::Result<Exercise> {
    let muscle_groups: String = row.get(7)?;
    Ok(Exercise {
        id: parse_uuid(row.get::<_, String>(0)?),
        routine_id: parse_uuid(row.get::<_, String>(1)?),
        name: row.get(2)?,
        note: row.get(3)?,
        video_url: row.get(4)?,
        equipment: row.get(5)?,
        is_warmup: row.get::<_, i64>(6)? != 0,
        muscle_groups: serde_json::from_str(&muscle_groups).unwrap_or_default(),
        order_index: row.get(8)?,
    })
}

fn set_from_row(row: &Row) -> rusqlite::Result<Set> {
    Ok(Set {
        id: parse_uuid(row.get::<_, String>(0)?),
        exercise_id: parse_uuid(row.get::<_, String>(1)?),
        set_type: SetType::from_str(&row.get::<_, String>(2)?).unwrap_or(SetType::Reps),
        target_reps: row.get(3)?,
        weight: row.get(4)?,
        target_duration: row.get(5)?,
        description: row.get(6)?,
        rpe: row.get(7)?,
        order_index: row.get(8)?,
    })
}

fn history_from_row(row: &Row) -> rusqlite::Result<SetHistory> {
    Ok(SetHistory {
        id: parse_uuid(row.get::<_, String>(0)?),
        set_id: parse_uuid(row.get::<_, String>(1)?),
        completed_date: parse_datetime(row.get::<_, String>(2)?),
        actual_reps: row.get(3)?,
        actual_weight: row.get(4)?,
        actual_weight_unit: row.get(5)?,
        actual_duration: row.get(6)?,
        actual_description: row.get(7)?,
        actual_rpe: row.get(8)?,
        note: row.get(9)?,
    })
}

fn fetch_routine(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<Routine>> {
    conn.query_row(
        "SELECT id, day, last_updated FROM routines WHERE id = ?",
        [id.to_string()],
        routine_from_row,
    )
    .optional()
}

fn fetch_exercise(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<Exercise>> {
    conn.query_row(
        "SELECT id, routine_id, name, note, video_url, equipment, is_warmup,
                muscle_groups, order_index
         FROM exercises WHERE id = ?",
        [id.to_string()],
        exercise_from_row,
    )
    .optional()
}

fn fetch_exercises(conn: &Connection, routine_id: Uuid) -> rusqlite::Result<Vec<Exercise>> {
    let mut stmt = conn.prepare(
        "SELECT id, routine_id, name, note, video_url, equipment, is_warmup,
                muscle_groups, order_index
         FROM exercises WHERE routine_id = ? ORDER BY order_index",
    )?;
    let mut exercises = stmt
        .query_map([routine_id.to_string()], exercise_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    exercises.sort_by_key(|e| e.order_index);
    Ok(exercises)
}

fn fetch_set(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<Set>> {
    conn.query_row(
        "SELECT id, exercise_id, set_type, target_reps, weight, target_duration,
                description, rpe, order_index
         FROM sets WHERE id = ?",
        [id.to_string()],
        set_from_row,
    )
    .optional()
}

fn fetch_sets(conn: &Connection, exercise_id: Uuid) -> rusqlite::Result<Vec<Set>> {
    let mut stmt = conn.prepare(
        "SELECT id, exercise_id, set_type, target_reps, weight, target_duration,
                description, rpe, order_index
         FROM sets WHERE exercise_id = ? ORDER BY order_index",
    )?;
    let mut sets = stmt
        .query_map([exercise_id.to_string()], set_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    sets.sort_by_key(|s| s.order_index);
    Ok(sets)
}

pub(crate) fn insert_set(conn: &Connection, set: &Set) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO sets (id, exercise_id, set_type, target_reps, weight, target_duration,
                           description, rpe, order_index)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            set.id.to_string(),
            set.exercise_id.to_string(),
            set.set_type.as_str(),
            set.target_reps,
            set.weight,
            set.target_duration,
            &set.description,
            set.rpe,
            set.order_index,
        ),
    )?;
    Ok(())
}

fn insert_history(conn: &Connection, entry: &SetHistory) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO set_history (id, set_id, completed_date, actual_reps, actual_weight,
                                  actual_weight_unit, actual_duration, actual_description,
                                  actual_rpe, note)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            entry.id.to_string(),
            entry.set_id.to_string(),
            entry.completed_date.to_rfc3339(),
            entry.actual_reps,
            entry.actual_weight,
            &entry.actual_weight_unit,
            entry.actual_duration,
            &entry.actual_description,
            entry.actual_rpe,
            &entry.note,
        ),
    )?;
    Ok(())
}

fn touch_routine(conn: &Connection, routine_id: Uuid) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE routines SET last_updated = ? WHERE id = ?",
        (Utc::now().to_rfc3339(), routine_id.to_string()),
    )?;
    Ok(())
}

/// Restores contiguous `order_index` values (`0..n-1`) for a routine's
/// exercises, preserving relative order.
fn reindex_exercises(conn: &Connection, routine_id: Uuid) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(
        "SELECT id FROM exercises WHERE routine_id = ? ORDER BY order_index, rowid",
    )?;
    let ids = stmt
        .query_map([routine_id.to_string()], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    for (idx, id) in ids.iter().enumerate() {
        conn.execute(
            "UPDATE exercises SET order_index = ? WHERE id = ?",
            (idx as i64, id),
        )?;
    }
    Ok(())
}

fn reindex_sets(conn: &Connection, exercise_id: Uuid) -> rusqlite::Result<()> {
    let mut stmt =
        conn.prepare("SELECT id FROM sets WHERE exercise_id = ? ORDER BY order_index, rowid")?;
    let ids = stmt
        .query_map([exercise_id.to_string()], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    for (idx, id) in ids.iter().enumerate() {
        conn.execute(
            "UPDATE sets SET order_index = ? WHERE id = ?",
            (idx as i64, id),
        )?;
    }
    Ok(())
}

fn verify_permutation(
    current: &[Uuid],
    proposed: &[Uuid],
    kind: &'static str,
) -> Result<(), StoreError> {
    let mut current = current.to_vec();
    let mut proposed = proposed.to_vec();
    current.sort();
    proposed.sort();
    if current != proposed {
        return Err(StoreError::InvalidReorder(kind));
    }
    Ok(())
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
