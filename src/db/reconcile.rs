//! Startup repair for duplicate routine rows.
//!
//! Older builds could race two creations of the same day's routine, leaving
//! more than one row per day. Normal mutation paths never produce or fix
//! this; the reconciler runs once at startup, before any other store access.

use std::collections::{BTreeSet, HashMap};

use super::{parse_uuid, reindex_exercises, Database, StoreError};

impl Database {
    /// Merges duplicate routine rows so at most one routine exists per day.
    ///
    /// Routines are scanned in a stable day-sorted order; the first row per
    /// day is canonical. Every later row for the same day has its exercises
    /// reparented onto the canonical row and is then deleted, so no
    /// exercise (or anything beneath it) is lost. The canonical routine's
    /// exercises are reindexed afterwards to restore contiguous order.
    ///
    /// Running with no duplicates present is a no-op. Returns the number of
    /// duplicate rows merged away.
    pub fn reconcile_routines(&self) -> Result<usize, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT id, day FROM routines ORDER BY day, rowid")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);

        let mut canonical: HashMap<i64, String> = HashMap::new();
        let mut duplicates: Vec<(String, i64)> = Vec::new();
        for (id, day) in rows {
            if canonical.contains_key(&day) {
                duplicates.push((id, day));
            } else {
                canonical.insert(day, id);
            }
        }

        if duplicates.is_empty() {
            return Ok(0);
        }

        let tx = conn.unchecked_transaction()?;
        for (dupe_id, day) in &duplicates {
            let primary = &canonical[day];
            tx.execute(
                "UPDATE exercises SET routine_id = ? WHERE routine_id = ?",
                (primary, dupe_id),
            )?;
            // Exercises are reparented, so the cascade only removes the row
            tx.execute("DELETE FROM routines WHERE id = ?", [dupe_id])?;
        }
        let affected_days: BTreeSet<i64> = duplicates.iter().map(|(_, day)| *day).collect();
        for day in affected_days {
            reindex_exercises(&tx, parse_uuid(canonical[&day].clone()))?;
        }
        tx.commit()?;
        drop(conn);

        let merged = duplicates.len();
        tracing::info!("Reconciled {} duplicate routine row(s)", merged);
        self.bump();
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use crate::db::Database;
    use crate::models::CreateExerciseInput;

    fn setup() -> Database {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    /// Inserts a routine row directly, bypassing the get-or-create path that
    /// would otherwise refuse to create a duplicate.
    fn insert_routine_row(db: &Database, day: i64) -> Uuid {
        let id = Uuid::new_v4();
        db.lock()
            .execute(
                "INSERT INTO routines (id, day, last_updated) VALUES (?, ?, ?)",
                (id.to_string(), day, chrono::Utc::now().to_rfc3339()),
            )
            .unwrap();
        id
    }

    fn add_named(db: &Database, routine_id: Uuid, name: &str) {
        db.add_exercise(
            routine_id,
            CreateExerciseInput {
                name: name.to_string(),
                is_warmup: false,
                note: None,
            },
        )
        .unwrap();
    }

    #[test]
    fn merges_three_duplicates_without_losing_exercises() {
        let db = setup();

        // Three rows for day 2 holding 2, 1, and 3 exercises
        let first = insert_routine_row(&db, 2);
        let second = insert_routine_row(&db, 2);
        let third = insert_routine_row(&db, 2);
        add_named(&db, first, "Squat");
        add_named(&db, first, "Bench Press");
        add_named(&db, second, "Deadlift");
        add_named(&db, third, "Row");
        add_named(&db, third, "Pull-Up");
        add_named(&db, third, "Curl");

        let merged = db.reconcile_routines().unwrap();
        assert_eq!(merged, 2);

        let routines = db.all_routines().unwrap();
        assert_eq!(routines.len(), 1);
        // First row in the day-sorted scan is canonical
        assert_eq!(routines[0].id, first);

        let exercises = db.exercises_for_day(2).unwrap();
        assert_eq!(exercises.len(), 6);
        let indices: Vec<i64> = exercises.iter().map(|e| e.order_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn no_duplicates_is_a_noop() {
        let db = setup();
        db.get_or_create_routine(0).unwrap();
        db.get_or_create_routine(3).unwrap();

        let before = db.change_count();
        assert_eq!(db.reconcile_routines().unwrap(), 0);
        assert_eq!(db.all_routines().unwrap().len(), 2);
        assert_eq!(db.change_count(), before);
    }

    #[test]
    fn second_run_after_a_merge_is_a_noop() {
        let db = setup();
        insert_routine_row(&db, 4);
        insert_routine_row(&db, 4);

        assert_eq!(db.reconcile_routines().unwrap(), 1);
        assert_eq!(db.reconcile_routines().unwrap(), 0);
        assert_eq!(db.all_routines().unwrap().len(), 1);
    }

    #[test]
    fn duplicates_across_multiple_days_each_collapse() {
        let db = setup();
        insert_routine_row(&db, 1);
        insert_routine_row(&db, 1);
        insert_routine_row(&db, 5);
        insert_routine_row(&db, 5);
        insert_routine_row(&db, 6);

        assert_eq!(db.reconcile_routines().unwrap(), 2);
        let days: Vec<i64> = db.all_routines().unwrap().iter().map(|r| r.day).collect();
        assert_eq!(days, vec![1, 5, 6]);
    }
}
