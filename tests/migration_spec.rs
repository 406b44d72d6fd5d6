use chrono::{Duration, Utc};
use setdeck::db::Database;
use setdeck::migration::{LegacyMigrator, MigrationStatus};
use setdeck::models::*;
use uuid::Uuid;

fn setup() -> Database {
    let db = Database::open_memory().expect("Failed to create in-memory database");
    db.migrate().expect("Failed to run migrations");
    db
}

fn seed_legacy_exercise(db: &Database, weekday: i64, order_index: i64, name: &str) -> Uuid {
    let exercise = LegacyExercise {
        id: Uuid::new_v4(),
        weekday,
        order_index,
        name: name.to_string(),
    };
    db.insert_legacy_exercise(&exercise)
        .expect("Failed to seed legacy exercise");
    exercise.id
}

fn seed_legacy_set(db: &Database, exercise_id: Uuid, goal_type: GoalType, offset_minutes: i64) {
    db.insert_legacy_set(&LegacySet {
        id: Uuid::new_v4(),
        exercise_id,
        goal_type,
        repetitions_to_do: 5,
        duration_to_do: 30,
        weight_to_lift: 100,
        timestamp: Utc::now() + Duration::minutes(offset_minutes),
    })
    .expect("Failed to seed legacy set");
}

mod empty_legacy_store {
    use super::*;

    #[tokio::test]
    async fn completes_immediately_without_creating_anything() {
        let db = setup();
        let migrator = LegacyMigrator::new(db.clone());

        migrator.perform_migration().await.expect("Migration failed");

        assert_eq!(migrator.status(), MigrationStatus::Completed);
        assert_eq!(db.routine_count().unwrap(), 0);
        assert_eq!(db.exercise_count().unwrap(), 0);
    }
}

mod field_mapping {
    use super::*;

    #[tokio::test]
    async fn maps_weight_and_duration_goals_onto_the_new_model() {
        let db = setup();

        // Weekday 3: one weight-goal exercise, one duration-goal exercise
        let lifting = seed_legacy_exercise(&db, 3, 0, "Bench Press");
        seed_legacy_set(&db, lifting, GoalType::Weight, 0);
        let holding = seed_legacy_exercise(&db, 3, 1, "Plank");
        seed_legacy_set(&db, holding, GoalType::Duration, 0);

        let migrator = LegacyMigrator::new(db.clone());
        migrator.perform_migration().await.expect("Migration failed");

        assert_eq!(migrator.status(), MigrationStatus::Completed);

        let routines = db.all_routines().unwrap();
        assert_eq!(routines.len(), 1);
        assert_eq!(routines[0].day, 3);

        let exercises = db.exercises_for_day(3).unwrap();
        assert_eq!(exercises.len(), 2);
        assert_eq!(exercises[0].name, "Bench Press");
        assert_eq!(exercises[1].name, "Plank");

        let reps_sets = db.sets_for_exercise(exercises[0].id).unwrap();
        assert_eq!(reps_sets.len(), 1);
        assert_eq!(reps_sets[0].set_type, SetType::Reps);
        assert_eq!(reps_sets[0].target_reps, Some(5));
        assert_eq!(reps_sets[0].weight, Some(100.0));
        assert_eq!(reps_sets[0].target_duration, None);

        let duration_sets = db.sets_for_exercise(exercises[1].id).unwrap();
        assert_eq!(duration_sets.len(), 1);
        assert_eq!(duration_sets[0].set_type, SetType::Duration);
        assert_eq!(duration_sets[0].target_duration, Some(30.0));
        assert_eq!(duration_sets[0].target_reps, None);
        assert_eq!(duration_sets[0].weight, None);

        assert!(db.legacy_migration_complete().unwrap());
    }

    #[tokio::test]
    async fn preserves_legacy_exercise_and_set_order() {
        let db = setup();

        let second = seed_legacy_exercise(&db, 5, 1, "Row");
        let first = seed_legacy_exercise(&db, 5, 0, "Deadlift");
        // Three sets on the first exercise, seeded out of timestamp order
        seed_legacy_set(&db, first, GoalType::Weight, 20);
        seed_legacy_set(&db, first, GoalType::Weight, 0);
        seed_legacy_set(&db, first, GoalType::Duration, 10);
        seed_legacy_set(&db, second, GoalType::Weight, 0);

        let migrator = LegacyMigrator::new(db.clone());
        migrator.perform_migration().await.expect("Migration failed");

        let exercises = db.exercises_for_day(5).unwrap();
        assert_eq!(exercises.len(), 2);
        assert_eq!(exercises[0].name, "Deadlift");
        assert_eq!(exercises[0].order_index, 0);
        assert_eq!(exercises[1].name, "Row");
        assert_eq!(exercises[1].order_index, 1);

        // Sets keep timestamp order and get contiguous indices
        let sets = db.sets_for_exercise(exercises[0].id).unwrap();
        assert_eq!(sets.len(), 3);
        let indices: Vec<i64> = sets.iter().map(|s| s.order_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(sets[0].set_type, SetType::Reps);
        assert_eq!(sets[1].set_type, SetType::Duration);
        assert_eq!(sets[2].set_type, SetType::Reps);
    }

    #[tokio::test]
    async fn creates_one_routine_per_distinct_weekday() {
        let db = setup();
        seed_legacy_exercise(&db, 6, 0, "Squat");
        seed_legacy_exercise(&db, 1, 0, "Bench Press");
        seed_legacy_exercise(&db, 1, 1, "Row");

        let migrator = LegacyMigrator::new(db.clone());
        migrator.perform_migration().await.expect("Migration failed");

        let days: Vec<i64> = db.all_routines().unwrap().iter().map(|r| r.day).collect();
        assert_eq!(days, vec![1, 6]);
        assert_eq!(db.exercise_count().unwrap(), 3);
    }
}

mod idempotence {
    use super::*;

    #[tokio::test]
    async fn a_second_run_creates_nothing() {
        let db = setup();
        let exercise = seed_legacy_exercise(&db, 2, 0, "Squat");
        seed_legacy_set(&db, exercise, GoalType::Weight, 0);

        let migrator = LegacyMigrator::new(db.clone());
        migrator.perform_migration().await.expect("Migration failed");

        let routines = db.routine_count().unwrap();
        let exercises = db.exercise_count().unwrap();
        let sets = db.set_count().unwrap();

        migrator.perform_migration().await.expect("Second run failed");

        assert_eq!(migrator.status(), MigrationStatus::Completed);
        assert_eq!(db.routine_count().unwrap(), routines);
        assert_eq!(db.exercise_count().unwrap(), exercises);
        assert_eq!(db.set_count().unwrap(), sets);
    }

    #[tokio::test]
    async fn a_fresh_migrator_also_short_circuits() {
        let db = setup();
        seed_legacy_exercise(&db, 2, 0, "Squat");
        db.get_or_create_routine(0).unwrap();

        let migrator = LegacyMigrator::new(db.clone());
        migrator.perform_migration().await.expect("Migration failed");

        assert_eq!(migrator.status(), MigrationStatus::Completed);
        assert_eq!(db.routine_count().unwrap(), 1);
        assert_eq!(db.exercise_count().unwrap(), 0);
    }
}

mod progress_reporting {
    use super::*;

    #[tokio::test]
    async fn progress_is_non_decreasing_and_ends_at_completed() {
        let db = setup();
        for day in [0, 2, 4] {
            let exercise = seed_legacy_exercise(&db, day, 0, "Squat");
            seed_legacy_set(&db, exercise, GoalType::Weight, 0);
            seed_legacy_set(&db, exercise, GoalType::Duration, 1);
        }

        let migrator = LegacyMigrator::new(db.clone());
        let mut rx = migrator.subscribe();
        let observer = tokio::spawn(async move {
            let mut seen = Vec::new();
            while rx.changed().await.is_ok() {
                let status = rx.borrow_and_update().clone();
                let done = matches!(
                    status,
                    MigrationStatus::Completed | MigrationStatus::Failed { .. }
                );
                seen.push(status);
                if done {
                    break;
                }
            }
            seen
        });

        migrator.perform_migration().await.expect("Migration failed");
        let seen = observer.await.expect("Observer task failed");

        assert_eq!(seen.last(), Some(&MigrationStatus::Completed));

        let progresses: Vec<f64> = seen
            .iter()
            .filter_map(|s| match s {
                MigrationStatus::Running { progress, .. } => Some(*progress),
                _ => None,
            })
            .collect();
        assert!(!progresses.is_empty());
        assert!(progresses.iter().all(|p| (0.0..=1.0).contains(p)));
        assert!(progresses.windows(2).all(|w| w[0] <= w[1]));
    }
}
