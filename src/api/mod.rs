mod handlers;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::Database;
use crate::migration::LegacyMigrator;

/// Everything the HTTP layer needs: the store plus the migration driver.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub migrator: LegacyMigrator,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        let migrator = LegacyMigrator::new(db.clone());
        Self { db, migrator }
    }
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        // Routines
        .route("/routines", get(handlers::list_routines))
        .route("/routines/{day}", put(handlers::get_or_create_routine))
        .route("/routines/{day}/exercises", get(handlers::list_exercises))
        .route("/routines/{day}/exercises", post(handlers::add_exercise))
        .route("/routines/{day}/exercises/order", put(handlers::reorder_exercises))
        // Exercises (by exercise id)
        .route("/exercises/{id}", get(handlers::get_exercise))
        .route("/exercises/{id}", put(handlers::update_exercise))
        .route("/exercises/{id}", delete(handlers::delete_exercise))
        .route("/exercises/{id}/sets", get(handlers::list_sets))
        .route("/exercises/{id}/sets", post(handlers::add_set))
        .route("/exercises/{id}/sets/order", put(handlers::reorder_sets))
        .route("/exercises/{id}/history", get(handlers::exercise_history))
        // Sets
        .route("/sets/{id}", put(handlers::update_set))
        .route("/sets/{id}", delete(handlers::delete_set))
        .route("/sets/{id}/history", post(handlers::record_history))
        .route("/sets/{id}/complete", post(handlers::complete_set))
        // History
        .route("/history", get(handlers::all_history))
        .route("/history", delete(handlers::clear_history))
        // Cheap change polling for reactive clients
        .route("/changes", get(handlers::changes))
        // Legacy migration
        .route("/migration/status", get(handlers::migration_status))
        .route("/migration", post(handlers::start_migration))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
