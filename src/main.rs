use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use setdeck::migration::{LegacyMigrator, MigrationStatus};
use setdeck::{api, db};

#[derive(Parser)]
#[command(name = "setdeck")]
#[command(about = "Personal workout planning backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the SetDeck server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Database file (defaults to the platform data directory)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Run the one-time legacy-data migration and exit
    Migrate {
        /// Database file (defaults to the platform data directory)
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "setdeck=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn open_database(path: Option<PathBuf>) -> anyhow::Result<db::Database> {
    let database = match path {
        Some(path) => db::Database::open(path)?,
        None => db::Database::open_default()?,
    };
    database.migrate()?;
    // Repair duplicate routine rows before anything else touches the store
    database.reconcile_routines()?;
    Ok(database)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Serve { port, db }) => serve(port, db).await,
        Some(Commands::Migrate { db }) => migrate(db).await,
        None => serve(3000, None).await,
    }
}

async fn serve(port: u16, db_path: Option<PathBuf>) -> anyhow::Result<()> {
    tracing::info!("Starting SetDeck server on port {}", port);

    let database = open_database(db_path)?;
    let app = api::create_router(api::AppState::new(database));

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("SetDeck server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn migrate(db_path: Option<PathBuf>) -> anyhow::Result<()> {
    let database = open_database(db_path)?;
    let migrator = LegacyMigrator::new(database.clone());

    let mut rx = migrator.subscribe();
    let progress_log = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let status = rx.borrow_and_update().clone();
            match status {
                MigrationStatus::Preparing { message } => tracing::info!("{}", message),
                MigrationStatus::Running { message, progress } => {
                    tracing::info!("[{:>5.1}%] {}", progress * 100.0, message)
                }
                MigrationStatus::Completed => tracing::info!("Migration completed"),
                MigrationStatus::Failed { reason } => tracing::error!("{}", reason),
                MigrationStatus::Idle => {}
            }
        }
    });

    let result = migrator.perform_migration().await;
    progress_log.abort();
    result?;

    tracing::info!(
        "Store now holds {} routines, {} exercises, {} sets",
        database.routine_count()?,
        database.exercise_count()?,
        database.set_count()?,
    );
    Ok(())
}
