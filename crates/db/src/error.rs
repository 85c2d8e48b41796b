use cinerp_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Patch {patch} failed at {step}: {source}")]
    Patch {
        patch: &'static str,
        step: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Backfill of {table}.{column} failed: {source}")]
    Backfill {
        table: String,
        column: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Database error: {0}")]
    Query(#[from] sqlx::Error),
}
