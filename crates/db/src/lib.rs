//! Database side of the cinerp ops tooling.
//!
//! Connections go through the sqlx `Any` driver so the same code runs
//! against the production Postgres and the local SQLite files. Each
//! command uses a single-connection pool: statements run strictly in
//! order and nothing is shared.

pub mod backfill;
pub mod error;
pub mod introspect;
pub mod migrate;
pub mod patcher;

use cinerp_core::dialect::Dialect;
use sqlx::any::AnyPoolOptions;

pub use error::DbError;

pub type DbPool = sqlx::AnyPool;

/// An open pool plus the dialect it speaks.
#[derive(Debug, Clone)]
pub struct Db {
    pub pool: DbPool,
    pub dialect: Dialect,
}

/// Open a one-connection pool for a Postgres or SQLite URL.
pub async fn connect(database_url: &str) -> Result<Db, DbError> {
    let dialect = Dialect::from_url(database_url)?;
    sqlx::any::install_default_drivers();

    let pool = AnyPoolOptions::new()
        .max_connections(1)
        .connect(database_url)
        .await
        .map_err(DbError::Connect)?;

    tracing::debug!(%dialect, "Database connection opened");
    Ok(Db { pool, dialect })
}

/// Check that the database answers a trivial query.
pub async fn health_check(db: &Db) -> Result<(), DbError> {
    sqlx::query("SELECT 1").execute(&db.pool).await?;
    Ok(())
}

impl Db {
    /// Close the pool, waiting for the connection to be released.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::debug!("Database connection closed");
    }
}
