//! Thin wrapper over the sqlx migrator for the versioned `.sql` files
//! that live alongside the backend.

use std::path::Path;

use serde::Serialize;
use sqlx::migrate::{Migrate, Migrator};

use crate::{Db, DbError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Up-migrations found in the source directory.
    pub available: usize,
    /// Of those, how many were not yet recorded before this run.
    pub applied: usize,
}

/// Apply all pending migrations from `source`.
pub async fn run_migrations(db: &Db, source: &Path) -> Result<MigrationReport, DbError> {
    let migrator = Migrator::new(source).await?;

    // Scoped so the single pooled connection is back before `run` needs it.
    let recorded: Vec<i64> = {
        let mut conn = db.pool.acquire().await?;
        conn.ensure_migrations_table().await?;
        conn.list_applied_migrations()
            .await?
            .into_iter()
            .map(|m| m.version)
            .collect()
    };

    let pending: Vec<_> = migrator
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .filter(|m| !recorded.contains(&m.version))
        .collect();
    let available = migrator
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .count();

    for m in &pending {
        tracing::info!(version = m.version, description = %m.description, "Pending migration");
    }
    let applied = pending.len();

    migrator.run(&db.pool).await?;
    tracing::info!(source = %source.display(), applied, "Migrations applied");

    Ok(MigrationReport { available, applied })
}
