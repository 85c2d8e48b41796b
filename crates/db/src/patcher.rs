//! Applies [`SchemaPatch`]es to a live database.
//!
//! Each step is executed on its own; a "column already exists" error is
//! downgraded to [`PatchOutcome::AlreadyPresent`] and the run continues.
//! Any other error stops the patch immediately.

use cinerp_core::schema_patch::{
    is_duplicate_column, PatchOutcome, PatchReport, SchemaPatch, StepReport,
};

use crate::{Db, DbError};

/// Apply every step of `patch` in order.
///
/// With `dry_run` the SQL is rendered and reported as
/// [`PatchOutcome::Planned`] without touching the database.
pub async fn apply_patch(
    db: &Db,
    patch: &SchemaPatch,
    dry_run: bool,
) -> Result<PatchReport, DbError> {
    let mut steps = Vec::with_capacity(patch.steps.len());

    for step in &patch.steps {
        let sql = step.to_sql(db.dialect);
        let label = step.label();

        let outcome = if dry_run {
            tracing::info!(patch = patch.name, step = %label, %sql, "Planned");
            PatchOutcome::Planned
        } else {
            match sqlx::query(&sql).execute(&db.pool).await {
                Ok(_) => {
                    tracing::info!(patch = patch.name, step = %label, "Applied");
                    PatchOutcome::Applied
                }
                Err(err) if is_already_present(&err) => {
                    tracing::info!(patch = patch.name, step = %label, "Already present, skipping");
                    PatchOutcome::AlreadyPresent
                }
                Err(source) => {
                    tracing::error!(
                        patch = patch.name,
                        step = %label,
                        error = %source,
                        "Patch step failed"
                    );
                    return Err(DbError::Patch {
                        patch: patch.name,
                        step: label,
                        source,
                    });
                }
            }
        };

        steps.push(StepReport {
            label,
            sql,
            outcome,
        });
    }

    Ok(PatchReport {
        patch: patch.name,
        steps,
    })
}

/// Apply several patches in order, stopping at the first hard failure.
pub async fn apply_all(
    db: &Db,
    patches: &[SchemaPatch],
    dry_run: bool,
) -> Result<Vec<PatchReport>, DbError> {
    let mut reports = Vec::with_capacity(patches.len());
    for patch in patches {
        reports.push(apply_patch(db, patch, dry_run).await?);
    }
    Ok(reports)
}

fn is_already_present(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            is_duplicate_column(db_err.code().as_deref(), db_err.message())
        }
        _ => false,
    }
}
