//! Read-only schema checks, used by `status` and by the tests.

use cinerp_core::dialect::{Dialect, Ident};
use cinerp_core::schema_patch::{PatchStep, SchemaPatch};
use serde::Serialize;

use crate::{Db, DbError};

#[derive(Debug, Clone, Serialize)]
pub struct StepStatus {
    pub label: String,
    pub present: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatchStatus {
    pub patch: &'static str,
    pub steps: Vec<StepStatus>,
}

impl PatchStatus {
    /// `true` when every table and column of the patch exists.
    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.present)
    }
}

pub async fn table_exists(db: &Db, table: &Ident) -> Result<bool, DbError> {
    let sql = match db.dialect {
        Dialect::Postgres => {
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = $1"
        }
        Dialect::Sqlite => "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
    };
    let count: i64 = sqlx::query_scalar(sql)
        .bind(table.as_str())
        .fetch_one(&db.pool)
        .await?;
    Ok(count > 0)
}

pub async fn column_exists(db: &Db, table: &Ident, column: &Ident) -> Result<bool, DbError> {
    let sql = match db.dialect {
        Dialect::Postgres => {
            "SELECT COUNT(*) FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1 AND column_name = $2"
        }
        Dialect::Sqlite => "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
    };
    let count: i64 = sqlx::query_scalar(sql)
        .bind(table.as_str())
        .bind(column.as_str())
        .fetch_one(&db.pool)
        .await?;
    Ok(count > 0)
}

/// Report which steps of `patch` are already reflected in the schema.
pub async fn patch_status(db: &Db, patch: &SchemaPatch) -> Result<PatchStatus, DbError> {
    let mut steps = Vec::with_capacity(patch.steps.len());
    for step in &patch.steps {
        let present = match step {
            PatchStep::CreateTable(t) => table_exists(db, &t.table).await?,
            PatchStep::AddColumn(c) => column_exists(db, &c.table, &c.column.name).await?,
        };
        steps.push(StepStatus {
            label: step.label(),
            present,
        });
    }
    Ok(PatchStatus {
        patch: patch.name,
        steps,
    })
}
