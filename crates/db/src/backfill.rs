//! Row-by-row rewrite of a legacy column into its JSON-array replacement.

use cinerp_core::backfill::{encode_legacy_value, BackfillPlan, BackfillReport, EMPTY_LIST};

use crate::{Db, DbError};

/// Run `plan` inside one transaction.
///
/// Rows are read up front, then updated one at a time. A dry run counts
/// what would change and rolls the transaction back.
pub async fn run_backfill(
    db: &Db,
    plan: &BackfillPlan,
    dry_run: bool,
) -> Result<BackfillReport, DbError> {
    let wrap = |source: sqlx::Error| DbError::Backfill {
        table: plan.table.to_string(),
        column: plan.target_column.to_string(),
        source,
    };

    let mut tx = db.pool.begin().await.map_err(wrap)?;

    let rows: Vec<(i64, Option<String>)> = sqlx::query_as(&plan.select_sql())
        .fetch_all(&mut *tx)
        .await
        .map_err(wrap)?;

    let mut report = BackfillReport {
        scanned: rows.len() as u64,
        dry_run,
        ..Default::default()
    };
    tracing::info!(
        table = %plan.table,
        legacy = %plan.legacy_column,
        target = %plan.target_column,
        rows = report.scanned,
        "Backfill candidates loaded"
    );

    let update_sql = plan.update_sql(db.dialect);
    for (key, legacy) in rows {
        let encoded = encode_legacy_value(legacy.as_deref());
        let affected = sqlx::query(&update_sql)
            .bind(encoded.as_str())
            .bind(key)
            .execute(&mut *tx)
            .await
            .map_err(wrap)?
            .rows_affected();

        if affected == 0 {
            tracing::warn!(key, "Row changed underneath the backfill, skipped");
            continue;
        }
        tracing::debug!(key, value = %encoded, "Row rewritten");
        report.rewritten += 1;
        if encoded == EMPTY_LIST {
            report.emptied += 1;
        }
    }

    if dry_run {
        tx.rollback().await.map_err(wrap)?;
        tracing::info!(rewritten = report.rewritten, "Dry run, changes rolled back");
    } else {
        tx.commit().await.map_err(wrap)?;
        tracing::info!(
            rewritten = report.rewritten,
            emptied = report.emptied,
            "Backfill committed"
        );
    }

    Ok(report)
}
