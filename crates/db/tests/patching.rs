//! Schema patcher against an in-memory SQLite database.

use assert_matches::assert_matches;
use cinerp_core::catalog;
use cinerp_core::dialect::{Dialect, Ident};
use cinerp_core::schema_patch::PatchOutcome;
use cinerp_db::introspect::{column_exists, patch_status, table_exists};
use cinerp_db::patcher::{apply_all, apply_patch};
use cinerp_db::{Db, DbError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fresh database with the pre-patch ERP tables.
async fn legacy_db() -> Db {
    let db = cinerp_db::connect("sqlite::memory:").await.unwrap();
    assert_eq!(db.dialect, Dialect::Sqlite);
    for sql in [
        "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT NOT NULL)",
        "CREATE TABLE locations (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
        "CREATE TABLE project_locations (id INTEGER PRIMARY KEY, location_id INTEGER, stage TEXT)",
    ] {
        sqlx::query(sql).execute(&db.pool).await.unwrap();
    }
    db
}

fn ident(name: &str) -> Ident {
    Ident::new(name).unwrap()
}

async fn column_count(db: &Db, table: &str, column: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2")
        .bind(table)
        .bind(column)
        .fetch_one(&db.pool)
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_passes() {
    let db = legacy_db().await;
    cinerp_db::health_check(&db).await.unwrap();
}

#[tokio::test]
async fn unsupported_url_is_rejected_before_connecting() {
    let err = cinerp_db::connect("mysql://localhost/erp").await.unwrap_err();
    assert_matches!(err, DbError::Core(_));
}

#[tokio::test]
async fn first_run_applies_user_type() {
    let db = legacy_db().await;
    let patch = catalog::find(catalog::USER_TYPE).unwrap();

    let report = apply_patch(&db, &patch, false).await.unwrap();

    assert_eq!(report.count(PatchOutcome::Applied), 1);
    assert!(column_exists(&db, &ident("users"), &ident("user_type"))
        .await
        .unwrap());
}

#[tokio::test]
async fn second_run_reports_already_present() {
    let db = legacy_db().await;
    let patch = catalog::find(catalog::LOCATION_DETAILS).unwrap();

    let first = apply_patch(&db, &patch, false).await.unwrap();
    let second = apply_patch(&db, &patch, false).await.unwrap();

    assert_eq!(first.count(PatchOutcome::Applied), patch.steps.len());
    assert_eq!(second.count(PatchOutcome::AlreadyPresent), patch.steps.len());
    assert_eq!(column_count(&db, "locations", "latitude").await, 1);
    assert_eq!(column_count(&db, "locations", "photos").await, 1);
}

#[tokio::test]
async fn existing_column_with_default_keeps_rows() {
    let db = legacy_db().await;
    sqlx::query("INSERT INTO users (email) VALUES ('grip@example.com')")
        .execute(&db.pool)
        .await
        .unwrap();

    let patch = catalog::find(catalog::USER_TYPE).unwrap();
    apply_patch(&db, &patch, false).await.unwrap();

    let user_type: String = sqlx::query_scalar("SELECT user_type FROM users")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(user_type, "crew");
}

#[tokio::test]
async fn create_table_step_then_columns() {
    let db = legacy_db().await;
    let patch = catalog::find(catalog::STAGE_TRACKING).unwrap();

    apply_patch(&db, &patch, false).await.unwrap();
    let again = apply_patch(&db, &patch, false).await.unwrap();

    assert!(table_exists(&db, &ident("project_location_stages"))
        .await
        .unwrap());
    // CREATE TABLE IF NOT EXISTS succeeds quietly; the column adds hit the duplicate path.
    assert_eq!(again.steps[0].outcome, PatchOutcome::Applied);
    assert!(again.steps[1..]
        .iter()
        .all(|s| s.outcome == PatchOutcome::AlreadyPresent));
}

#[tokio::test]
async fn dry_run_leaves_schema_untouched() {
    let db = legacy_db().await;
    let patch = catalog::find(catalog::USER_TYPE).unwrap();

    let report = apply_patch(&db, &patch, true).await.unwrap();

    assert_eq!(report.count(PatchOutcome::Planned), 1);
    assert_eq!(
        report.steps[0].sql,
        "ALTER TABLE users ADD COLUMN user_type TEXT DEFAULT 'crew'"
    );
    assert!(!column_exists(&db, &ident("users"), &ident("user_type"))
        .await
        .unwrap());
}

#[tokio::test]
async fn missing_table_aborts_with_context() {
    let db = cinerp_db::connect("sqlite::memory:").await.unwrap();
    let patch = catalog::find(catalog::USER_TYPE).unwrap();

    let err = apply_patch(&db, &patch, false).await.unwrap_err();

    assert_matches!(
        err,
        DbError::Patch { patch: "user_type", ref step, .. } if step == "users.user_type"
    );
}

#[tokio::test]
async fn status_tracks_progress() {
    let db = legacy_db().await;
    let patch = catalog::find(catalog::LOCATION_STAGE_LIST).unwrap();

    let before = patch_status(&db, &patch).await.unwrap();
    apply_patch(&db, &patch, false).await.unwrap();
    let after = patch_status(&db, &patch).await.unwrap();

    assert!(!before.is_complete());
    assert!(after.is_complete());
}

#[tokio::test]
async fn whole_catalog_is_idempotent() {
    let db = legacy_db().await;
    let patches = catalog::all().unwrap();

    apply_all(&db, &patches, false).await.unwrap();
    let rerun = apply_all(&db, &patches, false).await.unwrap();

    for report in &rerun {
        assert_eq!(report.count(PatchOutcome::Planned), 0);
        for step in report.steps.iter().filter(|s| !s.label.starts_with("table ")) {
            assert_eq!(
                step.outcome,
                PatchOutcome::AlreadyPresent,
                "{} re-applied on second run",
                step.label
            );
        }
    }
    for patch in &patches {
        assert!(patch_status(&db, patch).await.unwrap().is_complete());
    }
}
