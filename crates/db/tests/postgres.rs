//! Patcher, introspection and backfill against a real Postgres server.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -p cinerp-db -- --ignored`.
//! `#[sqlx::test]` creates a throwaway database per test.

use cinerp_core::catalog;
use cinerp_core::dialect::Dialect;
use cinerp_core::schema_patch::PatchOutcome;
use cinerp_db::backfill::run_backfill;
use cinerp_db::introspect::patch_status;
use cinerp_db::patcher::{apply_all, apply_patch};
use cinerp_db::Db;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::ConnectOptions;

async fn legacy_db(options: PgConnectOptions) -> Db {
    let db = cinerp_db::connect(options.to_url_lossy().as_str())
        .await
        .unwrap();
    assert_eq!(db.dialect, Dialect::Postgres);
    for sql in [
        "CREATE TABLE users (id BIGSERIAL PRIMARY KEY, email TEXT NOT NULL)",
        "CREATE TABLE locations (id BIGSERIAL PRIMARY KEY, name TEXT NOT NULL)",
        "CREATE TABLE project_locations (id BIGSERIAL PRIMARY KEY, location_id BIGINT, stage TEXT)",
    ] {
        sqlx::query(sql).execute(&db.pool).await.unwrap();
    }
    db
}

#[sqlx::test(migrations = false)]
#[ignore = "needs DATABASE_URL pointing at a Postgres server"]
async fn duplicate_column_is_reported_as_already_present(_pool: PgPoolOptions, options: PgConnectOptions) {
    let db = legacy_db(options).await;
    let patch = catalog::find(catalog::USER_TYPE).unwrap();

    let first = apply_patch(&db, &patch, false).await.unwrap();
    let second = apply_patch(&db, &patch, false).await.unwrap();

    assert_eq!(first.count(PatchOutcome::Applied), 1);
    assert_eq!(second.count(PatchOutcome::AlreadyPresent), 1);
    db.close().await;
}

#[sqlx::test(migrations = false)]
#[ignore = "needs DATABASE_URL pointing at a Postgres server"]
async fn status_follows_the_live_schema(_pool: PgPoolOptions, options: PgConnectOptions) {
    let db = legacy_db(options).await;
    let patches = catalog::all().unwrap();

    for patch in &patches {
        let status = patch_status(&db, patch).await.unwrap();
        assert!(!status.is_complete(), "{} reported complete", patch.name);
    }

    apply_all(&db, &patches, false).await.unwrap();
    let again = apply_all(&db, &patches, false).await.unwrap();
    for report in &again {
        assert_eq!(report.count(PatchOutcome::Planned), 0);
        for step in report.steps.iter().filter(|s| !s.label.starts_with("table ")) {
            assert_eq!(step.outcome, PatchOutcome::AlreadyPresent, "{}", step.label);
        }
    }

    for patch in &patches {
        let status = patch_status(&db, patch).await.unwrap();
        assert!(status.is_complete(), "{} still incomplete", patch.name);
    }
    db.close().await;
}

#[sqlx::test(migrations = false)]
#[ignore = "needs DATABASE_URL pointing at a Postgres server"]
async fn backfill_is_idempotent(_pool: PgPoolOptions, options: PgConnectOptions) {
    let db = legacy_db(options).await;
    for (location, stage) in [(100_i64, Some("scouting")), (101, None), (102, Some("wrap"))] {
        sqlx::query("INSERT INTO project_locations (location_id, stage) VALUES ($1, $2)")
            .bind(location)
            .bind(stage)
            .execute(&db.pool)
            .await
            .unwrap();
    }
    let patch = catalog::find(catalog::LOCATION_STAGE_LIST).unwrap();
    apply_patch(&db, &patch, false).await.unwrap();
    let plan = catalog::stage_backfill().unwrap();

    let first = run_backfill(&db, &plan, false).await.unwrap();
    let second = run_backfill(&db, &plan, false).await.unwrap();

    assert_eq!(first.rewritten, 3);
    assert_eq!(first.emptied, 1);
    assert_eq!(second.scanned, 0);

    let stages: Vec<Option<String>> =
        sqlx::query_scalar("SELECT stages FROM project_locations ORDER BY id")
            .fetch_all(&db.pool)
            .await
            .unwrap();
    assert_eq!(
        stages,
        vec![
            Some(r#"["scouting"]"#.to_string()),
            Some("[]".to_string()),
            Some(r#"["wrap"]"#.to_string()),
        ]
    );
    db.close().await;
}
