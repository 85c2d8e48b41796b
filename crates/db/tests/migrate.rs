//! sqlx migrator wrapper, driven from a throwaway migrations directory.

use std::fs;

use cinerp_db::migrate::run_migrations;

fn write_migrations(dir: &std::path::Path) {
    fs::write(
        dir.join("20240101000000_create_departments.sql"),
        "CREATE TABLE departments (id INTEGER PRIMARY KEY, name TEXT NOT NULL);",
    )
    .unwrap();
    fs::write(
        dir.join("20240102000000_seed_departments.sql"),
        "INSERT INTO departments (name) VALUES ('camera'), ('lighting');",
    )
    .unwrap();
}

#[tokio::test]
async fn applies_pending_then_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_migrations(dir.path());
    let db = cinerp_db::connect("sqlite::memory:").await.unwrap();

    let first = run_migrations(&db, dir.path()).await.unwrap();
    let second = run_migrations(&db, dir.path()).await.unwrap();

    assert_eq!(first.available, 2);
    assert_eq!(first.applied, 2);
    assert_eq!(second.applied, 0);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM departments")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn missing_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let db = cinerp_db::connect("sqlite::memory:").await.unwrap();

    let result = run_migrations(&db, &dir.path().join("nope")).await;

    assert!(result.is_err());
}
