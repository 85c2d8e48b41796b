//! Database commands: `list`, `patch`, `status`, `backfill`, `migrate`.
//!
//! Every command opens one connection, checks it, does its work and
//! closes the pool before returning.

use std::path::Path;

use anyhow::{Context, Result};
use cinerp_core::catalog;
use cinerp_core::schema_patch::PatchOutcome;
use cinerp_db::Db;

use crate::config::OpsConfig;
use crate::output::{print_json, print_table};

async fn open(config: &OpsConfig) -> Result<Db> {
    let url = config.database_url()?;
    let db = cinerp_db::connect(url)
        .await
        .context("Failed to connect to database")?;
    checked(db).await
}

/// Health-check a fresh connection, closing the pool when it fails.
async fn checked(db: Db) -> Result<Db> {
    if let Err(e) = cinerp_db::health_check(&db).await {
        db.close().await;
        return Err(e).context("Database health check failed");
    }
    tracing::info!(dialect = %db.dialect, "Connected");
    Ok(db)
}

pub fn list(json: bool) -> Result<()> {
    let patches = catalog::all()?;
    let backfill = catalog::stage_backfill()?;

    if json {
        return print_json(&serde_json::json!({
            "patches": patches,
            "backfill": backfill,
        }));
    }

    let rows = patches
        .iter()
        .map(|p| {
            vec![
                p.name.to_string(),
                p.steps.len().to_string(),
                p.description.to_string(),
            ]
        })
        .collect();
    print_table(&["patch", "steps", "description"], rows);
    println!();
    println!(
        "backfill: {table}.{legacy} -> {table}.{target} (keyed by {key})",
        table = backfill.table,
        legacy = backfill.legacy_column,
        target = backfill.target_column,
        key = backfill.key_column,
    );
    Ok(())
}

pub async fn patch(config: &OpsConfig, names: &[String], dry_run: bool, json: bool) -> Result<()> {
    let patches = catalog::select(names)?;
    let db = open(config).await?;

    let result = cinerp_db::patcher::apply_all(&db, &patches, dry_run).await;
    db.close().await;
    let reports = result?;

    if json {
        return print_json(&reports);
    }

    let mut rows = Vec::new();
    for report in &reports {
        for step in &report.steps {
            let mut row = vec![
                report.patch.to_string(),
                step.label.clone(),
                step.outcome.to_string(),
            ];
            if dry_run {
                row.push(step.sql.clone());
            }
            rows.push(row);
        }
    }
    let headers: &[&str] = if dry_run {
        &["patch", "step", "outcome", "sql"]
    } else {
        &["patch", "step", "outcome"]
    };
    print_table(headers, rows);

    let applied: usize = reports.iter().map(|r| r.count(PatchOutcome::Applied)).sum();
    let present: usize = reports
        .iter()
        .map(|r| r.count(PatchOutcome::AlreadyPresent))
        .sum();
    println!();
    if dry_run {
        println!("dry run: nothing executed");
    } else {
        println!("{applied} applied, {present} already present");
    }
    Ok(())
}

pub async fn status(config: &OpsConfig, names: &[String], json: bool) -> Result<()> {
    let patches = catalog::select(names)?;
    let db = open(config).await?;

    let mut statuses = Vec::with_capacity(patches.len());
    let mut failure = None;
    for patch in &patches {
        match cinerp_db::introspect::patch_status(&db, patch).await {
            Ok(status) => statuses.push(status),
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }
    db.close().await;
    if let Some(e) = failure {
        return Err(e).context("Schema introspection failed");
    }

    if json {
        return print_json(&statuses);
    }

    let rows = statuses
        .iter()
        .flat_map(|s| {
            s.steps.iter().map(move |step| {
                vec![
                    s.patch.to_string(),
                    step.label.clone(),
                    if step.present { "present" } else { "missing" }.to_string(),
                ]
            })
        })
        .collect();
    print_table(&["patch", "step", "state"], rows);
    Ok(())
}

pub async fn backfill(config: &OpsConfig, dry_run: bool, json: bool) -> Result<()> {
    let plan = catalog::stage_backfill()?;
    let db = open(config).await?;

    let result = cinerp_db::backfill::run_backfill(&db, &plan, dry_run).await;
    db.close().await;
    let report = result?;

    if json {
        return print_json(&report);
    }
    println!(
        "{table}.{target}: {scanned} rows without a value, \
         {rewritten} rewritten ({emptied} as []){suffix}",
        table = plan.table,
        target = plan.target_column,
        scanned = report.scanned,
        rewritten = report.rewritten,
        emptied = report.emptied,
        suffix = if dry_run { ", rolled back (dry run)" } else { "" },
    );
    Ok(())
}

pub async fn migrate(config: &OpsConfig, source: &Path, json: bool) -> Result<()> {
    let db = open(config).await?;

    let result = cinerp_db::migrate::run_migrations(&db, source).await;
    db.close().await;
    let report = result.with_context(|| format!("Migrating from {}", source.display()))?;

    if json {
        return print_json(&report);
    }
    println!(
        "{} of {} migrations applied from {}",
        report.applied,
        report.available,
        source.display()
    );
    Ok(())
}
