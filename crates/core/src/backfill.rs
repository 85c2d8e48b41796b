//! Rewriting a single-valued legacy column into a JSON-array column.
//!
//! The target column is plain `TEXT` holding a JSON array so the same
//! data works on SQLite and Postgres. Only rows whose target is still
//! `NULL` are selected, which makes the backfill safe to re-run.

use serde::Serialize;

use crate::dialect::{Dialect, Ident};
use crate::CoreError;

/// Serialized form of an empty list.
pub const EMPTY_LIST: &str = "[]";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackfillPlan {
    pub table: Ident,
    pub key_column: Ident,
    pub legacy_column: Ident,
    pub target_column: Ident,
}

impl BackfillPlan {
    pub fn new(
        table: &str,
        key_column: &str,
        legacy_column: &str,
        target_column: &str,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            table: Ident::new(table)?,
            key_column: Ident::new(key_column)?,
            legacy_column: Ident::new(legacy_column)?,
            target_column: Ident::new(target_column)?,
        })
    }

    /// Rows still waiting for the rewrite, as `(key, legacy value)`.
    ///
    /// Both columns are cast so the row decodes as `(i64, Option<String>)`
    /// whatever the declared column types are.
    pub fn select_sql(&self) -> String {
        format!(
            "SELECT CAST({key} AS BIGINT), CAST({legacy} AS TEXT) FROM {table} \
             WHERE {target} IS NULL ORDER BY {key}",
            key = self.key_column,
            legacy = self.legacy_column,
            table = self.table,
            target = self.target_column,
        )
    }

    /// Single-row update binding `(target value, key)`.
    ///
    /// The `IS NULL` guard keeps a concurrent manual edit from being
    /// overwritten between the select and the update.
    pub fn update_sql(&self, dialect: Dialect) -> String {
        format!(
            "UPDATE {table} SET {target} = {p1} WHERE {key} = {p2} AND {target} IS NULL",
            table = self.table,
            target = self.target_column,
            key = self.key_column,
            p1 = dialect.placeholder(1),
            p2 = dialect.placeholder(2),
        )
    }
}

/// Encode one legacy value as a JSON array string.
///
/// - `NULL` or blank becomes `[]`.
/// - A value that already parses as a JSON array is kept (re-serialized
///   compactly) so partially migrated rows are not double-wrapped.
/// - Anything else becomes a one-element array of the trimmed value.
pub fn encode_legacy_value(value: Option<&str>) -> String {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return EMPTY_LIST.to_string();
    };

    if raw.starts_with('[') {
        if let Ok(serde_json::Value::Array(items)) = serde_json::from_str(raw) {
            return serde_json::Value::Array(items).to_string();
        }
    }

    serde_json::Value::Array(vec![serde_json::Value::String(raw.to_string())]).to_string()
}

/// Counts from one backfill run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    /// Rows whose target column was `NULL`.
    pub scanned: u64,
    /// Rows updated (or that would be, on a dry run).
    pub rewritten: u64,
    /// Subset of `rewritten` that received `[]` because the legacy value was empty.
    pub emptied: u64,
    pub dry_run: bool,
}
