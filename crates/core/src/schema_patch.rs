//! Schema patch types and SQL rendering.
//!
//! A [`SchemaPatch`] is a named, ordered list of [`PatchStep`]s. Each step
//! renders to exactly one DDL statement. Steps are written so that
//! re-running them is harmless: `CREATE TABLE IF NOT EXISTS` for tables,
//! and `ADD COLUMN` whose "already exists" failure is classified by
//! [`is_duplicate_column`] and treated as success.

use std::fmt;

use serde::Serialize;

use crate::dialect::{Dialect, Ident};
use crate::CoreError;

/// Postgres SQLSTATE `duplicate_column`.
pub const PG_DUPLICATE_COLUMN: &str = "42701";

/// Postgres SQLSTATE `duplicate_table`.
pub const PG_DUPLICATE_TABLE: &str = "42P07";

// ---------------------------------------------------------------------------
// Column types and defaults
// ---------------------------------------------------------------------------

/// Column types used by the ERP schema, portable across both dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Auto-incrementing primary key.
    Id,
    Integer,
    BigInt,
    Real,
    Boolean,
    Text,
    Timestamp,
}

impl ColumnType {
    pub fn to_sql(&self, dialect: Dialect) -> &'static str {
        match (self, dialect) {
            (Self::Id, Dialect::Postgres) => "BIGSERIAL PRIMARY KEY",
            (Self::Id, Dialect::Sqlite) => "INTEGER PRIMARY KEY AUTOINCREMENT",
            (Self::Integer, _) => "INTEGER",
            (Self::BigInt, _) => "BIGINT",
            (Self::Real, _) => "REAL",
            (Self::Boolean, _) => "BOOLEAN",
            (Self::Text, _) => "TEXT",
            (Self::Timestamp, _) => "TIMESTAMP",
        }
    }
}

/// Literal used in a `DEFAULT` clause.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
    CurrentTimestamp,
}

impl DefaultValue {
    pub fn to_sql(&self) -> String {
        match self {
            Self::Text(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Integer(n) => n.to_string(),
            Self::Boolean(true) => "TRUE".into(),
            Self::Boolean(false) => "FALSE".into(),
            Self::CurrentTimestamp => "CURRENT_TIMESTAMP".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// Column definition inside a `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDef {
    pub name: Ident,
    pub column_type: ColumnType,
    pub not_null: bool,
    pub default: Option<DefaultValue>,
}

impl ColumnDef {
    pub fn new(name: &str, column_type: ColumnType) -> Result<Self, CoreError> {
        Ok(Self {
            name: Ident::new(name)?,
            column_type,
            not_null: false,
            default: None,
        })
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    fn to_sql(&self, dialect: Dialect) -> String {
        let mut sql = format!("{} {}", self.name, self.column_type.to_sql(dialect));
        if self.not_null && self.column_type != ColumnType::Id {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default.to_sql());
        }
        sql
    }
}

/// `ALTER TABLE <table> ADD COLUMN <column> ...`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnPatch {
    pub table: Ident,
    pub column: ColumnDef,
}

impl ColumnPatch {
    pub fn new(table: &str, column: ColumnDef) -> Result<Self, CoreError> {
        if column.column_type == ColumnType::Id {
            return Err(CoreError::InvalidDefault {
                column: column.name.to_string(),
                reason: "primary keys cannot be added to an existing table".into(),
            });
        }
        if column.not_null && column.default.is_none() {
            return Err(CoreError::InvalidDefault {
                column: column.name.to_string(),
                reason: "NOT NULL columns need a DEFAULT when added to a populated table".into(),
            });
        }
        Ok(Self {
            table: Ident::new(table)?,
            column,
        })
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.table,
            self.column.to_sql(dialect)
        )
    }
}

/// `CREATE TABLE IF NOT EXISTS <table> (...)`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePatch {
    pub table: Ident,
    pub columns: Vec<ColumnDef>,
}

impl TablePatch {
    pub fn new(table: &str, columns: Vec<ColumnDef>) -> Result<Self, CoreError> {
        Ok(Self {
            table: Ident::new(table)?,
            columns,
        })
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        let columns: Vec<String> = self.columns.iter().map(|c| c.to_sql(dialect)).collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.table,
            columns.join(", ")
        )
    }
}

/// One DDL statement of a [`SchemaPatch`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatchStep {
    CreateTable(TablePatch),
    AddColumn(ColumnPatch),
}

impl PatchStep {
    pub fn to_sql(&self, dialect: Dialect) -> String {
        match self {
            Self::CreateTable(t) => t.to_sql(dialect),
            Self::AddColumn(c) => c.to_sql(dialect),
        }
    }

    pub fn table(&self) -> &Ident {
        match self {
            Self::CreateTable(t) => &t.table,
            Self::AddColumn(c) => &c.table,
        }
    }

    /// Short label for logs and reports, e.g. `users.user_type`.
    pub fn label(&self) -> String {
        match self {
            Self::CreateTable(t) => format!("table {}", t.table),
            Self::AddColumn(c) => format!("{}.{}", c.table, c.column.name),
        }
    }
}

/// A named group of steps applied in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaPatch {
    pub name: &'static str,
    pub description: &'static str,
    pub steps: Vec<PatchStep>,
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What happened to a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchOutcome {
    /// The statement ran and changed the schema.
    Applied,
    /// The column or table was already there; nothing changed.
    AlreadyPresent,
    /// Dry run: the statement was rendered but not executed.
    Planned,
}

impl PatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::AlreadyPresent => "already present",
            Self::Planned => "planned",
        }
    }
}

impl fmt::Display for PatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub label: String,
    pub sql: String,
    pub outcome: PatchOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatchReport {
    pub patch: &'static str,
    pub steps: Vec<StepReport>,
}

impl PatchReport {
    pub fn count(&self, outcome: PatchOutcome) -> usize {
        self.steps.iter().filter(|s| s.outcome == outcome).count()
    }
}

/// Classify a driver error as "this column/table already exists".
///
/// Postgres reports SQLSTATE 42701/42P07. SQLite only has the generic
/// `SQLITE_ERROR` code, so the message text is the only signal there.
pub fn is_duplicate_column(code: Option<&str>, message: &str) -> bool {
    if matches!(code, Some(PG_DUPLICATE_COLUMN) | Some(PG_DUPLICATE_TABLE)) {
        return true;
    }
    let message = message.to_ascii_lowercase();
    message.contains("duplicate column") || message.contains("already exists")
}
