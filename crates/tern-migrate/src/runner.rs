//! Migration runner and history tracking.
//!
//! The runner applies raw SQL through a [`QueryExecutor`] and records every
//! applied migration, with the SHA-256 checksum of its text, in the history
//! table (`_tern_migrations` by default). Every database call is awaited in
//! sequence; nothing is wrapped in a transaction.
//!
//! [`get_pending`], [`detect_drift`] and [`detect_out_of_order`] are pure
//! functions over the files on disk and the recorded history.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tern_core::checksum::checksum;
use tern_core::dialect::{Dialect, DialectKind, DEFAULT_DIALECT};
use tern_core::naming::{migration_stem, parse_sequence};
use tracing::{debug, info};

use crate::error::{MigrateError, Result};
use crate::executor::{QueryExecutor, Row, SqlValue};
use crate::files::MigrationFile;

/// Default name of the history table.
pub const HISTORY_TABLE: &str = "_tern_migrations";

/// Options for [`MigrationRunner::apply`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    /// Compute everything but run nothing.
    pub dry_run: bool,
}

impl ApplyOptions {
    /// Options for a dry run.
    #[must_use]
    pub const fn dry_run() -> Self {
        Self { dry_run: true }
    }
}

/// Outcome of applying (or dry-running) one migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResult {
    /// Migration name.
    pub name: String,
    /// Migration SQL.
    pub sql: String,
    /// Checksum recorded in the history table.
    pub checksum: String,
    /// Statements executed, in order: the migration, then the history insert.
    pub statements: Vec<String>,
    /// Whether this was a dry run.
    pub dry_run: bool,
}

/// A row of the history table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedMigration {
    /// Migration name.
    pub name: String,
    /// Checksum of the SQL as it was applied.
    pub checksum: String,
    /// When the migration was applied.
    pub applied_at: DateTime<Utc>,
}

/// Applies migrations and maintains the history table.
#[derive(Debug, Clone)]
pub struct MigrationRunner<'d> {
    dialect: &'d dyn Dialect,
    table: String,
}

impl Default for MigrationRunner<'static> {
    fn default() -> Self {
        Self::new(&DEFAULT_DIALECT)
    }
}

impl<'d> MigrationRunner<'d> {
    /// Creates a runner for `dialect` using the default history table.
    #[must_use]
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self {
            dialect,
            table: HISTORY_TABLE.to_string(),
        }
    }

    /// Overrides the history table name.
    #[must_use]
    pub fn with_table_name(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// The history table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// The dialect SQL is rendered for.
    #[must_use]
    pub fn dialect(&self) -> &'d dyn Dialect {
        self.dialect
    }

    /// `CREATE TABLE IF NOT EXISTS` for the history table.
    #[must_use]
    pub fn create_history_table_sql(&self) -> String {
        let d = self.dialect;
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \"id\" {},\n    \"name\" {} NOT NULL UNIQUE,\n    \
             \"checksum\" {} NOT NULL,\n    \"applied_at\" {} NOT NULL DEFAULT {}\n)",
            d.quote_identifier(&self.table),
            d.auto_increment_primary_key(),
            d.text_type(),
            d.text_type(),
            d.timestamp_type(),
            d.current_timestamp()
        )
    }

    /// Parameterized insert of one history row (`name`, `checksum`).
    #[must_use]
    pub fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (\"name\", \"checksum\") VALUES ({}, {})",
            self.dialect.quote_identifier(&self.table),
            self.dialect.placeholder(1),
            self.dialect.placeholder(2)
        )
    }

    fn select_sql(&self) -> String {
        format!(
            "SELECT \"name\", \"checksum\", \"applied_at\" FROM {} ORDER BY \"id\"",
            self.dialect.quote_identifier(&self.table)
        )
    }

    /// Creates the history table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Query`] if the executor fails.
    pub async fn create_history_table(&self, executor: &dyn QueryExecutor) -> Result<()> {
        debug!(table = %self.table, "Ensuring history table");
        executor
            .query(&self.create_history_table_sql(), &[])
            .await
            .map_err(|e| MigrateError::query(format!("creating history table {}", self.table), e))?;
        Ok(())
    }

    /// Whether the history table exists in the current schema.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Query`] if the catalog query fails.
    pub async fn history_table_exists(&self, executor: &dyn QueryExecutor) -> Result<bool> {
        let sql = match self.dialect.kind() {
            DialectKind::Sqlite => "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
            DialectKind::Postgres => {
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_name = $1"
            }
        };
        let output = executor
            .query(sql, &[SqlValue::from(self.table.as_str())])
            .await
            .map_err(|e| MigrateError::query(format!("looking up history table {}", self.table), e))?;
        Ok(!output.rows.is_empty())
    }

    /// Applies `sql` as migration `name` and records it.
    ///
    /// A dry run returns the statements that would run without calling the
    /// executor at all.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Query`] if either statement fails. When the
    /// migration itself fails, no history row is written.
    pub async fn apply(
        &self,
        executor: &dyn QueryExecutor,
        sql: &str,
        name: &str,
        options: ApplyOptions,
    ) -> Result<ApplyResult> {
        let checksum = checksum(sql);
        let insert = self.insert_sql();
        let result = ApplyResult {
            name: name.to_string(),
            sql: sql.to_string(),
            checksum: checksum.clone(),
            statements: vec![sql.to_string(), insert.clone()],
            dry_run: options.dry_run,
        };

        if options.dry_run {
            info!(name = %name, "Dry run: migration not applied");
            return Ok(result);
        }

        info!(name = %name, "Applying migration");
        executor
            .query(sql, &[])
            .await
            .map_err(|e| MigrateError::query(format!("applying migration {name}"), e))?;
        executor
            .query(&insert, &[SqlValue::from(name), SqlValue::from(checksum)])
            .await
            .map_err(|e| MigrateError::query(format!("recording migration {name}"), e))?;
        debug!(name = %name, checksum = %result.checksum, "Migration recorded");

        Ok(result)
    }

    /// Returns applied migrations in the order they were applied.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Query`] if the history table does not exist
    /// or the query fails, and [`MigrateError::InvalidHistoryRow`] for rows
    /// that cannot be decoded.
    pub async fn get_applied(&self, executor: &dyn QueryExecutor) -> Result<Vec<AppliedMigration>> {
        let output = executor
            .query(&self.select_sql(), &[])
            .await
            .map_err(|e| MigrateError::query(format!("reading history table {}", self.table), e))?;
        output.rows.iter().map(parse_history_row).collect()
    }

    /// Applies every pending file in sequence order, stopping at the first
    /// failure. The history table must already exist.
    ///
    /// # Errors
    ///
    /// Returns the first [`MigrateError`] encountered.
    pub async fn apply_pending(
        &self,
        executor: &dyn QueryExecutor,
        files: &[MigrationFile],
        options: ApplyOptions,
    ) -> Result<Vec<ApplyResult>> {
        let applied = self.get_applied(executor).await?;
        let pending = get_pending(files, &applied);
        info!(pending = pending.len(), "Applying pending migrations");

        let mut results = Vec::with_capacity(pending.len());
        for file in pending {
            results.push(self.apply(executor, &file.sql, &file.name, options).await?);
        }
        Ok(results)
    }
}

fn text_field<'r>(row: &'r Row, field: &str) -> Result<&'r str> {
    row.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| MigrateError::InvalidHistoryRow(format!("missing or non-text column '{field}'")))
}

fn parse_applied_at(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            // SQLite datetime('now') format
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.and_utc())
        })
}

fn parse_history_row(row: &Row) -> Result<AppliedMigration> {
    let applied_at = text_field(row, "applied_at")?;
    Ok(AppliedMigration {
        name: text_field(row, "name")?.to_string(),
        checksum: text_field(row, "checksum")?.to_string(),
        applied_at: parse_applied_at(applied_at)
            .ok_or_else(|| MigrateError::InvalidHistoryRow(format!("unparseable applied_at '{applied_at}'")))?,
    })
}

fn applied_names(applied: &[AppliedMigration]) -> BTreeSet<&str> {
    applied.iter().map(|m| migration_stem(&m.name)).collect()
}

/// Files not yet applied, sorted by sequence number.
#[must_use]
pub fn get_pending<'f>(files: &'f [MigrationFile], applied: &[AppliedMigration]) -> Vec<&'f MigrationFile> {
    let applied = applied_names(applied);
    let mut pending: Vec<&MigrationFile> = files
        .iter()
        .filter(|f| !applied.contains(migration_stem(&f.name)))
        .collect();
    pending.sort_by_key(|f| (f.sequence().unwrap_or(u32::MAX), f.name.clone()));
    pending
}

/// Applied files whose current content no longer matches the recorded
/// checksum. Applied entries with no file on disk are not reported.
#[must_use]
pub fn detect_drift(files: &[MigrationFile], applied: &[AppliedMigration]) -> Vec<String> {
    files
        .iter()
        .filter(|file| {
            applied
                .iter()
                .find(|m| migration_stem(&m.name) == migration_stem(&file.name))
                .is_some_and(|m| m.checksum != checksum(&file.sql))
        })
        .map(|file| file.name.clone())
        .collect()
}

/// Pending files sequenced before an already-applied file.
#[must_use]
pub fn detect_out_of_order(files: &[MigrationFile], applied: &[AppliedMigration]) -> Vec<String> {
    let Some(latest) = applied.iter().filter_map(|m| parse_sequence(&m.name)).max() else {
        return Vec::new();
    };
    get_pending(files, applied)
        .into_iter()
        .filter(|f| f.sequence().is_some_and(|seq| seq < latest))
        .map(|f| f.name.clone())
        .collect()
}
