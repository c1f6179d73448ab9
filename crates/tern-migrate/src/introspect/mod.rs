//! Live schema introspection.
//!
//! Rebuilds a [`Snapshot`] from a running database's catalog: SQLite
//! pragmas or PostgreSQL's `information_schema`/`pg_catalog`. Column types
//! are reported as the engine spells them (`INTEGER`, `character varying`,
//! ...), not as logical type names, so diffing an introspected snapshot
//! against a definition-derived one can report type changes for equivalent
//! types.
//!
//! The history table is never part of the result.

mod postgres;
mod sqlite;

use serde_json::Value;
use tern_core::dialect::DialectKind;
use tern_core::snapshot::Snapshot;
use tracing::info;

use crate::error::{MigrateError, Result};
use crate::executor::{QueryExecutor, Row, SqlValue};
use crate::runner::HISTORY_TABLE;

/// Reads a schema snapshot from a live database.
#[derive(Debug, Clone)]
pub struct Introspector {
    schema: String,
    history_table: String,
}

impl Default for Introspector {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            history_table: HISTORY_TABLE.to_string(),
        }
    }
}

impl Introspector {
    /// Creates an introspector for the `public` schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the PostgreSQL schema to read. Ignored for SQLite.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Sets the history table to exclude.
    #[must_use]
    pub fn with_history_table(mut self, table: impl Into<String>) -> Self {
        self.history_table = table.into();
        self
    }

    /// Introspects the database behind `executor`.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Query`] if a catalog query fails.
    pub async fn introspect(&self, executor: &dyn QueryExecutor, kind: DialectKind) -> Result<Snapshot> {
        let snapshot = match kind {
            DialectKind::Sqlite => sqlite::introspect(executor, &self.history_table).await?,
            DialectKind::Postgres => {
                postgres::introspect(executor, &self.schema, &self.history_table).await?
            }
        };
        info!(
            dialect = %kind,
            tables = snapshot.tables.len(),
            enums = snapshot.enums.len(),
            "Introspected schema"
        );
        Ok(snapshot)
    }
}

/// Introspects with the default settings.
///
/// # Errors
///
/// Returns [`MigrateError::Query`] if a catalog query fails.
pub async fn introspect(executor: &dyn QueryExecutor, kind: DialectKind) -> Result<Snapshot> {
    Introspector::default().introspect(executor, kind).await
}

async fn fetch(executor: &dyn QueryExecutor, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
    executor
        .query(sql, params)
        .await
        .map(|out| out.rows)
        .map_err(|e| MigrateError::query("introspecting schema", e))
}

fn text(row: &Row, field: &str) -> Option<String> {
    match row.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn int(row: &Row, field: &str) -> i64 {
    match row.get(field) {
        Some(Value::Number(n)) => n.as_i64().unwrap_or_default(),
        Some(Value::String(s)) => s.parse().unwrap_or_default(),
        Some(Value::Bool(b)) => i64::from(*b),
        _ => 0,
    }
}

fn flag(row: &Row, field: &str) -> bool {
    match row.get(field) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.as_str(), "t" | "true" | "YES"),
        _ => int(row, field) != 0,
    }
}
