//! Auto-migrate: diff the stored snapshot against the current schema and
//! apply the difference.
//!
//! The stored snapshot only ever reflects a successfully applied state: it
//! is written after the migration succeeds (or when there is nothing to
//! apply) and left untouched on failure. A diff holding a change the dialect
//! cannot apply is refused before anything runs.

use std::path::Path;

use chrono::Utc;
use tern_core::checksum::checksum;
use tern_core::dialect::{Dialect, DEFAULT_DIALECT};
use tern_core::diff::{compute_diff, DiffChange};
use tern_core::snapshot::{read_snapshot, write_snapshot, Snapshot};
use tern_core::sqlgen::{generate_migration_sql, unsupported_changes, SqlContext};

use crate::error::{MigrateError, Result};
use crate::executor::QueryExecutor;
use crate::runner::{ApplyOptions, ApplyResult, MigrationRunner};

/// Receives auto-migrate progress and destructive-change warnings.
pub trait MigrationLogger: Send + Sync {
    /// Progress message.
    fn info(&self, message: &str);
    /// Something the operator should look at; never blocks the migration.
    fn warn(&self, message: &str);
}

/// Forwards to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl MigrationLogger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }
}

/// Inputs for [`auto_migrate`].
pub struct AutoMigrateOptions<'a> {
    /// The schema the application expects.
    pub current: &'a Snapshot,
    /// Where the last applied snapshot is stored.
    pub snapshot_path: &'a Path,
    /// Dialect to render SQL for.
    pub dialect: &'a dyn Dialect,
    /// Database to migrate.
    pub db: &'a dyn QueryExecutor,
    /// Progress and warning sink.
    pub logger: &'a dyn MigrationLogger,
}

impl<'a> AutoMigrateOptions<'a> {
    /// Options using [`DEFAULT_DIALECT`] and [`TracingLogger`].
    #[must_use]
    pub fn new(current: &'a Snapshot, snapshot_path: &'a Path, db: &'a dyn QueryExecutor) -> Self {
        Self {
            current,
            snapshot_path,
            dialect: &DEFAULT_DIALECT,
            db,
            logger: &TracingLogger,
        }
    }

    /// Sets the dialect.
    #[must_use]
    pub fn dialect(mut self, dialect: &'a dyn Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Sets the logger.
    #[must_use]
    pub fn logger(mut self, logger: &'a dyn MigrationLogger) -> Self {
        self.logger = logger;
        self
    }
}

/// What an auto-migrate run did.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoMigrateReport {
    /// No snapshot was stored before this run.
    pub first_run: bool,
    /// Changes found between the stored and current schema.
    pub changes: Vec<DiffChange>,
    /// The applied migration, if there was anything to apply.
    pub applied: Option<ApplyResult>,
}

/// Brings the database in line with `options.current`.
///
/// # Errors
///
/// Returns [`MigrateError::Unsupported`] when the dialect cannot apply one of
/// the changes, [`MigrateError::InitialSchema`] when the first migration fails,
/// [`MigrateError::Migration`] when a later one fails, and
/// [`MigrateError::Core`] when the snapshot file cannot be read or written.
pub async fn auto_migrate(options: &AutoMigrateOptions<'_>) -> Result<AutoMigrateReport> {
    let stored = read_snapshot(options.snapshot_path)?;
    let first_run = stored.is_none();
    let previous = stored.unwrap_or_default();

    let diff = compute_diff(&previous, options.current);
    if diff.is_empty() {
        write_snapshot(options.snapshot_path, options.current)?;
        options.logger.info("Schema is up to date");
        return Ok(AutoMigrateReport {
            first_run,
            changes: Vec::new(),
            applied: None,
        });
    }

    let unsupported = unsupported_changes(&diff.changes, options.dialect);
    if !unsupported.is_empty() {
        for reason in &unsupported {
            options.logger.warn(reason);
        }
        return Err(MigrateError::Unsupported(unsupported));
    }

    let wrap = |e: MigrateError| {
        if first_run {
            MigrateError::InitialSchema(Box::new(e))
        } else {
            MigrateError::Migration(Box::new(e))
        }
    };

    let runner = MigrationRunner::new(options.dialect);
    runner.create_history_table(options.db).await.map_err(wrap)?;

    let ctx = SqlContext::new(&previous, options.current);
    let sql = generate_migration_sql(&diff.changes, &ctx, options.dialect);

    for change in diff.destructive() {
        options
            .logger
            .warn(&format!("Destructive change: {change}; existing data will be lost"));
    }

    // Two runs in the same millisecond still get distinct names.
    let name = format!(
        "auto_{}_{}",
        Utc::now().format("%Y%m%d%H%M%S%3f"),
        &checksum(&sql)[..8]
    );
    options.logger.info(&format!(
        "Applying {} schema change(s) as {name}",
        diff.len()
    ));
    let applied = runner
        .apply(options.db, &sql, &name, ApplyOptions::default())
        .await
        .map_err(wrap)?;

    write_snapshot(options.snapshot_path, options.current)?;

    Ok(AutoMigrateReport {
        first_run,
        changes: diff.changes,
        applied: Some(applied),
    })
}
