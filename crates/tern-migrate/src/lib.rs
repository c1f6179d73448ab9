//! Checksum-tracked schema migrations for tern.
//!
//! `tern-migrate` is the database-facing half of tern:
//!
//! - **Executor** - the [`QueryExecutor`](executor::QueryExecutor) seam every
//!   database call goes through, with sqlx implementations for SQLite and
//!   PostgreSQL
//! - **Runner** - applies SQL, maintains the `_tern_migrations` history table
//!   and detects drift and out-of-order files
//! - **Introspector** - reads a schema snapshot back from a live database
//! - **Auto-migrate** - diffs the stored snapshot against the current schema
//!   and applies the difference in one call
//!
//! # Example
//!
//! ```rust,ignore
//! use tern_migrate::prelude::*;
//!
//! let pool = SqlitePoolOptions::new().connect("sqlite:app.db").await?;
//! let runner = MigrationRunner::new(&SQLITE);
//! runner.create_history_table(&pool).await?;
//!
//! let files = read_migration_dir(Path::new("migrations"))?;
//! let applied = runner.get_applied(&pool).await?;
//! if !detect_drift(&files, &applied).is_empty() {
//!     // refuse to continue
//! }
//! runner.apply_pending(&pool, &files, ApplyOptions::default()).await?;
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Show applied and pending migrations
//! tern status
//!
//! # Generate the next migration from a schema file
//! tern generate "add user emails" --schema schema.json
//!
//! # Apply pending migrations
//! tern migrate
//! ```

pub mod auto;
pub mod error;
pub mod executor;
pub mod files;
pub mod introspect;
pub mod runner;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::auto::{auto_migrate, AutoMigrateOptions, AutoMigrateReport, MigrationLogger, TracingLogger};
    pub use crate::error::{MigrateError, Result};
    pub use crate::executor::{Database, QueryExecutor, QueryOutput, Row, SqlValue};
    pub use crate::files::{read_migration_dir, MigrationFile};
    pub use crate::introspect::{introspect, Introspector};
    pub use crate::runner::{
        detect_drift, detect_out_of_order, get_pending, AppliedMigration, ApplyOptions, ApplyResult,
        MigrationRunner, HISTORY_TABLE,
    };
    pub use tern_core::prelude::*;
}
