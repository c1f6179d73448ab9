//! Schema snapshots, diffing and dialect-aware DDL generation.
//!
//! `tern-core` is the pure half of tern. It never talks to a database:
//!
//! - **Snapshot** - a serializable description of a schema, built from
//!   [`TableDefinition`](definition::TableDefinition)s or by the introspector
//!   in `tern-migrate`
//! - **Differ** - computes the ordered change list between two snapshots,
//!   including confidence-scored column-rename detection
//! - **SQL generator** - renders a change list as forward or rollback DDL for
//!   a [`Dialect`](dialect::Dialect)
//! - **Journal** - the on-disk ledger that catches migration numbering
//!   collisions
//!
//! # Example
//!
//! ```rust
//! use tern_core::prelude::*;
//!
//! let before = Snapshot::new();
//! let after = create_snapshot(
//!     &[TableDefinition::new("users")
//!         .column(ColumnDefinition::new("id", "uuid").primary_key())
//!         .column(ColumnDefinition::new("email", "text").unique())],
//!     &[],
//! );
//!
//! let diff = compute_diff(&before, &after);
//! let sql = generate_migration_sql(&diff.changes, &SqlContext::new(&before, &after), &DEFAULT_DIALECT);
//! assert!(sql.starts_with("CREATE TABLE \"users\""));
//! ```

pub mod checksum;
pub mod definition;
pub mod dialect;
pub mod diff;
pub mod error;
pub mod journal;
pub mod naming;
pub mod snapshot;
pub mod sqlgen;

pub use error::{Error, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::checksum::checksum;
    pub use crate::definition::{ColumnDefinition, EnumDefinition, IndexDefinition, TableDefinition};
    pub use crate::dialect::{
        Dialect, DialectKind, PostgresDialect, SqliteDialect, DEFAULT_DIALECT, POSTGRES, SQLITE,
    };
    pub use crate::diff::{compute_diff, DiffChange, DiffResult};
    pub use crate::error::{Error, Result};
    pub use crate::journal::{
        add_journal_entry, create_journal, detect_collisions, next_sequence, read_journal,
        write_journal, Collision, Journal, JournalEntry,
    };
    pub use crate::naming::{migration_file_name, parse_sequence};
    pub use crate::snapshot::{
        create_snapshot, read_snapshot, write_snapshot, ColumnSnapshot, ForeignKeySnapshot,
        IndexSnapshot, Snapshot, TableSnapshot,
    };
    pub use crate::sqlgen::{
        generate_migration_sql, generate_rollback_sql, unsupported_changes, SqlContext,
    };
}
