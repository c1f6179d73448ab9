//! Error types for the migration system.

use crate::executor::BoxError;

/// Errors that can occur during migration operations.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// The query executor rejected a statement.
    #[error("Query failed while {context}: {source}")]
    Query {
        /// What the runner was doing.
        context: String,
        /// Driver error, boxed so drivers stay out of the public API.
        #[source]
        source: BoxError,
    },

    /// The first migration against an empty schema failed.
    #[error("Failed to apply initial schema: {0}")]
    InitialSchema(#[source] Box<MigrateError>),

    /// A migration against an existing schema failed.
    #[error("Failed to apply migration: {0}")]
    Migration(#[source] Box<MigrateError>),

    /// A history row is missing a required column.
    #[error("Invalid migration history row: {0}")]
    InvalidHistoryRow(String),

    /// Applied migrations no longer match their files on disk.
    #[error("Applied migrations were modified on disk: {}", .0.join(", "))]
    Drift(Vec<String>),

    /// The diff holds changes the target database cannot apply.
    #[error("Changes this database cannot apply: {}", .0.join("; "))]
    Unsupported(Vec<String>),

    /// Snapshot or journal persistence failed.
    #[error(transparent)]
    Core(#[from] tern_core::Error),

    /// IO error (reading migration files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MigrateError {
    /// Wraps an executor failure.
    pub fn query(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Query {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Query { .. } => "MIGRATION_QUERY_ERROR",
            Self::InitialSchema(inner) | Self::Migration(inner) => inner.code(),
            Self::InvalidHistoryRow(_) => "MIGRATION_HISTORY_ERROR",
            Self::Drift(_) => "MIGRATION_DRIFT",
            Self::Unsupported(_) => "MIGRATION_UNSUPPORTED",
            Self::Core(_) | Self::Io(_) => "MIGRATION_IO_ERROR",
        }
    }
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_code_survives_wrapping() {
        let err = MigrateError::query("creating history table", "no such table");
        assert_eq!(err.code(), "MIGRATION_QUERY_ERROR");

        let wrapped = MigrateError::InitialSchema(Box::new(err));
        assert_eq!(wrapped.code(), "MIGRATION_QUERY_ERROR");
        assert!(wrapped
            .to_string()
            .starts_with("Failed to apply initial schema: Query failed while creating history table"));
    }

    #[test]
    fn test_drift_lists_names() {
        let err = MigrateError::Drift(vec!["0001_a".into(), "0002_b".into()]);
        assert_eq!(
            err.to_string(),
            "Applied migrations were modified on disk: 0001_a, 0002_b"
        );
    }

    #[test]
    fn test_unsupported_lists_reasons() {
        let err = MigrateError::Unsupported(vec!["cannot alter a".into(), "cannot alter b".into()]);
        assert_eq!(err.code(), "MIGRATION_UNSUPPORTED");
        assert_eq!(
            err.to_string(),
            "Changes this database cannot apply: cannot alter a; cannot alter b"
        );
    }
}
