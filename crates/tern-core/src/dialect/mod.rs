//! Database dialects.
//!
//! Each dialect is a stateless strategy object that knows the per-engine
//! differences the SQL generator and the migration runner care about:
//! parameter placeholders, logical type mapping, enum representation and the
//! handful of DDL verbs that are not portable.
//!
//! Dialect methods receive identifiers that are already cased and quoted by
//! the caller (see [`Dialect::quote_identifier`]).

mod postgres;
mod sqlite;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::diff::DiffChange;

pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

/// The PostgreSQL dialect.
pub const POSTGRES: PostgresDialect = PostgresDialect::new();

/// The SQLite dialect.
pub const SQLITE: SqliteDialect = SqliteDialect::new();

/// The dialect used when a caller has no engine-specific preference.
///
/// Callers pass this explicitly; nothing in the crate falls back to it
/// behind their back.
pub const DEFAULT_DIALECT: PostgresDialect = POSTGRES;

/// Identifies a supported database engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    /// PostgreSQL.
    Postgres,
    /// SQLite.
    Sqlite,
}

impl DialectKind {
    /// Returns the stateless dialect instance for this engine.
    #[must_use]
    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            Self::Postgres => &POSTGRES,
            Self::Sqlite => &SQLITE,
        }
    }

    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }

    /// Infers the engine from a connection URL.
    ///
    /// `postgres://` and `postgresql://` map to Postgres; anything else is
    /// treated as SQLite.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Self::Postgres
        } else {
            Self::Sqlite
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown dialect name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown dialect '{0}' (expected 'postgres' or 'sqlite')")]
pub struct UnknownDialect(pub String);

impl FromStr for DialectKind {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            _ => Err(UnknownDialect(s.to_string())),
        }
    }
}

/// Per-engine SQL differences.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Returns the engine this dialect targets.
    fn kind(&self) -> DialectKind;

    /// Returns the dialect name.
    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Returns the placeholder for the 1-based parameter `index`.
    fn placeholder(&self, index: usize) -> String;

    /// Maps a logical type name to the engine type.
    ///
    /// Unknown names pass through unchanged so raw engine types found in
    /// introspected snapshots render as-is.
    fn map_type(&self, logical: &str) -> String;

    /// Returns whether the engine has a native enum type.
    fn supports_enum_types(&self) -> bool;

    /// Returns the identifier quote character.
    fn quote_char(&self) -> char {
        '"'
    }

    /// Quotes an identifier.
    fn quote_identifier(&self, name: &str) -> String {
        let q = self.quote_char();
        let escaped = name.replace(q, &format!("{q}{q}"));
        format!("{q}{escaped}{q}")
    }

    /// Column definition for an auto-incrementing integer primary key.
    fn auto_increment_primary_key(&self) -> &'static str;

    /// Engine type for free-form text.
    fn text_type(&self) -> &'static str;

    /// Engine type used for timestamps.
    fn timestamp_type(&self) -> &'static str;

    /// Default expression producing the current timestamp.
    fn current_timestamp(&self) -> &'static str;

    /// Column type used for a column whose type is an enum.
    ///
    /// `column` and `enum_name` are quoted identifiers.
    fn enum_column_type(&self, column: &str, enum_name: &str, values: &[String]) -> String;

    /// ALTER statement changing a column's type. `table`/`column` are quoted.
    fn alter_column_type(&self, table: &str, column: &str, new_type: &str) -> String;

    /// ALTER statement changing a column's nullability.
    fn alter_column_nullable(&self, table: &str, column: &str, nullable: bool) -> String;

    /// Statements creating an enum type (empty when not supported natively).
    fn create_enum(&self, name: &str, values: &[String]) -> Vec<String>;

    /// Statements dropping an enum type.
    fn drop_enum(&self, name: &str) -> Vec<String>;

    /// Statements adjusting an existing enum type's value set.
    fn alter_enum(&self, name: &str, added: &[String], removed: &[String]) -> Vec<String>;

    /// Explains why `change` cannot be applied by this engine, if it can't.
    ///
    /// Such changes render as comments (or nothing), so a migration holding
    /// one would succeed without the schema actually changing.
    fn unsupported(&self, _change: &DiffChange) -> Option<String> {
        None
    }
}

/// Quotes and escapes a string literal.
#[must_use]
pub fn string_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
