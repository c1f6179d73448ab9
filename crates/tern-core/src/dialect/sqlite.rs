//! SQLite dialect.
//!
//! SQLite has limited ALTER TABLE support: changing a column's type or
//! nullability requires the "table recreation" strategy (create a new table,
//! copy data, drop the old table, rename). This dialect does not perform that
//! rebuild; it renders an SQL comment naming the limitation instead, so the
//! gap is visible in the generated migration.
//!
//! There is no native enum type either. Enum columns are rendered as `TEXT`
//! with a `CHECK (col IN (...))` constraint baked into the column definition.

use super::{string_literal, Dialect, DialectKind};
use crate::diff::DiffChange;

/// SQLite dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn map_type(&self, logical: &str) -> String {
        // SQLite has dynamic typing with type affinity
        match logical.to_ascii_lowercase().as_str() {
            "text" | "string" | "uuid" | "json" | "jsonb" | "timestamp" | "datetime" | "date"
            | "time" => "TEXT".to_string(),
            "int" | "integer" | "smallint" | "bigint" | "serial" | "bigserial" | "bool"
            | "boolean" => "INTEGER".to_string(),
            "float" | "real" | "double" => "REAL".to_string(),
            "decimal" | "numeric" => "NUMERIC".to_string(),
            "blob" | "bytes" | "bytea" => "BLOB".to_string(),
            _ => logical.to_string(),
        }
    }

    fn supports_enum_types(&self) -> bool {
        false
    }

    fn auto_increment_primary_key(&self) -> &'static str {
        "INTEGER PRIMARY KEY AUTOINCREMENT"
    }

    fn text_type(&self) -> &'static str {
        "TEXT"
    }

    fn timestamp_type(&self) -> &'static str {
        "TEXT"
    }

    fn current_timestamp(&self) -> &'static str {
        "(datetime('now'))"
    }

    fn enum_column_type(&self, column: &str, _enum_name: &str, values: &[String]) -> String {
        let values: Vec<String> = values.iter().map(|v| string_literal(v)).collect();
        format!("TEXT CHECK({column} IN ({}))", values.join(", "))
    }

    fn alter_column_type(&self, table: &str, column: &str, new_type: &str) -> String {
        format!(
            "-- SQLite does not support ALTER COLUMN TYPE directly for {table}.{column} \
             (target type {new_type}); table recreation required"
        )
    }

    fn alter_column_nullable(&self, table: &str, column: &str, nullable: bool) -> String {
        let change = if nullable { "DROP NOT NULL" } else { "SET NOT NULL" };
        format!(
            "-- SQLite does not support ALTER COLUMN {change} directly for {table}.{column}; \
             table recreation required"
        )
    }

    fn create_enum(&self, _name: &str, _values: &[String]) -> Vec<String> {
        Vec::new()
    }

    fn drop_enum(&self, _name: &str) -> Vec<String> {
        Vec::new()
    }

    fn alter_enum(&self, _name: &str, _added: &[String], _removed: &[String]) -> Vec<String> {
        Vec::new()
    }

    fn unsupported(&self, change: &DiffChange) -> Option<String> {
        match change {
            DiffChange::ColumnAltered { table, column, .. } => Some(format!(
                "SQLite cannot alter column {table}.{column} in place; the table must be recreated"
            )),
            DiffChange::EnumAltered { enum_name, .. } => Some(format!(
                "SQLite cannot change the values of enum {enum_name}; existing CHECK constraints keep the old values"
            )),
            _ => None,
        }
    }
}
