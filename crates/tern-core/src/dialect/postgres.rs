//! PostgreSQL dialect.

use super::{string_literal, Dialect, DialectKind};
use crate::diff::DiffChange;

/// PostgreSQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    fn map_type(&self, logical: &str) -> String {
        match logical.to_ascii_lowercase().as_str() {
            "text" | "string" => "text".to_string(),
            "int" | "integer" => "integer".to_string(),
            "smallint" => "smallint".to_string(),
            "bigint" => "bigint".to_string(),
            "serial" => "serial".to_string(),
            "bigserial" => "bigserial".to_string(),
            "bool" | "boolean" => "boolean".to_string(),
            "timestamp" | "datetime" => "timestamp with time zone".to_string(),
            "date" => "date".to_string(),
            "time" => "time".to_string(),
            "uuid" => "uuid".to_string(),
            "json" | "jsonb" => "jsonb".to_string(),
            "decimal" | "numeric" => "numeric".to_string(),
            "float" | "real" => "real".to_string(),
            "double" => "double precision".to_string(),
            "blob" | "bytes" | "bytea" => "bytea".to_string(),
            _ => logical.to_string(),
        }
    }

    fn supports_enum_types(&self) -> bool {
        true
    }

    fn auto_increment_primary_key(&self) -> &'static str {
        "serial PRIMARY KEY"
    }

    fn text_type(&self) -> &'static str {
        "text"
    }

    fn timestamp_type(&self) -> &'static str {
        "timestamp with time zone"
    }

    fn current_timestamp(&self) -> &'static str {
        "now()"
    }

    fn enum_column_type(&self, _column: &str, enum_name: &str, _values: &[String]) -> String {
        enum_name.to_string()
    }

    fn alter_column_type(&self, table: &str, column: &str, new_type: &str) -> String {
        format!("ALTER TABLE {table} ALTER COLUMN {column} TYPE {new_type}")
    }

    fn alter_column_nullable(&self, table: &str, column: &str, nullable: bool) -> String {
        if nullable {
            format!("ALTER TABLE {table} ALTER COLUMN {column} DROP NOT NULL")
        } else {
            format!("ALTER TABLE {table} ALTER COLUMN {column} SET NOT NULL")
        }
    }

    fn create_enum(&self, name: &str, values: &[String]) -> Vec<String> {
        let values: Vec<String> = values.iter().map(|v| string_literal(v)).collect();
        vec![format!("CREATE TYPE {name} AS ENUM ({})", values.join(", "))]
    }

    fn drop_enum(&self, name: &str) -> Vec<String> {
        vec![format!("DROP TYPE {name}")]
    }

    fn alter_enum(&self, name: &str, added: &[String], removed: &[String]) -> Vec<String> {
        let mut statements: Vec<String> = added
            .iter()
            .map(|v| format!("ALTER TYPE {name} ADD VALUE {}", string_literal(v)))
            .collect();
        // PostgreSQL has no DROP VALUE; removal needs a type rebuild.
        for value in removed {
            statements.push(format!(
                "-- PostgreSQL cannot drop value {} from enum {name}; recreate the type to remove it",
                string_literal(value)
            ));
        }
        statements
    }

    fn unsupported(&self, change: &DiffChange) -> Option<String> {
        match change {
            DiffChange::EnumAltered {
                enum_name,
                removed_values,
                ..
            } if !removed_values.is_empty() => Some(format!(
                "PostgreSQL cannot drop values [{}] from enum {enum_name}; the type must be recreated",
                removed_values.join(", ")
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_type_mapping() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.map_type("uuid"), "uuid");
        assert_eq!(dialect.map_type("text"), "text");
        assert_eq!(dialect.map_type("timestamp"), "timestamp with time zone");
        assert_eq!(dialect.map_type("json"), "jsonb");
        assert_eq!(dialect.map_type("boolean"), "boolean");
        // Raw engine types pass through untouched
        assert_eq!(dialect.map_type("character varying"), "character varying");
    }

    #[test]
    fn test_alter_column_sql() {
        let dialect = PostgresDialect::new();
        assert_eq!(
            dialect.alter_column_nullable("\"users\"", "\"email\"", false),
            "ALTER TABLE \"users\" ALTER COLUMN \"email\" SET NOT NULL"
        );
        assert_eq!(
            dialect.alter_column_nullable("\"users\"", "\"email\"", true),
            "ALTER TABLE \"users\" ALTER COLUMN \"email\" DROP NOT NULL"
        );
        assert_eq!(
            dialect.alter_column_type("\"users\"", "\"age\"", "bigint"),
            "ALTER TABLE \"users\" ALTER COLUMN \"age\" TYPE bigint"
        );
    }

    #[test]
    fn test_enum_statements() {
        let dialect = PostgresDialect::new();
        let values = vec!["active".to_string(), "it's".to_string()];
        assert_eq!(
            dialect.create_enum("\"status\"", &values),
            vec!["CREATE TYPE \"status\" AS ENUM ('active', 'it''s')"]
        );
        assert_eq!(dialect.drop_enum("\"status\""), vec!["DROP TYPE \"status\""]);

        let altered = dialect.alter_enum("\"status\"", &["banned".to_string()], &["old".to_string()]);
        assert_eq!(altered[0], "ALTER TYPE \"status\" ADD VALUE 'banned'");
        assert!(altered[1].starts_with("--"));
    }

    #[test]
    fn test_only_enum_value_removal_is_unsupported() {
        let dialect = PostgresDialect::new();
        let extend = DiffChange::EnumAltered {
            enum_name: "status".into(),
            added_values: vec!["banned".into()],
            removed_values: Vec::new(),
        };
        assert_eq!(dialect.unsupported(&extend), None);

        let shrink = DiffChange::EnumAltered {
            enum_name: "status".into(),
            added_values: Vec::new(),
            removed_values: vec!["old".into()],
        };
        assert!(dialect.unsupported(&shrink).unwrap().contains("[old]"));
    }
}
