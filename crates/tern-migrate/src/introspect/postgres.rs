//! PostgreSQL introspection via `information_schema` and `pg_catalog`.
//!
//! Every selected column is cast to `text` (or is a plain boolean) so rows
//! decode the same way regardless of the catalog's internal types.

use std::collections::BTreeMap;

use tern_core::snapshot::{ColumnSnapshot, ForeignKeySnapshot, IndexSnapshot, Snapshot, TableSnapshot};

use super::{fetch, flag, text};
use crate::error::Result;
use crate::executor::{QueryExecutor, SqlValue};

const TABLES: &str = "SELECT table_name::text AS table_name \
     FROM information_schema.tables \
     WHERE table_schema = $1 AND table_type = 'BASE TABLE' \
     ORDER BY table_name";

const COLUMNS: &str = "SELECT table_name::text AS table_name, column_name::text AS column_name, \
     data_type::text AS data_type, udt_name::text AS udt_name, \
     is_nullable::text AS is_nullable, column_default::text AS column_default \
     FROM information_schema.columns \
     WHERE table_schema = $1 \
     ORDER BY table_name, ordinal_position";

const KEY_CONSTRAINTS: &str = "SELECT tc.table_name::text AS table_name, \
     tc.constraint_name::text AS constraint_name, tc.constraint_type::text AS constraint_type, \
     kcu.column_name::text AS column_name \
     FROM information_schema.table_constraints tc \
     JOIN information_schema.key_column_usage kcu \
       ON tc.constraint_name = kcu.constraint_name \
      AND tc.table_schema = kcu.table_schema \
      AND tc.table_name = kcu.table_name \
     WHERE tc.table_schema = $1 AND tc.constraint_type IN ('PRIMARY KEY', 'UNIQUE') \
     ORDER BY tc.table_name, tc.constraint_name, kcu.ordinal_position";

const FOREIGN_KEYS: &str = "SELECT tc.table_name::text AS table_name, kcu.column_name::text AS column_name, \
     ccu.table_name::text AS target_table, ccu.column_name::text AS target_column \
     FROM information_schema.table_constraints tc \
     JOIN information_schema.key_column_usage kcu \
       ON tc.constraint_name = kcu.constraint_name \
      AND tc.table_schema = kcu.table_schema \
      AND tc.table_name = kcu.table_name \
     JOIN information_schema.constraint_column_usage ccu \
       ON ccu.constraint_name = tc.constraint_name \
      AND ccu.constraint_schema = tc.table_schema \
     WHERE tc.table_schema = $1 AND tc.constraint_type = 'FOREIGN KEY' \
     ORDER BY tc.table_name, tc.constraint_name, kcu.ordinal_position";

// Plain indexes only: primary keys and UNIQUE constraints are read above.
const INDEXES: &str = "SELECT t.relname::text AS table_name, i.relname::text AS index_name, \
     ix.indisunique AS is_unique, a.attname::text AS column_name \
     FROM pg_index ix \
     JOIN pg_class t ON t.oid = ix.indrelid \
     JOIN pg_class i ON i.oid = ix.indexrelid \
     JOIN pg_namespace n ON n.oid = t.relnamespace \
     JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey) \
     WHERE n.nspname = $1 AND NOT ix.indisprimary \
       AND NOT EXISTS (SELECT 1 FROM pg_constraint c WHERE c.conindid = ix.indexrelid) \
     ORDER BY t.relname, i.relname, array_position(ix.indkey::int2[], a.attnum)";

const ENUMS: &str = "SELECT t.typname::text AS enum_name, e.enumlabel::text AS enum_value \
     FROM pg_type t \
     JOIN pg_enum e ON e.enumtypid = t.oid \
     JOIN pg_namespace n ON n.oid = t.typnamespace \
     WHERE n.nspname = $1 \
     ORDER BY t.typname, e.enumsortorder";

pub(super) async fn introspect(executor: &dyn QueryExecutor, schema: &str, history_table: &str) -> Result<Snapshot> {
    let params = [SqlValue::from(schema)];
    let mut snapshot = Snapshot::new();

    for row in fetch(executor, TABLES, &params).await? {
        if let Some(name) = text(&row, "table_name").filter(|n| n != history_table) {
            snapshot.tables.insert(name, TableSnapshot::default());
        }
    }

    for row in fetch(executor, COLUMNS, &params).await? {
        let (Some(table), Some(column)) = (text(&row, "table_name"), text(&row, "column_name")) else {
            continue;
        };
        let Some(entry) = snapshot.tables.get_mut(&table) else {
            continue;
        };
        let data_type = text(&row, "data_type").unwrap_or_default();
        let type_name = if data_type == "USER-DEFINED" {
            text(&row, "udt_name").unwrap_or(data_type)
        } else {
            data_type
        };
        entry.columns.insert(
            column,
            ColumnSnapshot {
                type_name,
                nullable: flag(&row, "is_nullable"),
                primary: false,
                unique: false,
                default: text(&row, "column_default"),
                annotations: None,
            },
        );
    }

    // (table, constraint) -> (type, columns in key order)
    let mut constraints: BTreeMap<(String, String), (String, Vec<String>)> = BTreeMap::new();
    for row in fetch(executor, KEY_CONSTRAINTS, &params).await? {
        let (Some(table), Some(name), Some(kind), Some(column)) = (
            text(&row, "table_name"),
            text(&row, "constraint_name"),
            text(&row, "constraint_type"),
            text(&row, "column_name"),
        ) else {
            continue;
        };
        constraints
            .entry((table, name))
            .or_insert_with(|| (kind, Vec::new()))
            .1
            .push(column);
    }
    for ((table, name), (kind, columns)) in constraints {
        let Some(entry) = snapshot.tables.get_mut(&table) else {
            continue;
        };
        if kind == "PRIMARY KEY" {
            for column in &columns {
                if let Some(col) = entry.columns.get_mut(column) {
                    col.primary = true;
                    col.nullable = false;
                }
            }
        } else if columns.len() == 1 {
            if let Some(col) = entry.columns.get_mut(&columns[0]) {
                col.unique = !col.primary;
            }
        } else if entry.index_on(&columns).is_none() {
            entry.indexes.push(IndexSnapshot {
                columns,
                name: Some(name),
                unique: true,
            });
        }
    }

    for row in fetch(executor, FOREIGN_KEYS, &params).await? {
        let (Some(table), Some(column), Some(target_table), Some(target_column)) = (
            text(&row, "table_name"),
            text(&row, "column_name"),
            text(&row, "target_table"),
            text(&row, "target_column"),
        ) else {
            continue;
        };
        if let Some(entry) = snapshot.tables.get_mut(&table) {
            entry.foreign_keys.push(ForeignKeySnapshot {
                column,
                target_table,
                target_column,
            });
        }
    }

    // (table, index) -> (unique, columns in key order)
    let mut indexes: BTreeMap<(String, String), (bool, Vec<String>)> = BTreeMap::new();
    for row in fetch(executor, INDEXES, &params).await? {
        let (Some(table), Some(name), Some(column)) = (
            text(&row, "table_name"),
            text(&row, "index_name"),
            text(&row, "column_name"),
        ) else {
            continue;
        };
        indexes
            .entry((table, name))
            .or_insert_with(|| (flag(&row, "is_unique"), Vec::new()))
            .1
            .push(column);
    }
    for ((table, name), (unique, columns)) in indexes {
        if let Some(entry) = snapshot.tables.get_mut(&table) {
            if entry.index_on(&columns).is_none() {
                entry.indexes.push(IndexSnapshot {
                    columns,
                    name: Some(name),
                    unique,
                });
            }
        }
    }

    for row in fetch(executor, ENUMS, &params).await? {
        if let (Some(name), Some(value)) = (text(&row, "enum_name"), text(&row, "enum_value")) {
            snapshot.enums.entry(name).or_default().push(value);
        }
    }

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::executor::{BoxError, QueryOutput, Row};

    /// Answers each catalog query with canned rows, keyed by a fragment of
    /// the SQL text.
    struct Catalog {
        answers: Vec<(&'static str, Vec<Row>)>,
        params_seen: Mutex<Vec<Vec<SqlValue>>>,
    }

    fn rows(value: serde_json::Value) -> Vec<Row> {
        serde_json::from_value(value).unwrap()
    }

    #[async_trait]
    impl QueryExecutor for Catalog {
        async fn query(&self, sql: &str, params: &[SqlValue]) -> std::result::Result<QueryOutput, BoxError> {
            self.params_seen.lock().unwrap().push(params.to_vec());
            let rows = self
                .answers
                .iter()
                .find(|(fragment, _)| sql.contains(fragment))
                .map(|(_, rows)| rows.clone())
                .unwrap_or_default();
            Ok(QueryOutput {
                row_count: rows.len() as u64,
                rows,
            })
        }
    }

    #[tokio::test]
    async fn test_assembles_snapshot_from_catalog_rows() {
        let catalog = Catalog {
            answers: vec![
                (
                    "information_schema.tables",
                    rows(json!([
                        {"table_name": "posts"},
                        {"table_name": "users"},
                        {"table_name": "_tern_migrations"}
                    ])),
                ),
                (
                    "FROM information_schema.columns",
                    rows(json!([
                        {"table_name": "users", "column_name": "id", "data_type": "uuid", "udt_name": "uuid", "is_nullable": "NO", "column_default": null},
                        {"table_name": "users", "column_name": "email", "data_type": "text", "udt_name": "text", "is_nullable": "NO", "column_default": null},
                        {"table_name": "users", "column_name": "role", "data_type": "USER-DEFINED", "udt_name": "user_role", "is_nullable": "YES", "column_default": "'member'::user_role"},
                        {"table_name": "posts", "column_name": "id", "data_type": "integer", "udt_name": "int4", "is_nullable": "NO", "column_default": "nextval('posts_id_seq'::regclass)"},
                        {"table_name": "posts", "column_name": "author_id", "data_type": "uuid", "udt_name": "uuid", "is_nullable": "NO", "column_default": null},
                        {"table_name": "posts", "column_name": "slug", "data_type": "text", "udt_name": "text", "is_nullable": "NO", "column_default": null},
                        {"table_name": "_tern_migrations", "column_name": "id", "data_type": "integer", "udt_name": "int4", "is_nullable": "NO", "column_default": null}
                    ])),
                ),
                (
                    "tc.constraint_type IN",
                    rows(json!([
                        {"table_name": "posts", "constraint_name": "posts_author_id_slug_key", "constraint_type": "UNIQUE", "column_name": "author_id"},
                        {"table_name": "posts", "constraint_name": "posts_author_id_slug_key", "constraint_type": "UNIQUE", "column_name": "slug"},
                        {"table_name": "posts", "constraint_name": "posts_pkey", "constraint_type": "PRIMARY KEY", "column_name": "id"},
                        {"table_name": "users", "constraint_name": "users_email_key", "constraint_type": "UNIQUE", "column_name": "email"},
                        {"table_name": "users", "constraint_name": "users_pkey", "constraint_type": "PRIMARY KEY", "column_name": "id"}
                    ])),
                ),
                (
                    "'FOREIGN KEY'",
                    rows(json!([
                        {"table_name": "posts", "column_name": "author_id", "target_table": "users", "target_column": "id"}
                    ])),
                ),
                (
                    "FROM pg_index",
                    rows(json!([
                        {"table_name": "posts", "index_name": "idx_posts_slug", "is_unique": false, "column_name": "slug"}
                    ])),
                ),
                (
                    "FROM pg_type",
                    rows(json!([
                        {"enum_name": "user_role", "enum_value": "admin"},
                        {"enum_name": "user_role", "enum_value": "member"}
                    ])),
                ),
            ],
            params_seen: Mutex::new(Vec::new()),
        };

        let snapshot = introspect(&catalog, "app", "_tern_migrations").await.unwrap();

        assert_eq!(snapshot.tables.len(), 2);
        let users = snapshot.table("users").unwrap();
        assert!(users.column("id").unwrap().primary);
        assert!(users.column("email").unwrap().unique);
        let role = users.column("role").unwrap();
        assert_eq!(role.type_name, "user_role");
        assert!(role.nullable);
        assert_eq!(role.default.as_deref(), Some("'member'::user_role"));

        let posts = snapshot.table("posts").unwrap();
        assert_eq!(posts.column("id").unwrap().type_name, "integer");
        assert_eq!(posts.foreign_keys.len(), 1);
        let composite = posts
            .index_on(&["author_id".to_string(), "slug".to_string()])
            .unwrap();
        assert!(composite.unique);
        assert_eq!(composite.name.as_deref(), Some("posts_author_id_slug_key"));
        assert!(posts.index_on(&["slug".to_string()]).is_some());

        assert_eq!(snapshot.enum_values("user_role").unwrap(), ["admin", "member"]);

        let params = catalog.params_seen.lock().unwrap();
        assert_eq!(params.len(), 6);
        assert!(params.iter().all(|p| p == &[SqlValue::from("app")]));
    }
}
