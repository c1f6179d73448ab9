//! SQLite introspection via `sqlite_master` and pragmas.

use tern_core::dialect::{Dialect, SQLITE};
use tern_core::snapshot::{ColumnSnapshot, ForeignKeySnapshot, IndexSnapshot, Snapshot, TableSnapshot};
use tracing::debug;

use super::{fetch, flag, int, text};
use crate::error::Result;
use crate::executor::QueryExecutor;

const LIST_TABLES: &str = "SELECT name FROM sqlite_master \
     WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

pub(super) async fn introspect(executor: &dyn QueryExecutor, history_table: &str) -> Result<Snapshot> {
    let mut snapshot = Snapshot::new();

    for row in fetch(executor, LIST_TABLES, &[]).await? {
        let Some(name) = text(&row, "name") else {
            continue;
        };
        if name == history_table {
            continue;
        }
        let table = introspect_table(executor, &name).await?;
        snapshot.tables.insert(name, table);
    }

    Ok(snapshot)
}

async fn introspect_table(executor: &dyn QueryExecutor, name: &str) -> Result<TableSnapshot> {
    let quoted = SQLITE.quote_identifier(name);
    let mut table = TableSnapshot::default();

    // cid | name | type | notnull | dflt_value | pk
    for row in fetch(executor, &format!("PRAGMA table_info({quoted})"), &[]).await? {
        let Some(column) = text(&row, "name") else {
            continue;
        };
        let primary = int(&row, "pk") > 0;
        table.columns.insert(
            column,
            ColumnSnapshot {
                type_name: text(&row, "type").unwrap_or_default(),
                nullable: !flag(&row, "notnull") && !primary,
                primary,
                unique: false,
                default: text(&row, "dflt_value"),
                annotations: None,
            },
        );
    }

    // seq | name | unique | origin | partial
    // origin: 'c' = CREATE INDEX, 'u' = UNIQUE constraint, 'pk' = PRIMARY KEY
    for row in fetch(executor, &format!("PRAGMA index_list({quoted})"), &[]).await? {
        let (Some(index), Some(origin)) = (text(&row, "name"), text(&row, "origin")) else {
            continue;
        };
        if origin == "pk" {
            continue;
        }
        let columns = index_columns(executor, &index).await?;
        let unique = flag(&row, "unique");

        if origin == "u" && columns.len() == 1 {
            if let Some(col) = table.columns.get_mut(&columns[0]) {
                if !col.primary {
                    col.unique = true;
                }
                continue;
            }
        }
        if table.index_on(&columns).is_some() {
            continue;
        }
        table.indexes.push(IndexSnapshot {
            columns,
            // Constraint-backed indexes carry generated sqlite_autoindex_* names.
            name: (origin == "c").then_some(index),
            unique,
        });
    }
    // index_list reports newest first
    table.indexes.reverse();

    // id | seq | table | from | to | on_update | on_delete | match
    for row in fetch(executor, &format!("PRAGMA foreign_key_list({quoted})"), &[]).await? {
        let (Some(column), Some(target_table)) = (text(&row, "from"), text(&row, "table")) else {
            continue;
        };
        let Some(target_column) = text(&row, "to") else {
            debug!(table = %name, column = %column, "Skipping foreign key without explicit target column");
            continue;
        };
        table.foreign_keys.push(ForeignKeySnapshot {
            column,
            target_table,
            target_column,
        });
    }

    Ok(table)
}

async fn index_columns(executor: &dyn QueryExecutor, index: &str) -> Result<Vec<String>> {
    // seqno | cid | name
    let mut rows = fetch(
        executor,
        &format!("PRAGMA index_info({})", SQLITE.quote_identifier(index)),
        &[],
    )
    .await?;
    rows.sort_by_key(|row| int(row, "seqno"));
    Ok(rows.iter().filter_map(|row| text(row, "name")).collect())
}
