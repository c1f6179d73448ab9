//! Dialect-aware DDL generation.
//!
//! [`generate_migration_sql`] renders a change list into forward DDL and
//! [`generate_rollback_sql`] renders the inverse. Both look up full table,
//! column, index and enum definitions in a [`SqlContext`]; a change whose
//! definition is missing from the context renders as an SQL comment.
//!
//! Identifiers are converted to snake_case and quoted. Statements are
//! terminated with `;` and separated by a blank line. Enum types are created
//! or extended before any other statement and dropped after all of them, so
//! tables can reference types created in the same migration. New tables are
//! created after the tables their foreign keys point at; dropped tables go in
//! the reverse order, after every other table change.

use heck::ToSnakeCase;

use crate::diff::DiffChange;
use crate::dialect::Dialect;
use crate::snapshot::{ColumnSnapshot, Snapshot, TableSnapshot};

/// The snapshots a change list was computed from.
#[derive(Debug, Clone, Copy)]
pub struct SqlContext<'a> {
    /// Schema before the changes.
    pub before: &'a Snapshot,
    /// Schema after the changes.
    pub after: &'a Snapshot,
}

impl<'a> SqlContext<'a> {
    /// Creates a context for changes from `before` to `after`.
    #[must_use]
    pub const fn new(before: &'a Snapshot, after: &'a Snapshot) -> Self {
        Self { before, after }
    }

    /// Context for the inverse change list.
    #[must_use]
    pub const fn swapped(&self) -> Self {
        Self {
            before: self.after,
            after: self.before,
        }
    }
}

/// Returns the change that undoes `change`.
#[must_use]
pub fn invert(change: &DiffChange) -> DiffChange {
    match change.clone() {
        DiffChange::TableAdded { table } => DiffChange::TableRemoved { table },
        DiffChange::TableRemoved { table } => DiffChange::TableAdded { table },
        DiffChange::ColumnAdded { table, column } => DiffChange::ColumnRemoved { table, column },
        DiffChange::ColumnRemoved { table, column } => DiffChange::ColumnAdded { table, column },
        DiffChange::ColumnAltered {
            table,
            column,
            old_type,
            new_type,
            old_nullable,
            new_nullable,
        } => DiffChange::ColumnAltered {
            table,
            column,
            old_type: new_type,
            new_type: old_type,
            old_nullable: new_nullable,
            new_nullable: old_nullable,
        },
        DiffChange::ColumnRenamed {
            table,
            old_column,
            new_column,
            confidence,
        } => DiffChange::ColumnRenamed {
            table,
            old_column: new_column,
            new_column: old_column,
            confidence,
        },
        DiffChange::IndexAdded { table, columns } => DiffChange::IndexRemoved { table, columns },
        DiffChange::IndexRemoved { table, columns } => DiffChange::IndexAdded { table, columns },
        DiffChange::EnumAdded { enum_name } => DiffChange::EnumRemoved { enum_name },
        DiffChange::EnumRemoved { enum_name } => DiffChange::EnumAdded { enum_name },
        DiffChange::EnumAltered {
            enum_name,
            added_values,
            removed_values,
        } => DiffChange::EnumAltered {
            enum_name,
            added_values: removed_values,
            removed_values: added_values,
        },
    }
}

/// Auto-generated index name: `idx_<table>_<col1>_<col2>...`.
#[must_use]
pub fn index_name(table: &str, columns: &[String]) -> String {
    let columns: Vec<String> = columns.iter().map(|c| c.to_snake_case()).collect();
    format!("idx_{}_{}", table.to_snake_case(), columns.join("_"))
}

/// Renders forward DDL for `changes`.
#[must_use]
pub fn generate_migration_sql(changes: &[DiffChange], ctx: &SqlContext<'_>, dialect: &dyn Dialect) -> String {
    let generator = Generator { ctx, dialect };
    let mut statements = Vec::new();

    // Phase 1: enum types the tables may depend on.
    for change in changes {
        if matches!(change, DiffChange::EnumAdded { .. } | DiffChange::EnumAltered { .. }) {
            statements.extend(generator.render(change));
        }
    }
    // Phase 2: new tables, referenced tables before the tables pointing at them.
    let added: Vec<&str> = changes
        .iter()
        .filter_map(|c| match c {
            DiffChange::TableAdded { table } => Some(table.as_str()),
            _ => None,
        })
        .collect();
    for table in dependency_order(&added, ctx.after) {
        statements.extend(generator.create_table(table));
    }
    // Phase 3: changes to tables that exist on both sides.
    for change in changes {
        let whole_table = matches!(change, DiffChange::TableAdded { .. } | DiffChange::TableRemoved { .. });
        if change.table().is_some() && !whole_table {
            statements.extend(generator.render(change));
        }
    }
    // Phase 4: dropped tables, referencing tables first.
    let removed: Vec<&str> = changes
        .iter()
        .filter_map(|c| match c {
            DiffChange::TableRemoved { table } => Some(table.as_str()),
            _ => None,
        })
        .collect();
    for table in dependency_order(&removed, ctx.before).into_iter().rev() {
        statements.push(generator.drop_table(table));
    }
    // Phase 5: enum types nothing references any more.
    for change in changes {
        if matches!(change, DiffChange::EnumRemoved { .. }) {
            statements.extend(generator.render(change));
        }
    }

    statements
        .iter()
        .map(String::as_str)
        .map(terminate)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Renders DDL that undoes `changes`.
///
/// Changes are inverted and applied last-first, with definitions looked up in
/// the swapped context so restored tables and columns carry their original
/// shape.
#[must_use]
pub fn generate_rollback_sql(changes: &[DiffChange], ctx: &SqlContext<'_>, dialect: &dyn Dialect) -> String {
    let inverse: Vec<DiffChange> = changes.iter().rev().map(invert).collect();
    generate_migration_sql(&inverse, &ctx.swapped(), dialect)
}

/// Reasons `dialect` gives for the changes it cannot apply, in change order.
#[must_use]
pub fn unsupported_changes(changes: &[DiffChange], dialect: &dyn Dialect) -> Vec<String> {
    changes.iter().filter_map(|c| dialect.unsupported(c)).collect()
}

/// Orders `tables` so every table comes after the tables its foreign keys
/// point at. Input order breaks ties; a cycle is broken at the first table
/// still waiting.
fn dependency_order<'t>(tables: &[&'t str], snapshot: &Snapshot) -> Vec<&'t str> {
    let mut remaining = tables.to_vec();
    let mut ordered = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        let ready = remaining
            .iter()
            .position(|&table| {
                snapshot.table(table).is_none_or(|t| {
                    t.foreign_keys.iter().all(|fk| {
                        fk.target_table == table || !remaining.contains(&fk.target_table.as_str())
                    })
                })
            })
            .unwrap_or(0);
        ordered.push(remaining.remove(ready));
    }
    ordered
}

fn terminate(statement: &str) -> String {
    if statement.starts_with("--") {
        statement.to_string()
    } else {
        format!("{statement};")
    }
}

struct Generator<'c, 'a> {
    ctx: &'c SqlContext<'a>,
    dialect: &'c dyn Dialect,
}

impl Generator<'_, '_> {
    fn ident(&self, name: &str) -> String {
        self.dialect.quote_identifier(&name.to_snake_case())
    }

    fn render(&self, change: &DiffChange) -> Vec<String> {
        match change {
            DiffChange::TableAdded { table } => self.create_table(table),
            DiffChange::TableRemoved { table } => vec![self.drop_table(table)],
            DiffChange::ColumnAdded { table, column } => vec![self.add_column(table, column)],
            DiffChange::ColumnRemoved { table, column } => vec![format!(
                "ALTER TABLE {} DROP COLUMN {}",
                self.ident(table),
                self.ident(column)
            )],
            DiffChange::ColumnAltered {
                table,
                column,
                new_type,
                new_nullable,
                ..
            } => self.alter_column(table, column, new_type.as_deref(), *new_nullable),
            DiffChange::ColumnRenamed {
                table,
                old_column,
                new_column,
                ..
            } => vec![format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {}",
                self.ident(table),
                self.ident(old_column),
                self.ident(new_column)
            )],
            DiffChange::IndexAdded { table, columns } => {
                let unique = self
                    .ctx
                    .after
                    .table(table)
                    .and_then(|t| t.index_on(columns))
                    .is_some_and(|i| i.unique);
                vec![self.create_index(table, columns, unique, self.ctx.after)]
            }
            DiffChange::IndexRemoved { table, columns } => {
                let name = self.resolve_index_name(table, columns, self.ctx.before);
                vec![format!("DROP INDEX {}", self.dialect.quote_identifier(&name))]
            }
            DiffChange::EnumAdded { enum_name } => match self.ctx.after.enum_values(enum_name) {
                Some(values) => self.dialect.create_enum(&self.ident(enum_name), values),
                None if self.dialect.supports_enum_types() => {
                    vec![missing("enum", enum_name)]
                }
                None => Vec::new(),
            },
            DiffChange::EnumRemoved { enum_name } => self.dialect.drop_enum(&self.ident(enum_name)),
            DiffChange::EnumAltered {
                enum_name,
                added_values,
                removed_values,
            } => self
                .dialect
                .alter_enum(&self.ident(enum_name), added_values, removed_values),
        }
    }

    fn column_type(&self, column: &str, type_name: &str, snapshot: &Snapshot) -> String {
        snapshot.enum_values(type_name).map_or_else(
            || self.dialect.map_type(type_name),
            |values| {
                self.dialect
                    .enum_column_type(&self.ident(column), &self.ident(type_name), values)
            },
        )
    }

    fn column_definition(&self, name: &str, column: &ColumnSnapshot, snapshot: &Snapshot) -> String {
        let mut sql = format!(
            "{} {}",
            self.ident(name),
            self.column_type(name, &column.type_name, snapshot)
        );
        if !column.nullable || column.primary {
            sql.push_str(" NOT NULL");
        }
        if column.unique && !column.primary {
            sql.push_str(" UNIQUE");
        }
        if let Some(default) = &column.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        sql
    }

    fn create_table(&self, name: &str) -> Vec<String> {
        let Some(table) = self.ctx.after.table(name) else {
            return vec![missing("table", name)];
        };

        // Primary key columns first, then the rest in name order.
        let ordered = table
            .columns
            .iter()
            .filter(|(_, c)| c.primary)
            .chain(table.columns.iter().filter(|(_, c)| !c.primary));
        let mut lines: Vec<String> = ordered
            .map(|(col_name, col)| format!("    {}", self.column_definition(col_name, col, self.ctx.after)))
            .collect();

        let primary: Vec<String> = table.primary_key().map(|c| self.ident(c)).collect();
        if !primary.is_empty() {
            lines.push(format!("    PRIMARY KEY ({})", primary.join(", ")));
        }
        for fk in &table.foreign_keys {
            lines.push(format!(
                "    FOREIGN KEY ({}) REFERENCES {} ({})",
                self.ident(&fk.column),
                self.ident(&fk.target_table),
                self.ident(&fk.target_column)
            ));
        }

        let mut statements = vec![format!(
            "CREATE TABLE {} (\n{}\n)",
            self.ident(name),
            lines.join(",\n")
        )];
        statements.extend(
            table
                .indexes
                .iter()
                .map(|index| self.create_index(name, &index.columns, index.unique, self.ctx.after)),
        );
        statements
    }

    fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE {}", self.ident(table))
    }

    fn add_column(&self, table_name: &str, column: &str) -> String {
        let Some(table) = self.ctx.after.table(table_name) else {
            return missing("table", table_name);
        };
        let Some(col) = table.column(column) else {
            return missing("column", &format!("{table_name}.{column}"));
        };
        let mut sql = format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.ident(table_name),
            self.column_definition(column, col, self.ctx.after)
        );
        if let Some(fk) = table.foreign_keys.iter().find(|fk| fk.column == column) {
            sql.push_str(&format!(
                " REFERENCES {} ({})",
                self.ident(&fk.target_table),
                self.ident(&fk.target_column)
            ));
        }
        sql
    }

    fn alter_column(&self, table: &str, column: &str, new_type: Option<&str>, new_nullable: Option<bool>) -> Vec<String> {
        let mut statements = Vec::new();
        if let Some(new_type) = new_type {
            statements.push(self.dialect.alter_column_type(
                &self.ident(table),
                &self.ident(column),
                &self.column_type(column, new_type, self.ctx.after),
            ));
        }
        if let Some(nullable) = new_nullable {
            statements.push(self.dialect.alter_column_nullable(
                &self.ident(table),
                &self.ident(column),
                nullable,
            ));
        }
        statements
    }

    fn resolve_index_name(&self, table: &str, columns: &[String], snapshot: &Snapshot) -> String {
        snapshot
            .table(table)
            .and_then(|t: &TableSnapshot| t.index_on(columns))
            .and_then(|i| i.name.clone())
            .unwrap_or_else(|| index_name(table, columns))
    }

    fn create_index(&self, table: &str, columns: &[String], unique: bool, snapshot: &Snapshot) -> String {
        let name = self.resolve_index_name(table, columns, snapshot);
        let columns: Vec<String> = columns.iter().map(|c| self.ident(c)).collect();
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            if unique { "UNIQUE " } else { "" },
            self.dialect.quote_identifier(&name),
            self.ident(table),
            columns.join(", ")
        )
    }
}

fn missing(kind: &str, name: &str) -> String {
    format!("-- skipped: no definition found for {kind} {name}")
}
