//! Schema snapshot types.
//!
//! A [`Snapshot`] is the serializable, point-in-time description of an entire
//! schema. It is produced either from [`TableDefinition`]s via
//! [`create_snapshot`] or from a live database by the introspector, and it is
//! the only input the differ looks at.
//!
//! Snapshots are JSON round-trip stable: optional fields are omitted when
//! empty and restored to the same empty value when read back.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::definition::{EnumDefinition, TableDefinition};
use crate::error::Result;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

/// A snapshot of a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSnapshot {
    /// Logical type name (definition-derived) or raw engine type
    /// (introspected). Compared verbatim by the differ.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Whether the column allows NULL values.
    pub nullable: bool,
    /// Whether the column is part of the primary key.
    pub primary: bool,
    /// Whether the column carries a single-column UNIQUE constraint.
    pub unique: bool,
    /// Default value as a raw SQL expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Free-form annotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Vec<String>>,
}

impl ColumnSnapshot {
    /// Creates a NOT NULL, non-key column of the given type.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            nullable: false,
            primary: false,
            unique: false,
            default: None,
            annotations: None,
        }
    }

    /// Returns true if every structural attribute matches `other`.
    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        self.type_name == other.type_name
            && self.nullable == other.nullable
            && self.primary == other.primary
            && self.unique == other.unique
            && self.default == other.default
    }
}

/// A snapshot of a secondary index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    /// Indexed columns, in order.
    pub columns: Vec<String>,
    /// Index name, if one was declared or introspected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether this is a UNIQUE index.
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,
}

/// A snapshot of a single-column foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeySnapshot {
    /// Referencing column in this table.
    pub column: String,
    /// Referenced table.
    pub target_table: String,
    /// Referenced column.
    pub target_column: String,
}

/// A snapshot of a single table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSnapshot {
    /// Columns keyed by name.
    pub columns: BTreeMap<String, ColumnSnapshot>,
    /// Secondary indexes (multi-column or explicitly declared).
    #[serde(default)]
    pub indexes: Vec<IndexSnapshot>,
    /// Foreign keys.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeySnapshot>,
    /// Opaque metadata carried through untouched.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl TableSnapshot {
    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnSnapshot> {
        self.columns.get(name)
    }

    /// Names of the primary key columns, in column-name order.
    pub fn primary_key(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|(_, c)| c.primary)
            .map(|(name, _)| name.as_str())
    }

    /// Finds an index by its exact ordered column list.
    #[must_use]
    pub fn index_on(&self, columns: &[String]) -> Option<&IndexSnapshot> {
        self.indexes.iter().find(|i| i.columns == columns)
    }
}

/// A snapshot of an entire schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot format version.
    pub version: u32,
    /// Tables keyed by name, sorted for deterministic iteration.
    pub tables: BTreeMap<String, TableSnapshot>,
    /// Enum types keyed by name; values keep declaration order.
    #[serde(default)]
    pub enums: BTreeMap<String, Vec<String>>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            tables: BTreeMap::new(),
            enums: BTreeMap::new(),
        }
    }

    /// Returns true if the snapshot has no tables and no enums.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.enums.is_empty()
    }

    /// Looks up a table by name.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableSnapshot> {
        self.tables.get(name)
    }

    /// Looks up a column by table and column name.
    #[must_use]
    pub fn column(&self, table: &str, column: &str) -> Option<&ColumnSnapshot> {
        self.tables.get(table).and_then(|t| t.column(column))
    }

    /// Returns the values of `type_name` if it names an enum.
    #[must_use]
    pub fn enum_values(&self, type_name: &str) -> Option<&[String]> {
        self.enums.get(type_name).map(Vec::as_slice)
    }

    /// Parses a snapshot from JSON.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error for malformed input.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Serializes the snapshot to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a snapshot from table and enum definitions.
///
/// Single-column primary key and unique declarations become column flags;
/// a single-column unique index without an explicit name is folded into the
/// column's `unique` flag as well, so the same constraint never appears twice.
#[must_use]
pub fn create_snapshot(tables: &[TableDefinition], enums: &[EnumDefinition]) -> Snapshot {
    let mut snapshot = Snapshot::new();

    for def in tables {
        let mut table = TableSnapshot {
            metadata: def.metadata.clone(),
            ..TableSnapshot::default()
        };

        for col in &def.columns {
            table.columns.insert(
                col.name.clone(),
                ColumnSnapshot {
                    type_name: col.type_name.clone(),
                    nullable: col.nullable && !col.primary_key,
                    primary: col.primary_key,
                    unique: col.unique && !col.primary_key,
                    default: col.default.clone(),
                    annotations: (!col.annotations.is_empty()).then(|| col.annotations.clone()),
                },
            );
            if let Some((target_table, target_column)) = &col.references {
                table.foreign_keys.push(ForeignKeySnapshot {
                    column: col.name.clone(),
                    target_table: target_table.clone(),
                    target_column: target_column.clone(),
                });
            }
        }

        for idx in &def.indexes {
            if idx.unique && idx.name.is_none() && idx.columns.len() == 1 {
                if let Some(col) = table.columns.get_mut(&idx.columns[0]) {
                    if !col.primary {
                        col.unique = true;
                    }
                    continue;
                }
            }
            if table.index_on(&idx.columns).is_some() {
                continue;
            }
            table.indexes.push(IndexSnapshot {
                columns: idx.columns.clone(),
                name: idx.name.clone(),
                unique: idx.unique,
            });
        }

        snapshot.tables.insert(def.name.clone(), table);
    }

    for e in enums {
        snapshot.enums.insert(e.name.clone(), e.values.clone());
    }

    snapshot
}

/// Reads a snapshot file. A missing file yields `Ok(None)`.
///
/// # Errors
///
/// Returns an IO error for unreadable files and the `serde_json` error,
/// unmodified, for malformed content.
pub fn read_snapshot(path: &Path) -> Result<Option<Snapshot>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(Snapshot::from_json(&contents)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Writes a snapshot file, creating parent directories as needed.
///
/// # Errors
///
/// Returns an IO or serialization error.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let json = snapshot.to_json()?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, json)?;
    Ok(())
}
