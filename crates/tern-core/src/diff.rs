//! Schema diff engine.
//!
//! Compares a "before" (last applied) and "after" (desired) [`Snapshot`]
//! and produces the ordered list of [`DiffChange`]s that transforms one into
//! the other.
//!
//! Output ordering: table additions and removals, then per-table column
//! changes (renames, additions, removals, alterations), then index changes,
//! then enum changes. Every collection is walked in name order so the result
//! is deterministic.
//!
//! Column renames are detected heuristically. Every (removed, added) pair in
//! a table gets a confidence score combining metadata equality with name
//! similarity; pairs at or above [`RENAME_CONFIDENCE_THRESHOLD`] are accepted
//! greedily, best first, with no column used twice. Greedy matching is not an
//! optimal assignment, so a table with several simultaneous, mutually
//! ambiguous renames can pair columns differently than intended.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::snapshot::{ColumnSnapshot, IndexSnapshot, Snapshot, TableSnapshot};

/// Minimum confidence for a (removed, added) column pair to become a rename.
pub const RENAME_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Share of the confidence score carried by metadata equality.
const METADATA_WEIGHT: f64 = 0.6;
/// Share of the confidence score carried by name similarity.
const NAME_WEIGHT: f64 = 0.4;

// Per-attribute split of METADATA_WEIGHT.
const TYPE_WEIGHT: f64 = 0.30;
const NULLABLE_WEIGHT: f64 = 0.12;
const PRIMARY_WEIGHT: f64 = 0.06;
const UNIQUE_WEIGHT: f64 = 0.06;
const DEFAULT_WEIGHT: f64 = 0.06;

/// A single schema change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum DiffChange {
    /// A table exists only in the after snapshot.
    TableAdded {
        /// Table name.
        table: String,
    },
    /// A table exists only in the before snapshot.
    TableRemoved {
        /// Table name.
        table: String,
    },
    /// A column was added to an existing table.
    ColumnAdded {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },
    /// A column was removed from an existing table.
    ColumnRemoved {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },
    /// A column's type and/or nullability changed.
    ///
    /// Only the attributes that changed are populated.
    ColumnAltered {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Previous type, when the type changed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        old_type: Option<String>,
        /// New type, when the type changed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_type: Option<String>,
        /// Previous nullability, when it changed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        old_nullable: Option<bool>,
        /// New nullability, when it changed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_nullable: Option<bool>,
    },
    /// A column was renamed.
    ColumnRenamed {
        /// Table name.
        table: String,
        /// Name in the before snapshot.
        old_column: String,
        /// Name in the after snapshot.
        new_column: String,
        /// Match confidence in `[0.0, 1.0]`.
        confidence: f64,
    },
    /// An index was added to an existing table.
    IndexAdded {
        /// Table name.
        table: String,
        /// Indexed columns, in order.
        columns: Vec<String>,
    },
    /// An index was removed from an existing table.
    IndexRemoved {
        /// Table name.
        table: String,
        /// Indexed columns, in order.
        columns: Vec<String>,
    },
    /// An enum type exists only in the after snapshot.
    EnumAdded {
        /// Enum type name.
        enum_name: String,
    },
    /// An enum type exists only in the before snapshot.
    EnumRemoved {
        /// Enum type name.
        enum_name: String,
    },
    /// An enum type's value set changed.
    EnumAltered {
        /// Enum type name.
        enum_name: String,
        /// Values only in the after snapshot, in after order.
        added_values: Vec<String>,
        /// Values only in the before snapshot, in before order.
        removed_values: Vec<String>,
    },
}

impl DiffChange {
    /// Returns the `type` tag used in the serialized form.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TableAdded { .. } => "table_added",
            Self::TableRemoved { .. } => "table_removed",
            Self::ColumnAdded { .. } => "column_added",
            Self::ColumnRemoved { .. } => "column_removed",
            Self::ColumnAltered { .. } => "column_altered",
            Self::ColumnRenamed { .. } => "column_renamed",
            Self::IndexAdded { .. } => "index_added",
            Self::IndexRemoved { .. } => "index_removed",
            Self::EnumAdded { .. } => "enum_added",
            Self::EnumRemoved { .. } => "enum_removed",
            Self::EnumAltered { .. } => "enum_altered",
        }
    }

    /// Returns the table this change touches, if any.
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::TableAdded { table }
            | Self::TableRemoved { table }
            | Self::ColumnAdded { table, .. }
            | Self::ColumnRemoved { table, .. }
            | Self::ColumnAltered { table, .. }
            | Self::ColumnRenamed { table, .. }
            | Self::IndexAdded { table, .. }
            | Self::IndexRemoved { table, .. } => Some(table),
            Self::EnumAdded { .. } | Self::EnumRemoved { .. } | Self::EnumAltered { .. } => None,
        }
    }

    /// Returns true for changes that discard stored data.
    #[must_use]
    pub const fn is_destructive(&self) -> bool {
        matches!(self, Self::TableRemoved { .. } | Self::ColumnRemoved { .. })
    }
}

impl fmt::Display for DiffChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TableAdded { table } => write!(f, "add table {table}"),
            Self::TableRemoved { table } => write!(f, "drop table {table}"),
            Self::ColumnAdded { table, column } => write!(f, "add column {table}.{column}"),
            Self::ColumnRemoved { table, column } => write!(f, "drop column {table}.{column}"),
            Self::ColumnAltered {
                table,
                column,
                old_type,
                new_type,
                old_nullable,
                new_nullable,
            } => {
                write!(f, "alter column {table}.{column}")?;
                if let (Some(old), Some(new)) = (old_type, new_type) {
                    write!(f, " type {old} -> {new}")?;
                }
                if let (Some(old), Some(new)) = (old_nullable, new_nullable) {
                    write!(f, " nullable {old} -> {new}")?;
                }
                Ok(())
            }
            Self::ColumnRenamed {
                table,
                old_column,
                new_column,
                confidence,
            } => write!(
                f,
                "rename column {table}.{old_column} -> {new_column} (confidence {confidence:.2})"
            ),
            Self::IndexAdded { table, columns } => {
                write!(f, "add index on {table} ({})", columns.join(", "))
            }
            Self::IndexRemoved { table, columns } => {
                write!(f, "drop index on {table} ({})", columns.join(", "))
            }
            Self::EnumAdded { enum_name } => write!(f, "add enum {enum_name}"),
            Self::EnumRemoved { enum_name } => write!(f, "drop enum {enum_name}"),
            Self::EnumAltered {
                enum_name,
                added_values,
                removed_values,
            } => write!(
                f,
                "alter enum {enum_name} (+[{}] -[{}])",
                added_values.join(", "),
                removed_values.join(", ")
            ),
        }
    }
}

/// The ordered change list between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    /// Changes, in application order.
    pub changes: Vec<DiffChange>,
}

impl DiffResult {
    /// Returns true if the snapshots are structurally identical.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Changes that discard stored data.
    pub fn destructive(&self) -> impl Iterator<Item = &DiffChange> {
        self.changes.iter().filter(|c| c.is_destructive())
    }
}

// ================================================================
// String similarity helpers
// ================================================================

/// Computes the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev = (0..=b.len()).collect::<Vec<_>>();
    let mut curr = vec![0; b.len() + 1];
    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Lowercases and drops separators so `full_name` and `fullName` compare equal.
fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Name similarity in `[0.0, 1.0]`: the better of normalized edit-distance
/// similarity and substring overlap (shorter length over longer length when
/// one name contains the other).
#[allow(clippy::cast_precision_loss)]
fn name_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_name(a);
    let b = normalize_name(b);
    let (a_len, b_len) = (a.chars().count(), b.chars().count());
    let max_len = a_len.max(b_len);
    if max_len == 0 {
        return 1.0;
    }
    let edit = 1.0 - (levenshtein(&a, &b) as f64 / max_len as f64);
    let overlap = if a_len > 0 && b_len > 0 && (a.contains(&b) || b.contains(&a)) {
        a_len.min(b_len) as f64 / max_len as f64
    } else {
        0.0
    };
    edit.max(overlap)
}

/// Confidence that `old` (removed) and `new` (added) are the same column.
fn rename_confidence(old_name: &str, old: &ColumnSnapshot, new_name: &str, new: &ColumnSnapshot) -> f64 {
    let weight = |same: bool, w: f64| if same { w } else { 0.0 };
    let metadata = weight(old.type_name == new.type_name, TYPE_WEIGHT)
        + weight(old.nullable == new.nullable, NULLABLE_WEIGHT)
        + weight(old.primary == new.primary, PRIMARY_WEIGHT)
        + weight(old.unique == new.unique, UNIQUE_WEIGHT)
        + weight(old.default == new.default, DEFAULT_WEIGHT);
    debug_assert!(metadata <= METADATA_WEIGHT + f64::EPSILON);
    (metadata + NAME_WEIGHT * name_similarity(old_name, new_name)).clamp(0.0, 1.0)
}

struct RenameCandidate<'a> {
    old: &'a str,
    new: &'a str,
    confidence: f64,
}

/// Greedily pairs removed and added columns into renames.
fn match_renames<'a>(
    before: &'a TableSnapshot,
    after: &'a TableSnapshot,
    removed: &[&'a str],
    added: &[&'a str],
) -> Vec<RenameCandidate<'a>> {
    let mut candidates = Vec::new();
    for &old in removed {
        for &new in added {
            let (Some(old_col), Some(new_col)) = (before.column(old), after.column(new)) else {
                continue;
            };
            let confidence = rename_confidence(old, old_col, new, new_col);
            if confidence >= RENAME_CONFIDENCE_THRESHOLD {
                candidates.push(RenameCandidate {
                    old,
                    new,
                    confidence,
                });
            }
        }
    }
    candidates.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.old.cmp(b.old))
            .then_with(|| a.new.cmp(b.new))
    });

    let mut used_old = BTreeSet::new();
    let mut used_new = BTreeSet::new();
    let mut accepted = Vec::new();
    for candidate in candidates {
        if used_old.contains(candidate.old) || used_new.contains(candidate.new) {
            continue;
        }
        used_old.insert(candidate.old);
        used_new.insert(candidate.new);
        accepted.push(candidate);
    }
    accepted
}

// ================================================================
// Diff
// ================================================================

/// Computes the changes that transform `before` into `after`.
#[must_use]
pub fn compute_diff(before: &Snapshot, after: &Snapshot) -> DiffResult {
    let mut changes = Vec::new();

    for name in after.tables.keys() {
        if !before.tables.contains_key(name) {
            changes.push(DiffChange::TableAdded {
                table: name.clone(),
            });
        }
    }
    for name in before.tables.keys() {
        if !after.tables.contains_key(name) {
            changes.push(DiffChange::TableRemoved {
                table: name.clone(),
            });
        }
    }

    let common: Vec<(&String, &TableSnapshot, &TableSnapshot)> = before
        .tables
        .iter()
        .filter_map(|(name, old)| after.tables.get(name).map(|new| (name, old, new)))
        .collect();

    for &(name, old, new) in &common {
        diff_columns(name, old, new, &mut changes);
    }
    for &(name, old, new) in &common {
        diff_indexes(name, &old.indexes, &new.indexes, &mut changes);
    }
    diff_enums(before, after, &mut changes);

    DiffResult { changes }
}

fn diff_columns(table: &str, before: &TableSnapshot, after: &TableSnapshot, changes: &mut Vec<DiffChange>) {
    let removed: Vec<&str> = before
        .columns
        .keys()
        .filter(|c| !after.columns.contains_key(*c))
        .map(String::as_str)
        .collect();
    let added: Vec<&str> = after
        .columns
        .keys()
        .filter(|c| !before.columns.contains_key(*c))
        .map(String::as_str)
        .collect();

    let renames = if removed.is_empty() || added.is_empty() {
        Vec::new()
    } else {
        match_renames(before, after, &removed, &added)
    };
    let renamed_old: BTreeSet<&str> = renames.iter().map(|r| r.old).collect();
    let renamed_new: BTreeSet<&str> = renames.iter().map(|r| r.new).collect();

    for rename in &renames {
        changes.push(DiffChange::ColumnRenamed {
            table: table.to_string(),
            old_column: rename.old.to_string(),
            new_column: rename.new.to_string(),
            confidence: rename.confidence,
        });
        // A renamed column keeps its new name for any attribute change.
        if let (Some(old), Some(new)) = (before.column(rename.old), after.column(rename.new)) {
            changes.extend(column_altered(table, rename.new, old, new));
        }
    }
    for column in added.iter().filter(|c| !renamed_new.contains(*c)) {
        changes.push(DiffChange::ColumnAdded {
            table: table.to_string(),
            column: (*column).to_string(),
        });
    }
    for column in removed.iter().filter(|c| !renamed_old.contains(*c)) {
        changes.push(DiffChange::ColumnRemoved {
            table: table.to_string(),
            column: (*column).to_string(),
        });
    }

    for (column, old) in &before.columns {
        if let Some(new) = after.columns.get(column) {
            changes.extend(column_altered(table, column, old, new));
        }
    }
}

/// Type and nullability differences between two versions of one column.
fn column_altered(table: &str, column: &str, old: &ColumnSnapshot, new: &ColumnSnapshot) -> Option<DiffChange> {
    let type_changed = old.type_name != new.type_name;
    let nullable_changed = old.nullable != new.nullable;
    if !type_changed && !nullable_changed {
        return None;
    }
    Some(DiffChange::ColumnAltered {
        table: table.to_string(),
        column: column.to_string(),
        old_type: type_changed.then(|| old.type_name.clone()),
        new_type: type_changed.then(|| new.type_name.clone()),
        old_nullable: nullable_changed.then_some(old.nullable),
        new_nullable: nullable_changed.then_some(new.nullable),
    })
}

fn diff_indexes(table: &str, before: &[IndexSnapshot], after: &[IndexSnapshot], changes: &mut Vec<DiffChange>) {
    for index in before {
        if !after.iter().any(|i| i.columns == index.columns) {
            changes.push(DiffChange::IndexRemoved {
                table: table.to_string(),
                columns: index.columns.clone(),
            });
        }
    }
    for index in after {
        if !before.iter().any(|i| i.columns == index.columns) {
            changes.push(DiffChange::IndexAdded {
                table: table.to_string(),
                columns: index.columns.clone(),
            });
        }
    }
}

fn diff_enums(before: &Snapshot, after: &Snapshot, changes: &mut Vec<DiffChange>) {
    for name in after.enums.keys() {
        if !before.enums.contains_key(name) {
            changes.push(DiffChange::EnumAdded {
                enum_name: name.clone(),
            });
        }
    }
    for name in before.enums.keys() {
        if !after.enums.contains_key(name) {
            changes.push(DiffChange::EnumRemoved {
                enum_name: name.clone(),
            });
        }
    }
    for (name, old_values) in &before.enums {
        let Some(new_values) = after.enums.get(name) else {
            continue;
        };
        let added_values: Vec<String> = new_values
            .iter()
            .filter(|v| !old_values.contains(v))
            .cloned()
            .collect();
        let removed_values: Vec<String> = old_values
            .iter()
            .filter(|v| !new_values.contains(v))
            .cloned()
            .collect();
        if !added_values.is_empty() || !removed_values.is_empty() {
            changes.push(DiffChange::EnumAltered {
                enum_name: name.clone(),
                added_values,
                removed_values,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{ColumnDefinition, EnumDefinition, TableDefinition};
    use crate::snapshot::create_snapshot;

    fn users() -> TableDefinition {
        TableDefinition::new("users")
            .column(ColumnDefinition::new("id", "uuid").primary_key())
            .column(ColumnDefinition::new("email", "text").unique())
            .column(ColumnDefinition::new("name", "text"))
    }

    fn snap(tables: &[TableDefinition]) -> Snapshot {
        create_snapshot(tables, &[])
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", "abc"), 0);
        assert_eq!(levenshtein("abc", "ab"), 1);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
    }

    #[test]
    fn test_name_similarity() {
        assert!((name_similarity("full_name", "fullName") - 1.0).abs() < f64::EPSILON);
        assert!((name_similarity("name", "fullName") - 0.5).abs() < f64::EPSILON);
        assert!(name_similarity("body", "summary") < 0.2);
    }

    #[test]
    fn test_identical_snapshots_produce_no_changes() {
        let s = create_snapshot(
            &[users().index(["name", "email"])],
            &[EnumDefinition::new("role", ["admin", "member"])],
        );
        assert!(compute_diff(&s, &s).is_empty());
        assert!(compute_diff(&Snapshot::new(), &Snapshot::new()).is_empty());
    }

    #[test]
    fn test_new_table_is_a_single_change() {
        let diff = compute_diff(&Snapshot::new(), &snap(&[users()]));
        assert_eq!(
            diff.changes,
            vec![DiffChange::TableAdded {
                table: "users".into()
            }]
        );
    }

    #[test]
    fn test_table_removed() {
        let diff = compute_diff(&snap(&[users()]), &Snapshot::new());
        assert_eq!(diff.changes.len(), 1);
        assert!(diff.changes[0].is_destructive());
        assert_eq!(diff.destructive().count(), 1);
    }

    #[test]
    fn test_rename_detected() {
        let before = snap(&[users()]);
        let after = snap(&[TableDefinition::new("users")
            .column(ColumnDefinition::new("id", "uuid").primary_key())
            .column(ColumnDefinition::new("email", "text").unique())
            .column(ColumnDefinition::new("fullName", "text"))]);

        let diff = compute_diff(&before, &after);
        assert_eq!(diff.changes.len(), 1);
        match &diff.changes[0] {
            DiffChange::ColumnRenamed {
                table,
                old_column,
                new_column,
                confidence,
            } => {
                assert_eq!(table, "users");
                assert_eq!(old_column, "name");
                assert_eq!(new_column, "fullName");
                assert!(*confidence >= RENAME_CONFIDENCE_THRESHOLD);
            }
            other => panic!("expected rename, got {other:?}"),
        }
    }

    #[test]
    fn test_dissimilar_names_are_add_and_remove() {
        let before = snap(&[TableDefinition::new("posts")
            .column(ColumnDefinition::new("id", "uuid").primary_key())
            .column(ColumnDefinition::new("body", "text"))]);
        let after = snap(&[TableDefinition::new("posts")
            .column(ColumnDefinition::new("id", "uuid").primary_key())
            .column(ColumnDefinition::new("summary", "text"))]);

        let kinds: Vec<&str> = compute_diff(&before, &after)
            .changes
            .iter()
            .map(DiffChange::kind)
            .collect();
        assert_eq!(kinds, vec!["column_added", "column_removed"]);
    }

    #[test]
    fn test_type_mismatch_blocks_rename() {
        let before = snap(&[TableDefinition::new("t").column(ColumnDefinition::new("count", "integer"))]);
        let after = snap(&[TableDefinition::new("t")
            .column(ColumnDefinition::new("counts", "text").nullable())]);

        let diff = compute_diff(&before, &after);
        assert!(diff
            .changes
            .iter()
            .all(|c| !matches!(c, DiffChange::ColumnRenamed { .. })));
    }

    #[test]
    fn test_greedy_matching_never_reuses_a_column() {
        let before = snap(&[TableDefinition::new("people")
            .column(ColumnDefinition::new("first", "text"))
            .column(ColumnDefinition::new("last", "text"))]);
        let after = snap(&[TableDefinition::new("people")
            .column(ColumnDefinition::new("first_name", "text"))
            .column(ColumnDefinition::new("last_name", "text"))]);

        let diff = compute_diff(&before, &after);
        let renames: Vec<(&str, &str)> = diff
            .changes
            .iter()
            .filter_map(|c| match c {
                DiffChange::ColumnRenamed {
                    old_column,
                    new_column,
                    ..
                } => Some((old_column.as_str(), new_column.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(renames, vec![("first", "first_name"), ("last", "last_name")]);
        assert_eq!(diff.len(), 2);
    }

    #[test]
    fn test_rename_keeps_nullability_change() {
        let before = snap(&[TableDefinition::new("people").column(ColumnDefinition::new("first", "text"))]);
        let after = snap(&[TableDefinition::new("people")
            .column(ColumnDefinition::new("first_name", "text").nullable())]);

        let diff = compute_diff(&before, &after);
        assert_eq!(diff.len(), 2);
        assert!(matches!(
            &diff.changes[0],
            DiffChange::ColumnRenamed { old_column, new_column, .. }
                if old_column == "first" && new_column == "first_name"
        ));
        assert_eq!(
            diff.changes[1],
            DiffChange::ColumnAltered {
                table: "people".into(),
                column: "first_name".into(),
                old_type: None,
                new_type: None,
                old_nullable: Some(false),
                new_nullable: Some(true),
            }
        );
    }

    #[test]
    fn test_column_altered_reports_only_changed_attributes() {
        let before = snap(&[TableDefinition::new("t")
            .column(ColumnDefinition::new("a", "integer"))
            .column(ColumnDefinition::new("b", "text"))]);
        let after = snap(&[TableDefinition::new("t")
            .column(ColumnDefinition::new("a", "bigint"))
            .column(ColumnDefinition::new("b", "text").nullable())]);

        let diff = compute_diff(&before, &after);
        assert_eq!(
            diff.changes,
            vec![
                DiffChange::ColumnAltered {
                    table: "t".into(),
                    column: "a".into(),
                    old_type: Some("integer".into()),
                    new_type: Some("bigint".into()),
                    old_nullable: None,
                    new_nullable: None,
                },
                DiffChange::ColumnAltered {
                    table: "t".into(),
                    column: "b".into(),
                    old_type: None,
                    new_type: None,
                    old_nullable: Some(false),
                    new_nullable: Some(true),
                },
            ]
        );
    }

    #[test]
    fn test_changed_index_is_remove_then_add() {
        let before = snap(&[users().index(["name", "email"])]);
        let after = snap(&[users().index(["email", "name"])]);

        let diff = compute_diff(&before, &after);
        assert_eq!(
            diff.changes,
            vec![
                DiffChange::IndexRemoved {
                    table: "users".into(),
                    columns: vec!["name".into(), "email".into()],
                },
                DiffChange::IndexAdded {
                    table: "users".into(),
                    columns: vec!["email".into(), "name".into()],
                },
            ]
        );
    }

    #[test]
    fn test_enum_changes_keep_source_order() {
        let before = create_snapshot(
            &[],
            &[
                EnumDefinition::new("status", ["c", "b", "a"]),
                EnumDefinition::new("legacy", ["x"]),
            ],
        );
        let after = create_snapshot(
            &[],
            &[
                EnumDefinition::new("status", ["a", "z", "y"]),
                EnumDefinition::new("role", ["admin"]),
            ],
        );

        let diff = compute_diff(&before, &after);
        assert_eq!(
            diff.changes,
            vec![
                DiffChange::EnumAdded {
                    enum_name: "role".into()
                },
                DiffChange::EnumRemoved {
                    enum_name: "legacy".into()
                },
                DiffChange::EnumAltered {
                    enum_name: "status".into(),
                    added_values: vec!["z".into(), "y".into()],
                    removed_values: vec!["c".into(), "b".into()],
                },
            ]
        );
    }

    #[test]
    fn test_reordered_enum_values_are_not_a_change() {
        let before = create_snapshot(&[], &[EnumDefinition::new("s", ["a", "b"])]);
        let after = create_snapshot(&[], &[EnumDefinition::new("s", ["b", "a"])]);
        assert!(compute_diff(&before, &after).is_empty());
    }

    #[test]
    fn test_changes_serialize_with_type_tag() {
        let change = DiffChange::ColumnRenamed {
            table: "users".into(),
            old_column: "name".into(),
            new_column: "fullName".into(),
            confidence: 0.8,
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["type"], "column_renamed");
        assert_eq!(json["oldColumn"], "name");
        assert_eq!(json["newColumn"], "fullName");

        let altered: DiffChange = serde_json::from_str(
            r#"{"type":"column_altered","table":"t","column":"c","oldNullable":false,"newNullable":true}"#,
        )
        .unwrap();
        assert_eq!(altered.kind(), "column_altered");
        assert_eq!(altered.to_string(), "alter column t.c nullable false -> true");
    }
}
