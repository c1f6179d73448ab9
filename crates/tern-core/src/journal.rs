//! Migration journal.
//!
//! The journal (`journal.json` next to the migration files) is an
//! append-only ledger of generated migration files. It exists to catch
//! sequence-number collisions, typically two branches that each generated
//! `0005_*.sql`, before either file reaches the runner.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::naming::{migration_stem, parse_migration_name, parse_sequence};

/// Journal format version.
pub const JOURNAL_VERSION: u32 = 1;

/// A single journaled migration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    /// Migration name (e.g. `0001_create_users`).
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// When the migration file was generated.
    pub created_at: DateTime<Utc>,
    /// Checksum of the generated SQL.
    pub checksum: String,
}

/// Migration journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    /// Journal format version.
    pub version: u32,
    /// Entries in the order they were generated.
    pub migrations: Vec<JournalEntry>,
}

impl Default for Journal {
    fn default() -> Self {
        create_journal()
    }
}

impl Journal {
    /// Returns the entry with the given sequence number.
    #[must_use]
    pub fn entry_for_sequence(&self, sequence: u32) -> Option<&JournalEntry> {
        self.migrations
            .iter()
            .find(|e| parse_sequence(&e.name) == Some(sequence))
    }

    /// Sequence numbers of all conventional entries.
    pub fn sequences(&self) -> impl Iterator<Item = u32> + '_ {
        self.migrations.iter().filter_map(|e| parse_sequence(&e.name))
    }
}

/// A candidate file whose sequence number is already journaled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collision {
    /// Journaled entry holding the sequence number.
    pub existing_name: String,
    /// Candidate file that reuses it.
    pub conflicting_name: String,
    /// The contested sequence number.
    pub sequence_number: u32,
    /// Candidate renamed to the next free sequence number.
    pub suggested_name: String,
}

/// Creates an empty journal.
#[must_use]
pub const fn create_journal() -> Journal {
    Journal {
        version: JOURNAL_VERSION,
        migrations: Vec::new(),
    }
}

/// Returns a new journal with `entry` appended. The input is left untouched.
#[must_use]
pub fn add_journal_entry(journal: &Journal, entry: JournalEntry) -> Journal {
    let mut next = journal.clone();
    next.migrations.push(entry);
    next
}

/// Sequence number for the next generated migration, or `None` once
/// `u32::MAX` is taken.
#[must_use]
pub fn next_sequence(journal: &Journal) -> Option<u32> {
    journal.sequences().max().map_or(Some(1), |max| max.checked_add(1))
}

/// Smallest number above everything in `taken`, falling back to the lowest
/// free number when the top of the range is used.
fn next_free(taken: &BTreeSet<u32>) -> Option<u32> {
    taken
        .last()
        .map_or(Some(1), |max| max.checked_add(1))
        .or_else(|| (1..=u32::MAX).find(|n| !taken.contains(n)))
}

/// Reads the journal at `path`. A missing file yields an empty journal.
///
/// # Errors
///
/// Returns an IO error for unreadable files and the `serde_json` error,
/// unmodified, for malformed content.
pub fn read_journal(path: &Path) -> Result<Journal> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(serde_json::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(create_journal()),
        Err(e) => Err(e.into()),
    }
}

/// Writes the journal to `path` as pretty JSON, creating parent directories.
///
/// # Errors
///
/// Returns an IO or serialization error.
pub fn write_journal(path: &Path, journal: &Journal) -> Result<()> {
    let json = serde_json::to_string_pretty(journal)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, json)?;
    Ok(())
}

/// Reports candidates whose sequence number is already taken by a
/// different journaled entry.
///
/// Each collision suggests the smallest number above everything taken so
/// far (journaled numbers, non-colliding candidates and earlier
/// suggestions), so simultaneous collisions get distinct suggestions.
/// A candidate that *is* the journaled entry (same name, with or without
/// `.sql`) is not a collision.
#[must_use]
pub fn detect_collisions<S: AsRef<str>>(journal: &Journal, candidates: &[S]) -> Vec<Collision> {
    let conflicts: Vec<(&JournalEntry, &str)> = candidates
        .iter()
        .map(AsRef::as_ref)
        .filter_map(|candidate| {
            let sequence = parse_sequence(candidate)?;
            let existing = journal.entry_for_sequence(sequence)?;
            (migration_stem(&existing.name) != migration_stem(candidate)).then_some((existing, candidate))
        })
        .collect();

    let conflicting: BTreeSet<&str> = conflicts.iter().map(|(_, c)| *c).collect();
    let mut taken: BTreeSet<u32> = journal.sequences().collect();
    taken.extend(
        candidates
            .iter()
            .map(AsRef::as_ref)
            .filter(|c| !conflicting.contains(c))
            .filter_map(parse_sequence),
    );

    let mut collisions = Vec::new();
    for (existing, candidate) in conflicts {
        let Some(parsed) = parse_migration_name(candidate) else {
            continue;
        };
        let Some(suggestion) = next_free(&taken) else {
            continue;
        };
        taken.insert(suggestion);
        collisions.push(Collision {
            existing_name: existing.name.clone(),
            conflicting_name: candidate.to_string(),
            sequence_number: parsed.sequence,
            suggested_name: parsed.with_sequence(suggestion),
        });
    }
    collisions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> JournalEntry {
        JournalEntry {
            name: name.to_string(),
            description: name.split_once('_').map_or("", |(_, d)| d).to_string(),
            created_at: DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            checksum: crate::checksum::checksum(name),
        }
    }

    fn journal(names: &[&str]) -> Journal {
        names
            .iter()
            .fold(create_journal(), |j, n| add_journal_entry(&j, entry(n)))
    }

    #[test]
    fn test_add_entry_does_not_mutate() {
        let empty = create_journal();
        let one = add_journal_entry(&empty, entry("0001_init"));

        assert!(empty.migrations.is_empty());
        assert_eq!(one.migrations.len(), 1);
        assert_eq!(one.version, JOURNAL_VERSION);
    }

    #[test]
    fn test_next_sequence() {
        assert_eq!(next_sequence(&create_journal()), Some(1));
        assert_eq!(next_sequence(&journal(&["0001_a", "0004_b"])), Some(5));
    }

    #[test]
    fn test_sequence_at_u32_max() {
        let j = journal(&["0001_init", "4294967295_last"]);
        assert_eq!(next_sequence(&j), None);

        let collisions = detect_collisions(&j, &["0001_posts.sql"]);
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].suggested_name, "0002_posts.sql");
    }

    #[test]
    fn test_collisions_get_distinct_suggestions() {
        let j = journal(&["0001_init", "0002_users"]);
        let collisions = detect_collisions(&j, &["0001_posts.sql", "0002_tags.sql"]);

        assert_eq!(collisions.len(), 2);
        assert_eq!(collisions[0].existing_name, "0001_init");
        assert_eq!(collisions[0].sequence_number, 1);
        assert_eq!(collisions[0].suggested_name, "0003_posts.sql");
        assert_eq!(collisions[1].sequence_number, 2);
        assert_eq!(collisions[1].suggested_name, "0004_tags.sql");
    }

    #[test]
    fn test_suggestions_skip_other_candidates() {
        let j = journal(&["0001_init"]);
        let collisions = detect_collisions(&j, &["0001_other.sql", "0002_next.sql"]);

        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].suggested_name, "0003_other.sql");
    }

    #[test]
    fn test_same_file_is_not_a_collision() {
        let j = journal(&["0001_init"]);
        assert!(detect_collisions(&j, &["0001_init.sql", "0001_init", "README.md"]).is_empty());
    }

    #[test]
    fn test_read_missing_journal_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let j = read_journal(&dir.path().join("journal.json")).unwrap();
        assert_eq!(j, create_journal());
    }

    #[test]
    fn test_write_then_read_journal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("migrations").join("journal.json");
        let j = journal(&["0001_init"]);

        write_journal(&path, &j).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"createdAt\""));
        assert_eq!(read_journal(&path).unwrap(), j);
    }

    #[test]
    fn test_malformed_journal_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.json");
        fs::write(&path, "[1, 2").unwrap();

        assert!(matches!(read_journal(&path), Err(crate::error::Error::Json(_))));
    }
}
