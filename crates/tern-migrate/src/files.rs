//! Migration files on disk.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use tern_core::naming::{migration_stem, parse_sequence};
use tracing::debug;

use crate::error::Result;

/// A migration read from disk (or built in memory).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    /// Name without the `.sql` extension, e.g. `0001_create_users`.
    pub name: String,
    /// Raw SQL text, hashed verbatim for drift detection.
    pub sql: String,
    /// Last modification time, when known.
    pub timestamp: Option<DateTime<Utc>>,
}

impl MigrationFile {
    /// Creates an in-memory migration file.
    #[must_use]
    pub fn new(name: impl AsRef<str>, sql: impl Into<String>) -> Self {
        Self {
            name: migration_stem(name.as_ref()).to_string(),
            sql: sql.into(),
            timestamp: None,
        }
    }

    /// Sequence number from the name, if it follows the convention.
    #[must_use]
    pub fn sequence(&self) -> Option<u32> {
        parse_sequence(&self.name)
    }
}

/// Reads every `NNNN_description.sql` file in `dir`, sorted by sequence.
///
/// Files that do not follow the naming convention are skipped. A missing
/// directory yields an empty list.
///
/// # Errors
///
/// Returns an IO error if the directory or a migration file cannot be read.
pub fn read_migration_dir(dir: &Path) -> Result<Vec<MigrationFile>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if !file_name.ends_with(".sql") || parse_sequence(file_name).is_none() {
            debug!(file = %file_name, "Skipping non-migration file");
            continue;
        }
        let path = entry.path();
        let timestamp = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        files.push(MigrationFile {
            name: migration_stem(file_name).to_string(),
            sql: fs::read_to_string(&path)?,
            timestamp,
        });
    }

    files.sort_by(|a, b| a.sequence().cmp(&b.sequence()).then_with(|| a.name.cmp(&b.name)));
    Ok(files)
}
