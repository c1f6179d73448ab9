//! Migration filename convention: `NNNN_description.sql`.
//!
//! The sequence prefix is zero-padded to at least four digits. Names that do
//! not follow the convention parse to `None` and are ignored by callers.

use std::sync::OnceLock;

use heck::ToSnakeCase;
use regex::Regex;

/// Minimum width of the zero-padded sequence prefix.
pub const SEQUENCE_WIDTH: usize = 4;

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{4,})_(.+?)(\.sql)?$").expect("Invalid migration filename regex")
    })
}

/// The parts of a conventional migration filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationName<'a> {
    /// Parsed sequence number.
    pub sequence: u32,
    /// Digits of the prefix as written, used to keep padding.
    pub digits: &'a str,
    /// Description between the prefix and the extension.
    pub description: &'a str,
    /// Whether the name carries the `.sql` extension.
    pub has_extension: bool,
}

impl MigrationName<'_> {
    /// Same name with a different sequence number, keeping the original
    /// padding width and extension.
    #[must_use]
    pub fn with_sequence(&self, sequence: u32) -> String {
        let width = self.digits.len().max(SEQUENCE_WIDTH);
        format!(
            "{sequence:0width$}_{}{}",
            self.description,
            if self.has_extension { ".sql" } else { "" }
        )
    }
}

/// Splits a migration filename into its parts.
#[must_use]
pub fn parse_migration_name(name: &str) -> Option<MigrationName<'_>> {
    let caps = pattern().captures(name)?;
    let digits = caps.get(1)?.as_str();
    Some(MigrationName {
        sequence: digits.parse().ok()?,
        digits,
        description: caps.get(2)?.as_str(),
        has_extension: caps.get(3).is_some(),
    })
}

/// Returns the sequence number embedded in a migration filename.
#[must_use]
pub fn parse_sequence(name: &str) -> Option<u32> {
    parse_migration_name(name).map(|n| n.sequence)
}

/// Strips a trailing `.sql` extension.
#[must_use]
pub fn migration_stem(name: &str) -> &str {
    name.strip_suffix(".sql").unwrap_or(name)
}

/// Builds `NNNN_snake_description.sql`.
#[must_use]
pub fn migration_file_name(sequence: u32, description: &str) -> String {
    let description = description.to_snake_case();
    let description = if description.is_empty() {
        "migration".to_string()
    } else {
        description
    };
    format!("{sequence:0SEQUENCE_WIDTH$}_{description}.sql")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_conventional_names() {
        assert_eq!(parse_sequence("0001_init.sql"), Some(1));
        assert_eq!(parse_sequence("0042_add_users"), Some(42));
        assert_eq!(parse_sequence("12345_big.sql"), Some(12345));
    }

    #[test]
    fn test_non_conventional_names_are_none() {
        assert_eq!(parse_sequence("001_short.sql"), None);
        assert_eq!(parse_sequence("init.sql"), None);
        assert_eq!(parse_sequence("0001.sql"), None);
        assert_eq!(parse_sequence("journal.json"), None);
        assert_eq!(parse_sequence("99999999999_overflow.sql"), None);
    }

    #[test]
    fn test_renumber_keeps_width_and_suffix() {
        let name = parse_migration_name("0001_create_users.sql").unwrap();
        assert_eq!(name.description, "create_users");
        assert_eq!(name.with_sequence(3), "0003_create_users.sql");

        let wide = parse_migration_name("000010_x").unwrap();
        assert_eq!(wide.with_sequence(11), "000011_x");
    }

    #[test]
    fn test_migration_file_name() {
        assert_eq!(migration_file_name(7, "Add user emails"), "0007_add_user_emails.sql");
        assert_eq!(migration_file_name(12, ""), "0012_migration.sql");
        assert_eq!(migration_stem("0007_a.sql"), "0007_a");
        assert_eq!(migration_stem("0007_a"), "0007_a");
    }
}
