//! Migration checksums.

use sha2::{Digest, Sha256};

/// Returns the lowercase hex SHA-256 digest of the raw SQL text.
///
/// The text is hashed byte-for-byte: no whitespace or line-ending
/// normalization happens, so any edit to an applied file is drift.
#[must_use]
pub fn checksum(sql: &str) -> String {
    format!("{:x}", Sha256::digest(sql.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_deterministic() {
        let sql = "CREATE TABLE \"users\" (\"id\" uuid NOT NULL);";
        assert_eq!(checksum(sql), checksum(sql));
        assert_eq!(checksum(sql).len(), 64);
    }

    #[test]
    fn test_checksum_known_value() {
        assert_eq!(
            checksum(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_checksum_sees_every_byte() {
        assert_ne!(checksum("SELECT 1;"), checksum("SELECT 1;\n"));
        assert_ne!(checksum("select 1"), checksum("SELECT 1"));
    }
}
