//! SHA-256 checksum utilities
//!
//! Used to tell genuinely conflicting relocation candidates apart from
//! byte-identical duplicates an extractor wrote to several places.

use sha2::{Digest, Sha256};

use crate::{Error, NormalizedPath, Result};

/// Prefix for all checksums produced by this module
const PREFIX: &str = "sha256:";

/// Compute the SHA-256 checksum of string content.
///
/// Returns a string in the canonical format `"sha256:<hex>"`.
pub fn compute_content_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{}{:x}", PREFIX, hasher.finalize())
}

/// Compute the SHA-256 checksum of a file's contents.
///
/// Returns a string in the canonical format `"sha256:<hex>"`.
pub fn compute_file_checksum(path: &NormalizedPath) -> Result<String> {
    let native = path.to_native();
    let content = std::fs::read(&native).map_err(|e| Error::io(&native, e))?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(format!("{}{:x}", PREFIX, hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_checksum_known_value() {
        let checksum = compute_content_checksum("hello world");
        assert_eq!(
            checksum,
            "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn file_checksum_matches_content_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.txt");
        std::fs::write(&path, "hello world").unwrap();

        let file_cs = compute_file_checksum(&NormalizedPath::new(&path)).unwrap();
        assert_eq!(file_cs, compute_content_checksum("hello world"));
    }
}
