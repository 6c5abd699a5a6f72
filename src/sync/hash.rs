//! Content hashing for sync operations.
//!
//! Write-back compares the serialized form of a note with the file on disk
//! by SHA256 digest. Lines are hashed exactly as they would be written
//! (each followed by `\n`), so equal digests mean a write would be a no-op.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

/// Block size for streaming file hashes.
const BLOCK_SIZE: usize = 64 * 1024;

/// Compute a SHA256 hash of lines as they would appear on disk.
#[must_use]
pub fn content_hash<S: AsRef<str>>(lines: &[S]) -> String {
    let mut hasher = Sha256::new();
    for line in lines {
        hasher.update(line.as_ref().as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

/// Compute a SHA256 hash of a file's bytes.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn file_hash(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; BLOCK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_content_hash_deterministic() {
        let hash1 = content_hash(&["a", "b"]);
        let hash2 = content_hash(&["a", "b"]);

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64); // SHA256 produces 64 hex chars
    }

    #[test]
    fn test_line_boundaries_matter() {
        assert_ne!(content_hash(&["ab"]), content_hash(&["a", "b"]));
    }

    #[test]
    fn test_content_matches_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("x.note");
        fs::write(&path, "# T\nid: 1\n\nbody\n").unwrap();

        let lines = ["# T", "id: 1", "", "body"];
        assert_eq!(content_hash(&lines), file_hash(&path).unwrap());
        assert_ne!(content_hash(&["# T"]), file_hash(&path).unwrap());
    }
}
