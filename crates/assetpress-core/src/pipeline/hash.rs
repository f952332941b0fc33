//! Content hashing for the optimization manifest.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Computes content digests used as manifest keys.
///
/// Digests are lowercase hex SHA-256, so the same bytes produce the same key
/// on every machine that shares the manifest.
pub struct Hasher;

impl Hasher {
    /// Generate a SHA-256 hash of file contents.
    ///
    /// Uses streaming to handle large files efficiently without loading
    /// the entire file into memory.
    pub fn content_hash(path: &Path) -> std::io::Result<String> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut hasher = Sha256::new();

        // Use 64KB buffer for efficient reading
        let mut buffer = [0u8; 65536];
        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(hex::encode(hasher.finalize()))
    }

    /// Generate a SHA-256 hash from an in-memory byte buffer.
    pub fn content_hash_from_bytes(data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }

    /// Hash a file on the blocking thread pool.
    pub async fn content_hash_async(path: PathBuf) -> std::io::Result<String> {
        tokio::task::spawn_blocking(move || Self::content_hash(&path))
            .await
            .map_err(|e| std::io::Error::other(format!("Hash task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icon.png");
        std::fs::write(&path, b"not really a png").unwrap();

        let first = Hasher::content_hash(&path).unwrap();
        let second = Hasher::content_hash(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_content_hash_matches_bytes_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("splash.jpg");
        // Larger than one read buffer so the streaming loop runs more than once
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        assert_eq!(
            Hasher::content_hash(&path).unwrap(),
            Hasher::content_hash_from_bytes(&data)
        );
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            Hasher::content_hash_from_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_identical_bytes_share_digest() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("nested-b.png");
        std::fs::write(&a, b"same bytes").unwrap();
        std::fs::write(&b, b"same bytes").unwrap();

        assert_eq!(
            Hasher::content_hash(&a).unwrap(),
            Hasher::content_hash(&b).unwrap()
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Hasher::content_hash(&dir.path().join("gone.png")).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_content_hash_async() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        std::fs::write(&path, b"abc").unwrap();

        let digest = Hasher::content_hash_async(path).await.unwrap();
        assert_eq!(digest, Hasher::content_hash_from_bytes(b"abc"));
    }
}
