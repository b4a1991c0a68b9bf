//! On-disk tier of the embedding cache.
//!
//! One file per vector at `<root>/EmbeddingCache/{sha256hex}.emb`, body is
//! the raw little-endian IEEE-754 bytes of the vector with no header.
//! Writes go through a temp file and an atomic rename, so concurrent
//! readers either see a complete file or none at all.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CACHE_DIR_NAME: &str = "EmbeddingCache";
const ENTRY_EXTENSION: &str = "emb";

/// TTL-bounded directory of embedding vectors.
pub(crate) struct DiskCache {
    dir: PathBuf,
    ttl: Duration,
}

impl std::fmt::Debug for DiskCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskCache").field("dir", &self.dir).finish()
    }
}

impl DiskCache {
    /// Opens (creating if needed) the cache directory under `root`.
    pub(crate) fn open(root: &Path, ttl: Duration) -> io::Result<Self> {
        let dir = root.join(CACHE_DIR_NAME);
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, ttl })
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{ENTRY_EXTENSION}"))
    }

    /// Reads a fresh entry. Stale files are deleted on access; unreadable
    /// or truncated files count as absent.
    pub(crate) fn read(&self, key: &str) -> Option<Vec<f32>> {
        let path = self.entry_path(key);
        let metadata = fs::metadata(&path).ok()?;

        let age = metadata.modified().ok()?.elapsed().unwrap_or_default();
        if age > self.ttl {
            let _ = fs::remove_file(&path);
            return None;
        }

        let bytes = fs::read(&path).ok()?;
        if bytes.is_empty() || bytes.len() % 4 != 0 {
            return None;
        }

        Some(
            bytes
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        )
    }

    /// Writes an entry atomically (temp file, then rename).
    pub(crate) fn write(&self, key: &str, vector: &[f32]) -> io::Result<()> {
        let mut bytes = Vec::with_capacity(vector.len() * 4);
        for value in vector {
            bytes.extend_from_slice(&value.to_le_bytes());
        }

        let tmp = self.dir.join(format!("{key}.{ENTRY_EXTENSION}.tmp"));
        fs::write(&tmp, &bytes)?;
        match fs::rename(&tmp, self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(err) => {
                let _ = fs::remove_file(&tmp);
                Err(err)
            }
        }
    }

    /// Removes entries older than `older_than`, plus any abandoned temp
    /// files. Returns how many files were deleted.
    pub(crate) fn cleanup(&self, older_than: Duration) -> usize {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return 0;
        };

        let mut removed = 0usize;
        for entry in entries.flatten() {
            let path = entry.path();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            let is_entry = name.ends_with(&format!(".{ENTRY_EXTENSION}"));
            let is_tmp = name.ends_with(".tmp");
            if !is_entry && !is_tmp {
                continue;
            }

            let age = entry
                .metadata()
                .and_then(|m| m.modified())
                .map(|m| m.elapsed().unwrap_or_default())
                .unwrap_or_default();

            if (is_entry && age > older_than) || (is_tmp && age > older_than) {
                if fs::remove_file(&path).is_ok() {
                    removed += 1;
                }
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const LONG_TTL: Duration = Duration::from_secs(3600);

    #[test]
    fn roundtrip_little_endian_body() {
        let root = tempdir().unwrap();
        let cache = DiskCache::open(root.path(), LONG_TTL).unwrap();

        let vector = vec![0.5_f32, -1.25, 3.0];
        cache.write("abc123", &vector).unwrap();

        assert_eq!(cache.read("abc123"), Some(vector.clone()));

        // Raw file body is exactly the little-endian float bytes.
        let raw = fs::read(root.path().join("EmbeddingCache/abc123.emb")).unwrap();
        assert_eq!(raw.len(), 12);
        assert_eq!(&raw[0..4], &0.5_f32.to_le_bytes());
    }

    #[test]
    fn missing_entry_reads_none() {
        let root = tempdir().unwrap();
        let cache = DiskCache::open(root.path(), LONG_TTL).unwrap();
        assert!(cache.read("nothing").is_none());
    }

    #[test]
    fn truncated_entry_reads_none() {
        let root = tempdir().unwrap();
        let cache = DiskCache::open(root.path(), LONG_TTL).unwrap();
        fs::write(root.path().join("EmbeddingCache/bad.emb"), [1u8, 2, 3]).unwrap();
        assert!(cache.read("bad").is_none());
    }

    #[test]
    fn stale_entry_is_dropped_on_read() {
        let root = tempdir().unwrap();
        let cache = DiskCache::open(root.path(), Duration::ZERO).unwrap();
        cache.write("key", &[1.0]).unwrap();
        std::thread::sleep(Duration::from_millis(5));

        assert!(cache.read("key").is_none());
        assert!(!root.path().join("EmbeddingCache/key.emb").exists());
    }

    #[test]
    fn cleanup_sweeps_old_files() {
        let root = tempdir().unwrap();
        let cache = DiskCache::open(root.path(), LONG_TTL).unwrap();
        cache.write("old", &[1.0]).unwrap();
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(cache.cleanup(Duration::ZERO), 1);
        assert_eq!(cache.cleanup(Duration::ZERO), 0);
    }

    #[test]
    fn cleanup_keeps_fresh_files() {
        let root = tempdir().unwrap();
        let cache = DiskCache::open(root.path(), LONG_TTL).unwrap();
        cache.write("fresh", &[1.0]).unwrap();

        assert_eq!(cache.cleanup(Duration::from_secs(3600)), 0);
        assert!(cache.read("fresh").is_some());
    }
}
