//! Filesystem abstraction layer for testability
//!
//! The routing table cache only needs three operations: read the cached
//! table, replace it atomically, and read its modification time. Hiding
//! them behind a trait lets the freshness policy be tested without touching
//! the real filesystem. Uses mockall for automatic mock generation in test
//! builds.

use std::io::{self, Write};
use std::path::Path;
use std::time::SystemTime;

use tempfile::NamedTempFile;

#[cfg(test)]
use mockall::automock;

/// Trait abstracting the filesystem operations used by the table cache.
///
/// # Example (testing)
/// ```ignore
/// use nft_prefix_import::fs_abstraction::MockFileSystem;
///
/// let mut mock_fs = MockFileSystem::new();
/// mock_fs.expect_read_to_string()
///     .returning(|_| Ok("192.0.2.0/24 64500\n".to_string()));
/// ```
#[cfg_attr(test, automock)]
pub trait FileSystem: Send + Sync {
    /// Read file contents as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Replace the file contents atomically (temp file + rename).
    ///
    /// Readers never observe a partially written file.
    fn write_atomic(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Last modification time of the file.
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;
}

/// Real filesystem implementation using std::fs.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        // A bare file name has an empty parent, which means the current directory
        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut temp_file = NamedTempFile::new_in(parent)?;
        temp_file.write_all(contents)?;
        temp_file.as_file().sync_all()?;
        temp_file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        std::fs::metadata(path)?.modified()
    }
}
