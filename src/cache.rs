//! File-based caching for downloaded data.
//!
//! The vulnerability database is downloaded once and kept on disk. A
//! [`CachedFile`] knows where that copy lives and how long it stays fresh;
//! expired copies are still readable so a failed refresh can fall back to them.
//!
//! # Cache Location
//!
//! The cache is stored in platform-specific directories:
//! - Linux: `~/.cache/scriptscout/`
//! - macOS: `~/Library/Caches/scriptscout/`
//! - Windows: `%LOCALAPPDATA%\scriptscout\`
//!
//! # Example
//!
//! ```no_run
//! use scriptscout::cache::{CacheRead, CachedFile};
//! use std::time::Duration;
//!
//! let cache = CachedFile::new("/tmp/scriptscout/db.json", Some(Duration::from_secs(3600)));
//! cache.write("{}").unwrap();
//!
//! assert!(matches!(cache.read(), CacheRead::Fresh(_)));
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// File name of the cached vulnerability database.
pub const DATABASE_FILE: &str = "jsrepository.json";

/// Returns the cache directory for scriptscout.
///
/// Falls back to `/tmp/scriptscout/` if no cache directory can be determined.
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("scriptscout")
}

/// Default location of the cached vulnerability database.
pub fn default_database_path() -> PathBuf {
    cache_dir().join(DATABASE_FILE)
}

/// Result of reading a [`CachedFile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheRead {
    /// Present and within its TTL.
    Fresh(String),
    /// Present but older than its TTL.
    Stale(String),
    /// Absent or unreadable.
    Missing,
}

/// A single cached file with an optional TTL.
#[derive(Debug, Clone)]
pub struct CachedFile {
    path: PathBuf,
    ttl: Option<Duration>,
}

impl CachedFile {
    /// Creates a handle for `path`. A `ttl` of `None` never expires.
    pub fn new(path: impl Into<PathBuf>, ttl: Option<Duration>) -> Self {
        Self {
            path: path.into(),
            ttl,
        }
    }

    /// Creates a handle whose TTL is given in hours, where `0` never expires.
    pub fn with_ttl_hours(path: impl Into<PathBuf>, hours: u64) -> Self {
        let ttl = (hours > 0).then(|| Duration::from_secs(hours * 3600));
        Self::new(path, ttl)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_expired(&self) -> bool {
        let Some(ttl) = self.ttl else {
            return false;
        };

        fs::metadata(&self.path)
            .and_then(|metadata| metadata.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .map(|elapsed| elapsed > ttl)
            .unwrap_or(false)
    }

    /// Reads the cached contents, reporting whether they are still fresh.
    pub fn read(&self) -> CacheRead {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return CacheRead::Missing,
        };

        if self.is_expired() {
            CacheRead::Stale(content)
        } else {
            CacheRead::Fresh(content)
        }
    }

    /// Writes `contents`, creating the parent directory if needed.
    pub fn write(&self, contents: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, contents)
    }

    /// Removes the cached file. Returns `false` if there was nothing to remove.
    pub fn remove(&self) -> io::Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}
