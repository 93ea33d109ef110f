//! Append-only scan log.
//!
//! Several workers report at once, so every line is formatted up front and
//! written with a single `write_all` while holding the file lock.

use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// A shared handle to the log file. Cloning shares the same file.
#[derive(Debug, Clone)]
pub struct ScanLog {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl ScanLog {
    /// Opens `path` for appending, creating it if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `YYYY-MM-DD HH:MM:SS - message`.
    pub fn write_line(&self, message: &str) -> io::Result<()> {
        let line = format!(
            "{} - {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            message
        );
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.write_all(line.as_bytes())
    }

    /// Appends each message as its own line under one lock, keeping a block together.
    pub fn write_lines<'a, I>(&self, messages: I) -> io::Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let block: String = messages
            .into_iter()
            .map(|message| format!("{} - {}\n", timestamp, message))
            .collect();
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.write_all(block.as_bytes())
    }

    /// Like [`write_line`](Self::write_line), but only logs a failure with `tracing`.
    pub fn record(&self, message: &str) {
        if let Err(e) = self.write_line(message) {
            tracing::warn!("Failed to write to log {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn is_timestamped(line: &str) -> bool {
        // "2024-01-31 12:34:56 - ..."
        line.len() > 22
            && line.as_bytes()[4] == b'-'
            && line.as_bytes()[10] == b' '
            && &line[19..22] == " - "
    }

    #[test]
    fn test_appends_timestamped_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scan.log");
        std::fs::write(&path, "existing\n").unwrap();

        let log = ScanLog::open(&path).unwrap();
        log.write_line("first").unwrap();
        log.write_lines(["second", "third"]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "existing");
        assert!(is_timestamped(lines[1]) && lines[1].ends_with(" - first"));
        assert!(lines[2].ends_with(" - second"));
        assert!(lines[3].ends_with(" - third"));
    }

    #[test]
    fn test_concurrent_writers_do_not_interleave() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scan.log");
        let log = ScanLog::open(&path).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let log = log.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let message = format!("worker-{worker}-line-{i}-{}", "x".repeat(200));
                        log.write_line(&message).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 400);
        for line in lines {
            assert!(is_timestamped(line), "corrupted line: {line}");
            assert!(line.ends_with(&"x".repeat(200)), "corrupted line: {line}");
        }
    }
}
