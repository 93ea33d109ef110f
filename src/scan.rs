//! Per-subdomain pipeline and the batch orchestrator.
//!
//! Each subdomain goes through fetch, extract, classify and match. A
//! subdomain ends in exactly one [`Outcome`]:
//!
//! | Outcome | Reached when |
//! |---------|--------------|
//! | [`Outcome::Unreachable`] | the fetch failed (after retries, if transient) |
//! | [`Outcome::NoScripts`] | the page has no `<script src>` elements |
//! | [`Outcome::Reported`] | scripts were found; classification and matching ran |
//! | [`Outcome::Crashed`] | the pipeline task panicked (isolated runs only) |
//!
//! Only `Reported` outcomes are meant to be shown to the user.
//!
//! # Example
//!
//! ```no_run
//! use scriptscout::fetch::{Fetcher, FetcherConfig};
//! use scriptscout::fingerprint::PageFingerprinter;
//! use scriptscout::scan::ScanOrchestrator;
//! use scriptscout::VulnerabilityDatabase;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let orchestrator = ScanOrchestrator::new(
//!         Arc::new(Fetcher::new(FetcherConfig::default())?),
//!         Arc::new(VulnerabilityDatabase::empty()),
//!         Arc::new(PageFingerprinter),
//!     );
//!
//!     let results = orchestrator.run(vec!["shop.example.com".to_string()]).await;
//!     for result in results {
//!         println!("{}: {} scripts", result.subdomain, result.script_count());
//!     }
//!     Ok(())
//! }
//! ```

use futures::stream::{self, Stream, StreamExt};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::classify::classify_scripts;
use crate::database::VulnerabilityDatabase;
use crate::error::{FetchError, InputError};
use crate::extract::extract_scripts;
use crate::fetch::Fetcher;
use crate::fingerprint::Fingerprinter;
use crate::model::ScanResult;
use crate::output::ScanLog;

pub const DEFAULT_WORKERS: usize = 10;

#[derive(Debug)]
pub enum Outcome {
    Reported(ScanResult),
    NoScripts { subdomain: String },
    Unreachable { subdomain: String, error: FetchError },
    Crashed { subdomain: String, message: String },
}

impl Outcome {
    pub fn subdomain(&self) -> &str {
        match self {
            Outcome::Reported(result) => &result.subdomain,
            Outcome::NoScripts { subdomain }
            | Outcome::Unreachable { subdomain, .. }
            | Outcome::Crashed { subdomain, .. } => subdomain,
        }
    }

    pub fn into_result(self) -> Option<ScanResult> {
        match self {
            Outcome::Reported(result) => Some(result),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct ScanOrchestrator {
    fetcher: Arc<Fetcher>,
    database: Arc<VulnerabilityDatabase>,
    fingerprinter: Arc<dyn Fingerprinter>,
    workers: usize,
    log: Option<ScanLog>,
}

impl ScanOrchestrator {
    pub fn new(
        fetcher: Arc<Fetcher>,
        database: Arc<VulnerabilityDatabase>,
        fingerprinter: Arc<dyn Fingerprinter>,
    ) -> Self {
        Self {
            fetcher,
            database,
            fingerprinter,
            workers: DEFAULT_WORKERS,
            log: None,
        }
    }

    /// Sets the number of subdomains scanned concurrently (at least one).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Records fingerprinting and pipeline errors in `log`.
    pub fn with_log(mut self, log: ScanLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    fn record(&self, message: &str) {
        if let Some(log) = &self.log {
            log.record(message);
        }
    }

    /// Runs the whole pipeline for one subdomain on the current task.
    ///
    /// Panics are not caught here; use [`scan_isolated`](Self::scan_isolated)
    /// when they must be.
    pub async fn scan_subdomain(&self, subdomain: &str) -> Outcome {
        let page = match self.fetcher.fetch(subdomain).await {
            Ok(page) => page,
            Err(error) => {
                debug!("Skipping {}: {}", subdomain, error);
                return Outcome::Unreachable {
                    subdomain: subdomain.to_string(),
                    error,
                };
            }
        };

        let scripts = extract_scripts(&page.body);
        if scripts.is_empty() {
            debug!("No scripts found on {}", subdomain);
            return Outcome::NoScripts {
                subdomain: subdomain.to_string(),
            };
        }

        let mut result = ScanResult::new(subdomain);

        debug!(
            "Fingerprinting {} with the {} fingerprinter",
            subdomain,
            self.fingerprinter.name()
        );
        match self.fingerprinter.fingerprint(&page).await {
            Ok(technologies) => result.technologies = technologies,
            Err(e) => {
                let message = format!("Error fetching technologies for {}: {}", subdomain, e);
                warn!("{} ({} fingerprinter)", message, self.fingerprinter.name());
                self.record(&message);
                result.error = Some(message);
            }
        }

        result.vulnerabilities = self.database.match_all(&scripts);
        let (internal, external) = classify_scripts(&scripts, subdomain);
        result.internal_scripts = internal;
        result.external_scripts = external;

        Outcome::Reported(result)
    }

    /// Runs the pipeline for one subdomain in its own task.
    ///
    /// A panic is confined to that task and surfaces as [`Outcome::Crashed`].
    pub async fn scan_isolated(&self, subdomain: String) -> Outcome {
        let task = {
            let this = self.clone();
            let subdomain = subdomain.clone();
            tokio::spawn(async move { this.scan_subdomain(&subdomain).await })
        };

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = format!("Error processing {}: {}", subdomain, e);
                error!("{}", message);
                self.record(&message);
                Outcome::Crashed {
                    subdomain,
                    message: e.to_string(),
                }
            }
        }
    }

    /// Scans every subdomain with at most `workers` pipelines in flight.
    ///
    /// Outcomes are yielded in completion order. Each pipeline goes through
    /// [`scan_isolated`](Self::scan_isolated).
    pub fn scan_stream<I>(&self, subdomains: I) -> impl Stream<Item = Outcome>
    where
        I: IntoIterator<Item = String>,
    {
        let this = self.clone();

        stream::iter(subdomains)
            .map(move |subdomain| {
                let this = this.clone();
                async move { this.scan_isolated(subdomain).await }
            })
            .buffer_unordered(self.workers)
    }

    /// Scans every subdomain and returns the reported results in completion order.
    pub async fn run<I>(&self, subdomains: I) -> Vec<ScanResult>
    where
        I: IntoIterator<Item = String>,
    {
        self.scan_stream(subdomains)
            .filter_map(|outcome| async move { outcome.into_result() })
            .collect()
            .await
    }
}

/// Splits newline-delimited input into subdomains.
///
/// Lines are trimmed; blank lines and `#` comments are skipped.
pub fn parse_subdomains(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Reads the subdomain list at `path`.
///
/// # Errors
///
/// Returns [`InputError::NotFound`] if the file does not exist and
/// [`InputError::Read`] for any other I/O failure.
pub fn read_subdomains(path: &Path) -> Result<Vec<String>, InputError> {
    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            InputError::NotFound(path.to_path_buf())
        } else {
            InputError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    Ok(parse_subdomains(&content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_subdomains() {
        let input = "a.test\n\n  b.test  \n# staging hosts\n\t\nc.test\r\n";
        assert_eq!(parse_subdomains(input), vec!["a.test", "b.test", "c.test"]);
    }

    #[test]
    fn test_parse_only_blank_lines() {
        assert!(parse_subdomains("\n   \n\t\n").is_empty());
        assert!(parse_subdomains("").is_empty());
    }

    #[test]
    fn test_read_subdomains_not_found() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("subdomains.txt");

        assert!(matches!(
            read_subdomains(&missing),
            Err(InputError::NotFound(path)) if path == missing
        ));
    }

    #[test]
    fn test_read_subdomains() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("subdomains.txt");
        std::fs::write(&path, "a.test\nb.test\n").unwrap();

        assert_eq!(read_subdomains(&path).unwrap(), vec!["a.test", "b.test"]);
    }

    #[test]
    fn test_outcome_subdomain() {
        let outcome = Outcome::NoScripts {
            subdomain: "a.test".to_string(),
        };
        assert_eq!(outcome.subdomain(), "a.test");
        assert!(outcome.into_result().is_none());

        let outcome = Outcome::Reported(ScanResult::new("b.test"));
        assert_eq!(outcome.subdomain(), "b.test");
        assert!(outcome.into_result().is_some());
    }
}
