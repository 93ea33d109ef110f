//! Vulnerable JavaScript library signatures.
//!
//! The database is a retire.js style `jsrepository.json`: a map from library
//! name to an object with a `vulnerabilities` list, where each entry carries a
//! `below` version threshold and an `identifiers.summary` advisory.
//!
//! ```json
//! {
//!   "jquery": {
//!     "vulnerabilities": [
//!       { "below": "1.9.1", "identifiers": { "summary": "XSS" } }
//!     ]
//!   }
//! }
//! ```
//!
//! Library order is preserved exactly as it appears in the document, since
//! matching is first-match-wins over that order.

use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::{CacheRead, CachedFile};
use crate::error::LoadError;
use crate::model::{LibrarySignatures, VulnerabilitySignature};

pub const DEFAULT_DATABASE_URL: &str =
    "https://raw.githubusercontent.com/RetireJS/retire.js/master/repository/jsrepository.json";

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

const UNKNOWN_SUMMARY: &str = "Unknown vulnerability";

/// Where the database lives locally and where to download it from.
#[derive(Debug, Clone)]
pub struct DatabaseSource {
    pub cache: CachedFile,
    pub url: String,
    client: reqwest::Client,
}

impl DatabaseSource {
    pub fn new(cache: CachedFile, url: impl Into<String>) -> Self {
        Self {
            cache,
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn download(&self) -> Result<String, LoadError> {
        let fetch_error = |source| LoadError::Fetch {
            url: self.url.clone(),
            source,
        };

        let response = self
            .client
            .get(&self.url)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await
            .map_err(fetch_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(fetch_error)
    }
}

#[derive(Deserialize)]
struct RawLibrary {
    #[serde(default)]
    vulnerabilities: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct RawVulnerability {
    below: Option<String>,
    identifiers: Option<RawIdentifiers>,
}

#[derive(Deserialize)]
struct RawIdentifiers {
    summary: Option<String>,
    #[serde(rename = "CVE", default)]
    cve: Vec<String>,
}

impl RawVulnerability {
    fn into_signature(self) -> Option<VulnerabilitySignature> {
        let below = self.below.filter(|b| !b.is_empty())?;
        let summary = self
            .identifiers
            .and_then(|ids| ids.summary.or_else(|| ids.cve.into_iter().next()))
            .unwrap_or_else(|| UNKNOWN_SUMMARY.to_string());
        Some(VulnerabilitySignature { below, summary })
    }
}

/// Immutable in-memory signature index, shared read-only by all workers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VulnerabilityDatabase {
    libraries: Vec<LibrarySignatures>,
}

impl VulnerabilityDatabase {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_libraries(libraries: Vec<LibrarySignatures>) -> Self {
        Self { libraries }
    }

    /// Parses a `jsrepository.json` document.
    ///
    /// Libraries whose entry is not a well-formed object are skipped. Within a
    /// library, malformed vulnerabilities and those without a non-empty
    /// `below` threshold are skipped one by one.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Parse`] if the document is not a JSON object.
    pub fn parse(json: &str) -> Result<Self, LoadError> {
        let document: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;

        let mut libraries = Vec::new();
        for (library, entry) in document {
            let raw: RawLibrary = match serde_json::from_value(entry) {
                Ok(raw) => raw,
                Err(e) => {
                    debug!("Skipping malformed database entry {}: {}", library, e);
                    continue;
                }
            };

            let signatures: Vec<_> = raw
                .vulnerabilities
                .into_iter()
                .filter_map(|entry| match serde_json::from_value::<RawVulnerability>(entry) {
                    Ok(vulnerability) => vulnerability.into_signature(),
                    Err(e) => {
                        debug!("Skipping malformed vulnerability in {}: {}", library, e);
                        None
                    }
                })
                .collect();

            if !signatures.is_empty() {
                libraries.push(LibrarySignatures { library, signatures });
            }
        }

        Ok(Self { libraries })
    }

    /// Loads the database, downloading it when the local copy is missing or stale.
    ///
    /// A fresh cached copy is used as-is unless `refresh` is set. A download
    /// is cached only once it parses. When the download fails or is malformed
    /// but an older copy exists, the older copy is used.
    ///
    /// # Errors
    ///
    /// Returns an error when no copy can be obtained or the copy is malformed.
    pub async fn load(source: &DatabaseSource, refresh: bool) -> Result<Self, LoadError> {
        let previous = match source.cache.read() {
            CacheRead::Fresh(content) if !refresh => return Self::parse(&content),
            CacheRead::Fresh(content) | CacheRead::Stale(content) => Some(content),
            CacheRead::Missing => None,
        };

        let downloaded = source
            .download()
            .await
            .and_then(|body| Self::parse(&body).map(|db| (body, db)));

        match downloaded {
            Ok((body, db)) => {
                if let Err(e) = source.cache.write(&body) {
                    warn!(
                        "Could not cache vulnerability database at {}: {}",
                        source.cache.path().display(),
                        e
                    );
                }
                Ok(db)
            }
            Err(e) => match previous {
                Some(content) => {
                    warn!("{}; using previously cached copy", e);
                    Self::parse(&content)
                }
                None => Err(e),
            },
        }
    }

    /// Loads the database, falling back to an empty index on any failure.
    ///
    /// The scan then proceeds and simply reports no findings.
    pub async fn load_or_empty(source: &DatabaseSource, refresh: bool) -> Self {
        match Self::load(source, refresh).await {
            Ok(db) => {
                info!(
                    "Loaded {} signatures for {} libraries",
                    db.len(),
                    db.libraries.len()
                );
                db
            }
            Err(e) => {
                warn!("{}; continuing without vulnerability signatures", e);
                Self::empty()
            }
        }
    }

    /// Downloads the database unconditionally and stores it in the cache.
    ///
    /// The cached copy is replaced only when the download parses.
    ///
    /// # Errors
    ///
    /// Unlike [`load`](Self::load), a failure to write the cache is reported.
    pub async fn update(source: &DatabaseSource) -> Result<Self, LoadError> {
        let body = source.download().await?;
        let db = Self::parse(&body)?;
        source
            .cache
            .write(&body)
            .map_err(|source_err| LoadError::Persist {
                path: source.cache.path().to_path_buf(),
                source: source_err,
            })?;
        Ok(db)
    }

    pub fn libraries(&self) -> &[LibrarySignatures] {
        &self.libraries
    }

    /// Total number of signatures across all libraries.
    pub fn len(&self) -> usize {
        self.libraries.iter().map(|l| l.signatures.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}
