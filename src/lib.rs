pub mod cache;
pub mod classify;
pub mod config;
pub mod database;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod fingerprint;
pub mod matcher;
pub mod model;
pub mod output;
pub mod scan;

pub use config::Config;
pub use database::{DatabaseSource, VulnerabilityDatabase};
pub use error::{FailureKind, FetchError, InputError, LoadError};
pub use model::{ScanResult, Technologies, VulnerabilityFinding, VulnerabilitySignature};
pub use scan::{Outcome, ScanOrchestrator};
