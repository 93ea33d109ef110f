//! Core data types for scan results and vulnerability signatures.
//!
//! This module contains the fundamental types used throughout scriptscout:
//!
//! - [`ScanResult`] - Everything learned about one subdomain
//! - [`Technologies`] - Fingerprinted technology categories
//! - [`LibrarySignatures`] / [`VulnerabilitySignature`] - Database entries
//! - [`VulnerabilityFinding`] - A signature matched against a script URL
//!
//! # Example
//!
//! ```
//! use scriptscout::ScanResult;
//!
//! let result = ScanResult::new("shop.example.com");
//! assert!(result.internal_scripts.is_empty());
//! assert!(result.vulnerabilities.is_empty());
//! ```

mod result;
mod vulnerability;

pub use result::*;
pub use vulnerability::*;
