use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::VulnerabilityFinding;

/// Technology category (e.g. `web-servers`) to the names detected in it.
pub type Technologies = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub subdomain: String,
    pub internal_scripts: Vec<String>,
    pub external_scripts: Vec<String>,
    pub technologies: Technologies,
    pub vulnerabilities: Vec<VulnerabilityFinding>,
    /// Non-fatal error raised after scripts were extracted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanResult {
    pub fn new(subdomain: impl Into<String>) -> Self {
        Self {
            subdomain: subdomain.into(),
            ..Self::default()
        }
    }

    pub fn script_count(&self) -> usize {
        self.internal_scripts.len() + self.external_scripts.len()
    }

    /// Returns the finding recorded against `script_url`, if any.
    pub fn finding_for(&self, script_url: &str) -> Option<&VulnerabilityFinding> {
        self.vulnerabilities
            .iter()
            .find(|f| f.script_url == script_url)
    }

    pub fn has_findings(&self) -> bool {
        !self.vulnerabilities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finding_for() {
        let mut result = ScanResult::new("a.test");
        result.external_scripts.push("//cdn/jquery-1.9.0.js".to_string());
        result.vulnerabilities.push(VulnerabilityFinding {
            library: "jquery".to_string(),
            below: "1.9.0".to_string(),
            summary: "XSS".to_string(),
            script_url: "//cdn/jquery-1.9.0.js".to_string(),
        });

        assert_eq!(result.script_count(), 1);
        assert!(result.has_findings());
        assert_eq!(
            result.finding_for("//cdn/jquery-1.9.0.js").map(|f| f.library.as_str()),
            Some("jquery")
        );
        assert!(result.finding_for("/app.js").is_none());
    }

    #[test]
    fn test_error_is_omitted_from_json_when_absent() {
        let json = serde_json::to_string(&ScanResult::new("a.test")).unwrap();
        assert!(!json.contains("error"));
    }
}
