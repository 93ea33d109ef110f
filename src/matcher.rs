//! Signature matching against script URLs.
//!
//! A signature matches when its `below` threshold appears literally inside
//! the URL. There is no version parsing: `jquery-1.9.1.min.js` matches a
//! `1.9.1` threshold, and so would any unrelated path containing `1.9.1`.
//! The first match in database order wins.

use crate::database::VulnerabilityDatabase;
use crate::model::VulnerabilityFinding;

impl VulnerabilityDatabase {
    /// Returns the first signature whose threshold is a substring of `url`.
    ///
    /// Libraries are tried in database order, and within a library its
    /// signatures are tried in order.
    ///
    /// # Example
    ///
    /// ```
    /// use scriptscout::VulnerabilityDatabase;
    ///
    /// let db = VulnerabilityDatabase::parse(
    ///     r#"{"jquery": {"vulnerabilities": [{"below": "1.9.1", "identifiers": {"summary": "XSS"}}]}}"#,
    /// ).unwrap();
    ///
    /// let finding = db.match_url("//cdn.example/jquery-1.9.1.min.js").unwrap();
    /// assert_eq!(finding.library, "jquery");
    /// assert!(db.match_url("/app.js").is_none());
    /// ```
    pub fn match_url(&self, url: &str) -> Option<VulnerabilityFinding> {
        self.libraries().iter().find_map(|library| {
            library
                .signatures
                .iter()
                .find(|signature| url.contains(signature.below.as_str()))
                .map(|signature| VulnerabilityFinding::new(&library.library, signature, url))
        })
    }

    /// Matches every URL, keeping findings in URL order.
    pub fn match_all<'a, I>(&self, urls: I) -> Vec<VulnerabilityFinding>
    where
        I: IntoIterator<Item = &'a String>,
    {
        urls.into_iter()
            .filter_map(|url| self.match_url(url))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{LibrarySignatures, VulnerabilitySignature};
    use crate::VulnerabilityDatabase;

    fn signature(below: &str, summary: &str) -> VulnerabilitySignature {
        VulnerabilitySignature {
            below: below.to_string(),
            summary: summary.to_string(),
        }
    }

    fn database() -> VulnerabilityDatabase {
        VulnerabilityDatabase::from_libraries(vec![
            LibrarySignatures {
                library: "jquery".to_string(),
                signatures: vec![signature("1.9.1", "XSS"), signature("1.9", "older XSS")],
            },
            LibrarySignatures {
                library: "lodash".to_string(),
                signatures: vec![signature("4.17.21", "prototype pollution")],
            },
            LibrarySignatures {
                library: "bootstrap".to_string(),
                signatures: vec![signature("1.9", "unrelated")],
            },
        ])
    }

    #[test]
    fn test_first_signature_wins_within_library() {
        let finding = database()
            .match_url("https://cdn.example/jquery-1.9.1.min.js")
            .unwrap();

        assert_eq!(finding.library, "jquery");
        assert_eq!(finding.below, "1.9.1");
        assert_eq!(finding.summary, "XSS");
        assert_eq!(finding.script_url, "https://cdn.example/jquery-1.9.1.min.js");
    }

    #[test]
    fn test_first_library_wins_even_if_less_specific() {
        // "1.9" is also a bootstrap threshold, but jquery comes first.
        let finding = database().match_url("/static/bootstrap-1.9.js").unwrap();
        assert_eq!(finding.library, "jquery");
        assert_eq!(finding.below, "1.9");
    }

    #[test]
    fn test_no_match() {
        assert!(database().match_url("/static/app.js").is_none());
        assert!(crate::VulnerabilityDatabase::empty()
            .match_url("/jquery-1.9.1.js")
            .is_none());
    }

    #[test]
    fn test_match_all_keeps_url_order() {
        let urls = vec![
            "/lodash-4.17.21.js".to_string(),
            "/app.js".to_string(),
            "/jquery-1.9.1.js".to_string(),
        ];
        let findings = database().match_all(&urls);

        let libraries: Vec<_> = findings.iter().map(|f| f.library.as_str()).collect();
        assert_eq!(libraries, vec!["lodash", "jquery"]);
    }

    #[test]
    fn test_threshold_is_not_a_version_comparison() {
        // 1.9.0 is older than 1.9.1 but does not contain it.
        let finding = database().match_url("//cdn.example/jquery-1.9.0.min.js").unwrap();
        assert_eq!(finding.below, "1.9");

        let strict = VulnerabilityDatabase::from_libraries(vec![LibrarySignatures {
            library: "jquery".to_string(),
            signatures: vec![signature("1.9.1", "XSS")],
        }]);
        assert!(strict.match_url("//cdn.example/jquery-1.9.0.min.js").is_none());
    }
}
