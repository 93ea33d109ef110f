use serde::{Deserialize, Serialize};

/// One advisory for a library: versions containing `below` are flagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnerabilitySignature {
    pub below: String,
    pub summary: String,
}

/// All signatures known for a single library, in database order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarySignatures {
    pub library: String,
    pub signatures: Vec<VulnerabilitySignature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnerabilityFinding {
    pub library: String,
    pub below: String,
    pub summary: String,
    pub script_url: String,
}

impl VulnerabilityFinding {
    pub fn new(library: &str, signature: &VulnerabilitySignature, script_url: &str) -> Self {
        Self {
            library: library.to_string(),
            below: signature.below.clone(),
            summary: signature.summary.clone(),
            script_url: script_url.to_string(),
        }
    }
}
