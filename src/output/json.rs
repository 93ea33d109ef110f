use crate::model::ScanResult;
use anyhow::Result;

/// Renders a result as a single JSON Lines record.
pub fn to_json_line(result: &ScanResult) -> Result<String> {
    Ok(serde_json::to_string(result)?)
}
