mod json;
pub mod log;
mod report;
mod summary;

pub use json::to_json_line;
pub use log::ScanLog;
pub use report::{report_lines, LineStyle, ReportLine};
pub use summary::ScanSummary;

use crate::model::ScanResult;
use anyhow::Result;
use indicatif::ProgressBar;

/// Output format for scan results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Colorized per-subdomain report
    Text,
    /// One JSON object per line for programmatic use
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" | "jsonl" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use 'text' or 'json'", s)),
        }
    }
}

/// Writes reported results to the console and mirrors them to the scan log.
pub struct Reporter {
    format: OutputFormat,
    progress: Option<ProgressBar>,
    log: Option<ScanLog>,
}

impl Reporter {
    pub fn new(format: OutputFormat, log: Option<ScanLog>) -> Self {
        Self {
            format,
            progress: None,
            log,
        }
    }

    /// Routes console output through `progress` so the bar is redrawn below it.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    fn emit(&self, line: &str) {
        match &self.progress {
            Some(pb) => pb.println(line),
            None => println!("{}", line),
        }
    }

    pub fn report(&self, result: &ScanResult) -> Result<()> {
        let lines = report_lines(result);

        match self.format {
            OutputFormat::Text => {
                for line in &lines {
                    self.emit(&line.colored());
                }
            }
            OutputFormat::Json => self.emit(&to_json_line(result)?),
        }

        // Fingerprint errors were already logged by the pipeline.
        if let Some(log) = &self.log {
            log.write_lines(
                lines
                    .iter()
                    .filter(|l| l.style != LineStyle::Error)
                    .map(|l| l.text.as_str()),
            )?;
        }

        Ok(())
    }
}
