//! Human-readable per-subdomain report.
//!
//! The report is built as plain lines first; the console colors them and the
//! scan log stores them verbatim.

use colored::Colorize;

use crate::model::ScanResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    TechnologyHeading,
    Technology,
    ScriptHeading,
    Script,
    VulnerableScript,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    pub style: LineStyle,
    pub text: String,
}

impl ReportLine {
    fn new(style: LineStyle, text: String) -> Self {
        Self { style, text }
    }

    fn is_heading(&self) -> bool {
        matches!(
            self.style,
            LineStyle::TechnologyHeading | LineStyle::ScriptHeading
        )
    }

    /// Console rendering. Headings are preceded by a blank line.
    pub fn colored(&self) -> String {
        let text = self.text.as_str();
        let styled = match self.style {
            LineStyle::TechnologyHeading => text.magenta(),
            LineStyle::ScriptHeading => text.green(),
            LineStyle::Technology => text.cyan(),
            LineStyle::Script => text.blue(),
            LineStyle::VulnerableScript => text.red().bold(),
            LineStyle::Error => text.yellow(),
        };
        if self.is_heading() {
            format!("\n{}", styled)
        } else {
            styled.to_string()
        }
    }
}

/// Builds the report for one subdomain.
///
/// Sections with nothing in them are left out. A script with a finding gets
/// the advisory appended on the same line.
pub fn report_lines(result: &ScanResult) -> Vec<ReportLine> {
    let subdomain = &result.subdomain;
    let mut lines = Vec::new();

    if !result.technologies.is_empty() {
        lines.push(ReportLine::new(
            LineStyle::TechnologyHeading,
            format!("Technologies used by {}:", subdomain),
        ));
        for (tech, items) in &result.technologies {
            lines.push(ReportLine::new(
                LineStyle::Technology,
                format!("{}: {}", tech, items.join(", ")),
            ));
        }
    }

    if let Some(error) = &result.error {
        lines.push(ReportLine::new(LineStyle::Error, error.clone()));
    }

    let sections = [
        ("Internal", &result.internal_scripts),
        ("External", &result.external_scripts),
    ];
    for (label, scripts) in sections {
        if scripts.is_empty() {
            continue;
        }
        lines.push(ReportLine::new(
            LineStyle::ScriptHeading,
            format!("{} JavaScript files found in {}:", label, subdomain),
        ));
        for script in scripts {
            let line = match result.finding_for(script) {
                Some(finding) => ReportLine::new(
                    LineStyle::VulnerableScript,
                    format!(
                        "{} [VULNERABLE] {} below {}: {}",
                        script, finding.library, finding.below, finding.summary
                    ),
                ),
                None => ReportLine::new(LineStyle::Script, script.clone()),
            };
            lines.push(line);
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VulnerabilityFinding;

    fn sample() -> ScanResult {
        let mut result = ScanResult::new("a.test");
        result.internal_scripts = vec!["/app.js".to_string()];
        result.external_scripts = vec!["//cdn.example/jquery-1.9.0.min.js".to_string()];
        result
            .technologies
            .insert("web-servers".to_string(), vec!["nginx".to_string()]);
        result
            .technologies
            .insert("javascript-frameworks".to_string(), vec!["jQuery".to_string(), "React".to_string()]);
        result.vulnerabilities.push(VulnerabilityFinding {
            library: "jquery".to_string(),
            below: "1.9.0".to_string(),
            summary: "XSS".to_string(),
            script_url: "//cdn.example/jquery-1.9.0.min.js".to_string(),
        });
        result
    }

    #[test]
    fn test_report_lines() {
        let texts: Vec<_> = report_lines(&sample()).into_iter().map(|l| l.text).collect();

        assert_eq!(
            texts,
            vec![
                "Technologies used by a.test:",
                "javascript-frameworks: jQuery, React",
                "web-servers: nginx",
                "Internal JavaScript files found in a.test:",
                "/app.js",
                "External JavaScript files found in a.test:",
                "//cdn.example/jquery-1.9.0.min.js [VULNERABLE] jquery below 1.9.0: XSS",
            ]
        );
    }

    #[test]
    fn test_empty_sections_are_omitted() {
        let mut result = ScanResult::new("a.test");
        result.internal_scripts = vec!["/app.js".to_string()];

        let lines = report_lines(&result);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].style, LineStyle::ScriptHeading);
        assert!(lines[0].is_heading());
    }

    #[test]
    fn test_colored_heading_starts_with_blank_line() {
        colored::control::set_override(false);
        let lines = report_lines(&sample());
        assert_eq!(lines[0].colored(), "\nTechnologies used by a.test:");
        assert_eq!(lines[1].colored(), "javascript-frameworks: jQuery, React");
    }
}
