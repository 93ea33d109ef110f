use tabled::{settings::Style, Table, Tabled};

use crate::scan::Outcome;

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Outcome")]
    outcome: &'static str,
    #[tabled(rename = "Subdomains")]
    count: usize,
}

/// Running tally of a batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    pub reported: usize,
    pub no_scripts: usize,
    pub unreachable: usize,
    pub crashed: usize,
    pub findings: usize,
}

impl ScanSummary {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Reported(result) => {
                self.reported += 1;
                self.findings += result.vulnerabilities.len();
            }
            Outcome::NoScripts { .. } => self.no_scripts += 1,
            Outcome::Unreachable { .. } => self.unreachable += 1,
            Outcome::Crashed { .. } => self.crashed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.reported + self.no_scripts + self.unreachable + self.crashed
    }

    pub fn render(&self) -> String {
        let rows = vec![
            SummaryRow {
                outcome: "Reported",
                count: self.reported,
            },
            SummaryRow {
                outcome: "No scripts",
                count: self.no_scripts,
            },
            SummaryRow {
                outcome: "Unreachable",
                count: self.unreachable,
            },
            SummaryRow {
                outcome: "Failed",
                count: self.crashed,
            },
        ];

        let table = Table::new(rows).with(Style::rounded()).to_string();
        format!(
            "Scanned {} subdomains, {} vulnerable scripts:\n{}",
            self.total(),
            self.findings,
            table
        )
    }
}
