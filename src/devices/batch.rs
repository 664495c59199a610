//! Batch driver: one report row per input name, in input order

use super::backend::Backends;
use super::correlator::Correlator;
use super::deletion::Deleter;
use super::record::{BatchReport, ReportRow};
use indicatif::ProgressBar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    Lookup,
    Delete { dry_run: bool },
}

impl BatchMode {
    /// File name prefix for exported reports
    pub fn report_prefix(&self) -> &'static str {
        match self {
            BatchMode::Lookup => "Lookup",
            BatchMode::Delete { .. } => "Deletion",
        }
    }
}

pub struct BatchDriver<'a> {
    backends: Backends<'a>,
    mode: BatchMode,
}

impl<'a> BatchDriver<'a> {
    pub fn new(backends: Backends<'a>, mode: BatchMode) -> Self {
        Self { backends, mode }
    }

    /// Process every name sequentially. Blank names yield a skipped row.
    pub async fn run_batch(&self, names: &[String], progress: &ProgressBar) -> BatchReport {
        let mut report = BatchReport::new();

        for raw in names {
            let name = raw.trim();
            progress.set_message(name.to_string());

            if name.is_empty() {
                tracing::debug!("Skipping blank input row");
                report.push(ReportRow::skipped(raw));
                progress.inc(1);
                continue;
            }

            let (row, summary) = match self.mode {
                BatchMode::Lookup => {
                    let record = Correlator::new(self.backends).correlate(name).await;
                    (record.to_row(), record.summary_line())
                }
                BatchMode::Delete { dry_run } => {
                    let outcome = Deleter::new(self.backends, dry_run).delete(name).await;
                    let summary = outcome.summary_line();
                    (outcome.row, summary)
                }
            };

            progress.println(summary);
            report.push(row);
            progress.inc(1);
        }

        report
    }
}
