//! Snapshot run reporting.

use std::fmt;

use crate::domain::ResourceId;
use crate::util::bytes::format_bytes;

/// Outcome of exporting one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written { size_bytes: u64 },
    Failed { error: String },
}

/// One report line, in registry order.
#[derive(Debug, Clone)]
pub struct ResourceReport {
    pub id: ResourceId,
    pub outcome: ExportOutcome,
}

/// Human-readable result of one snapshot run.
///
/// A failed resource never aborts the run; the report carries every
/// resource's outcome so an operator can tell "tool broken" (nothing
/// written) apart from "one backend endpoint flaky".
#[derive(Debug, Clone)]
pub struct SnapshotReport {
    reports: Vec<ResourceReport>,
}

impl SnapshotReport {
    pub fn new(reports: Vec<ResourceReport>) -> Self {
        Self { reports }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceReport> {
        self.reports.iter()
    }

    pub fn written_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|report| matches!(report.outcome, ExportOutcome::Written { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.reports.len() - self.written_count()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// True when a non-empty run wrote nothing at all, the only case the
    /// process exits non-zero.
    pub fn all_failed(&self) -> bool {
        !self.reports.is_empty() && self.written_count() == 0
    }
}

impl fmt::Display for SnapshotReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for report in &self.reports {
            match &report.outcome {
                ExportOutcome::Written { size_bytes } => {
                    writeln!(
                        f,
                        "{:<20} written  {}",
                        report.id,
                        format_bytes(*size_bytes)
                    )?;
                }
                ExportOutcome::Failed { error } => {
                    writeln!(f, "{:<20} failed   {error}", report.id)?;
                }
            }
        }
        write!(
            f,
            "{} resources: {} written, {} failed",
            self.reports.len(),
            self.written_count(),
            self.failed_count()
        )
    }
}
