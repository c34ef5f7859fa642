//! Snapshot generation: the deploy-time half of the read-freshness pipeline.

mod generator;
mod report;

pub use generator::SnapshotGenerator;
pub use report::{ExportOutcome, ResourceReport, SnapshotReport};
