//! Snapshot export over the resource registry.
//!
//! For every descriptor the generator fetches the live payload from the
//! Content API and replaces the corresponding artifact wholesale. Resources
//! are independent: fetches fan out with no ordering between them, a
//! failure is isolated to its resource, and read-skew between resources
//! within one run is accepted.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use metrics::histogram;
use tracing::{info, warn};

use crate::application::sources::{ArtifactWriter, ContentReader};
use crate::domain::{ResourceDescriptor, ResourceRegistry};

use super::report::{ExportOutcome, ResourceReport, SnapshotReport};

const METRIC_SNAPSHOT_WRITE_MS: &str = "vetrina_snapshot_write_ms";

pub struct SnapshotGenerator {
    registry: Arc<ResourceRegistry>,
    content: Arc<dyn ContentReader>,
    artifacts: Arc<dyn ArtifactWriter>,
}

impl SnapshotGenerator {
    pub fn new(
        registry: Arc<ResourceRegistry>,
        content: Arc<dyn ContentReader>,
        artifacts: Arc<dyn ArtifactWriter>,
    ) -> Self {
        Self {
            registry,
            content,
            artifacts,
        }
    }

    /// Export every registered resource once. Safe to re-run: artifacts are
    /// simply overwritten.
    pub async fn run(&self) -> SnapshotReport {
        let reports = join_all(
            self.registry
                .iter()
                .map(|descriptor| self.export_one(*descriptor)),
        )
        .await;

        let report = SnapshotReport::new(reports);
        info!(
            target = "vetrina::snapshot",
            written = report.written_count(),
            failed = report.failed_count(),
            "snapshot run complete"
        );
        report
    }

    async fn export_one(&self, descriptor: ResourceDescriptor) -> ResourceReport {
        let started_at = Instant::now();

        let outcome = match self.content.fetch(&descriptor, None).await {
            Ok(payload) => match self.artifacts.write(&descriptor, &payload).await {
                Ok(size_bytes) => {
                    info!(
                        target = "vetrina::snapshot",
                        resource = %descriptor.id,
                        size_bytes,
                        "artifact written"
                    );
                    ExportOutcome::Written { size_bytes }
                }
                Err(error) => {
                    // The fetch succeeded; only this resource's artifact is
                    // affected, and the prior one on disk stays untouched.
                    warn!(
                        target = "vetrina::snapshot",
                        resource = %descriptor.id,
                        error = %error,
                        "artifact write failed"
                    );
                    ExportOutcome::Failed {
                        error: error.to_string(),
                    }
                }
            },
            Err(error) => {
                warn!(
                    target = "vetrina::snapshot",
                    resource = %descriptor.id,
                    error = %error,
                    "live fetch failed, artifact left untouched"
                );
                ExportOutcome::Failed {
                    error: error.to_string(),
                }
            }
        };

        histogram!(METRIC_SNAPSHOT_WRITE_MS, "resource" => descriptor.id.as_str())
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        ResourceReport {
            id: descriptor.id,
            outcome,
        }
    }
}
