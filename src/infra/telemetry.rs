use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "vetrina_cache_hit_total",
            Unit::Count,
            "Total number of query cache hits (fresh or stale)."
        );
        describe_counter!(
            "vetrina_cache_miss_total",
            Unit::Count,
            "Total number of query cache misses."
        );
        describe_counter!(
            "vetrina_cache_evict_total",
            Unit::Count,
            "Total number of entries evicted after the retention window."
        );
        describe_counter!(
            "vetrina_cache_revalidate_total",
            Unit::Count,
            "Total number of background revalidations, by outcome."
        );
        describe_counter!(
            "vetrina_seed_artifact_total",
            Unit::Count,
            "Total number of artifact seed attempts, by outcome."
        );
        describe_counter!(
            "vetrina_seed_fallback_total",
            Unit::Count,
            "Total number of live fallbacks during seeding, by outcome."
        );
        describe_histogram!(
            "vetrina_cache_sweep_ms",
            Unit::Milliseconds,
            "Retention sweep latency in milliseconds."
        );
        describe_histogram!(
            "vetrina_snapshot_write_ms",
            Unit::Milliseconds,
            "Per-resource snapshot export latency in milliseconds."
        );
    });
}
