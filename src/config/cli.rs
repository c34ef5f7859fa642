use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the Vetrina binary.
#[derive(Debug, Parser)]
#[command(name = "vetrina", version, about = "Vetrina read-freshness pipeline")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "VETRINA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the public read edge: seed the query cache and serve it.
    Serve(Box<ServeArgs>),
    /// Export every registered resource to its snapshot artifact and exit.
    #[command(name = "snapshot")]
    Snapshot(SnapshotArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ContentApiOverride {
    /// Override the Content API base URL.
    #[arg(long = "content-api-url", value_name = "URL")]
    pub content_api_url: Option<String>,

    /// Override the per-call Content API timeout.
    #[arg(long = "content-api-timeout-seconds", value_name = "SECONDS")]
    pub content_api_timeout_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ArtifactsOverride {
    /// Override the snapshot artifact directory.
    #[arg(long = "artifacts-directory", value_name = "PATH")]
    pub artifacts_directory: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub content_api: ContentApiOverride,

    #[command(flatten)]
    pub artifacts: ArtifactsOverride,

    /// Override the public listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the public listener port.
    #[arg(long = "server-public-port", value_name = "PORT")]
    pub public_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the artifact base URL the seeder fetches from; defaults to
    /// the local artifact directory.
    #[arg(long = "artifacts-base-url", value_name = "URL")]
    pub artifacts_base_url: Option<String>,

    /// Override the in-memory stale window.
    #[arg(long = "cache-stale-seconds", value_name = "SECONDS")]
    pub cache_stale_seconds: Option<u64>,

    /// Override the in-memory retention window.
    #[arg(long = "cache-retention-seconds", value_name = "SECONDS")]
    pub cache_retention_seconds: Option<u64>,

    /// Override the cache entry limit.
    #[arg(long = "cache-entry-limit", value_name = "COUNT")]
    pub cache_entry_limit: Option<usize>,

    /// Override the retention sweep interval.
    #[arg(long = "cache-sweep-interval-seconds", value_name = "SECONDS")]
    pub cache_sweep_interval_seconds: Option<u64>,

    /// Override the edge `s-maxage` window.
    #[arg(long = "edge-s-maxage-seconds", value_name = "SECONDS")]
    pub edge_s_maxage_seconds: Option<u32>,

    /// Override the edge `stale-while-revalidate` window.
    #[arg(long = "edge-stale-while-revalidate-seconds", value_name = "SECONDS")]
    pub edge_stale_while_revalidate_seconds: Option<u32>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub overrides: SnapshotOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SnapshotOverrides {
    #[command(flatten)]
    pub content_api: ContentApiOverride,

    #[command(flatten)]
    pub artifacts: ArtifactsOverride,
}
