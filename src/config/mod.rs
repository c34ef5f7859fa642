//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::cache::{CacheConfig, EdgePolicy};

pub use cli::{
    ArtifactsOverride, CliArgs, Command, ContentApiOverride, ServeArgs, ServeOverrides,
    SnapshotArgs, SnapshotOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "vetrina";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PUBLIC_PORT: u16 = 3000;
const DEFAULT_CONTENT_API_TIMEOUT_SECS: u64 = 10;
const DEFAULT_ARTIFACT_DIR: &str = "snapshots";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub content_api: ContentApiSettings,
    pub artifacts: ArtifactSettings,
    pub cache: CacheConfig,
    pub edge: EdgePolicy,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub public_addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct ContentApiSettings {
    /// Absent until configured; both subcommands require it and fail fast
    /// with a configuration error otherwise.
    pub base_url: Option<Url>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ArtifactSettings {
    pub directory: PathBuf,
    /// When set, the seeder fetches artifacts over HTTP from this base
    /// instead of reading the local directory.
    pub base_url: Option<Url>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("VETRINA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Snapshot(args)) => raw.apply_snapshot_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    content_api: RawContentApiSettings,
    artifacts: RawArtifactSettings,
    cache: CacheConfig,
    edge: EdgePolicy,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    public_port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentApiSettings {
    base_url: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawArtifactSettings {
    directory: Option<PathBuf>,
    base_url: Option<String>,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        self.apply_content_api_override(&overrides.content_api);
        self.apply_artifacts_override(&overrides.artifacts);

        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.public_port {
            self.server.public_port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.artifacts_base_url.as_ref() {
            self.artifacts.base_url = Some(url.clone());
        }
        if let Some(seconds) = overrides.cache_stale_seconds {
            self.cache.stale_seconds = seconds;
        }
        if let Some(seconds) = overrides.cache_retention_seconds {
            self.cache.retention_seconds = seconds;
        }
        if let Some(limit) = overrides.cache_entry_limit {
            self.cache.entry_limit = limit;
        }
        if let Some(seconds) = overrides.cache_sweep_interval_seconds {
            self.cache.sweep_interval_seconds = seconds;
        }
        if let Some(seconds) = overrides.edge_s_maxage_seconds {
            self.edge.s_maxage_seconds = seconds;
        }
        if let Some(seconds) = overrides.edge_stale_while_revalidate_seconds {
            self.edge.stale_while_revalidate_seconds = seconds;
        }
    }

    fn apply_snapshot_overrides(&mut self, overrides: &SnapshotOverrides) {
        self.apply_content_api_override(&overrides.content_api);
        self.apply_artifacts_override(&overrides.artifacts);
    }

    fn apply_content_api_override(&mut self, overrides: &ContentApiOverride) {
        if let Some(url) = overrides.content_api_url.as_ref() {
            self.content_api.base_url = Some(url.clone());
        }
        if let Some(seconds) = overrides.content_api_timeout_seconds {
            self.content_api.timeout_seconds = Some(seconds);
        }
    }

    fn apply_artifacts_override(&mut self, overrides: &ArtifactsOverride) {
        if let Some(directory) = overrides.artifacts_directory.as_ref() {
            self.artifacts.directory = Some(directory.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            content_api,
            artifacts,
            cache,
            edge,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let content_api = build_content_api_settings(content_api)?;
        let artifacts = build_artifact_settings(artifacts)?;
        let cache = validate_cache_settings(cache)?;

        Ok(Self {
            server,
            logging,
            content_api,
            artifacts,
            cache,
            edge,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let public_port = server.public_port.unwrap_or(DEFAULT_PUBLIC_PORT);
    if public_port == 0 {
        return Err(LoadError::invalid(
            "server.public_port",
            "port must be greater than zero",
        ));
    }

    let public_addr = parse_socket_addr(&host, public_port)
        .map_err(|reason| LoadError::invalid("server.public_addr", reason))?;

    Ok(ServerSettings { public_addr })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_content_api_settings(
    content_api: RawContentApiSettings,
) -> Result<ContentApiSettings, LoadError> {
    let base_url = match content_api.base_url.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Some(
            Url::parse(value)
                .map_err(|err| LoadError::invalid("content_api.base_url", err.to_string()))?,
        ),
        _ => None,
    };

    let timeout_seconds = content_api
        .timeout_seconds
        .unwrap_or(DEFAULT_CONTENT_API_TIMEOUT_SECS);
    if timeout_seconds == 0 {
        return Err(LoadError::invalid(
            "content_api.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ContentApiSettings {
        base_url,
        timeout: Duration::from_secs(timeout_seconds),
    })
}

fn build_artifact_settings(artifacts: RawArtifactSettings) -> Result<ArtifactSettings, LoadError> {
    let directory = artifacts
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACT_DIR));

    let base_url = match artifacts.base_url.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Some(
            Url::parse(value)
                .map_err(|err| LoadError::invalid("artifacts.base_url", err.to_string()))?,
        ),
        _ => None,
    };

    Ok(ArtifactSettings {
        directory,
        base_url,
    })
}

fn validate_cache_settings(cache: CacheConfig) -> Result<CacheConfig, LoadError> {
    if !cache.windows_are_ordered() {
        return Err(LoadError::invalid(
            "cache.stale_seconds",
            "stale window must not exceed the retention window",
        ));
    }
    if cache.sweep_interval_seconds == 0 {
        return Err(LoadError::invalid(
            "cache.sweep_interval_seconds",
            "must be greater than zero",
        ));
    }
    Ok(cache)
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    format!("{host}:{port}")
        .parse()
        .map_err(|err| format!("failed to parse socket address: {err}"))
}
