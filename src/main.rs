use std::{process, sync::Arc};

use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{Dispatch, Level, debug, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use url::Url;
use vetrina::{
    application::{
        error::AppError,
        sources::{ArtifactFetcher, ArtifactWriter, ContentReader},
    },
    cache::{CacheSeeder, QueryCache},
    config,
    domain::ResourceRegistry,
    infra::{
        artifacts::{FsArtifactStore, HttpArtifactFetcher},
        content_api::HttpContentReader,
        error::InfraError,
        http::{HttpState, build_router},
        telemetry,
    },
    snapshot::SnapshotGenerator,
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let cli_args = config::CliArgs::parse();
    let settings = config::load(&cli_args)
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Snapshot(_) => run_snapshot(settings).await,
    }
}

fn content_reader(settings: &config::Settings) -> Result<Arc<dyn ContentReader>, AppError> {
    let base_url: &Url = settings
        .content_api
        .base_url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("content api base url is not configured"))
        .map_err(AppError::from)?;

    let reader = HttpContentReader::new(base_url.clone(), settings.content_api.timeout)
        .map_err(AppError::from)?;
    Ok(Arc::new(reader))
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let registry = Arc::new(ResourceRegistry::standard().map_err(AppError::from)?);
    let content = content_reader(&settings)?;

    let artifacts =
        Arc::new(FsArtifactStore::new(settings.artifacts.directory.clone()).map_err(AppError::from)?);

    let artifact_fetcher: Arc<dyn ArtifactFetcher> = match settings.artifacts.base_url.as_ref() {
        Some(base_url) => Arc::new(
            HttpArtifactFetcher::new(base_url.clone(), settings.content_api.timeout)
                .map_err(AppError::from)?,
        ),
        None => artifacts.clone(),
    };

    let cache = QueryCache::new(&settings.cache, registry, content);

    // Startup seeding never blocks serving; consumers read whatever is
    // cached and pick up entries as they land.
    let seeder = CacheSeeder::new(cache.clone(), artifact_fetcher);
    let seed_handle = tokio::spawn(async move {
        seeder.seed().await;
    });

    let event_handle = spawn_event_logger(&cache);
    let sweep_handle = spawn_sweeper(&cache, settings.cache.sweep_interval());

    let state = HttpState {
        cache,
        artifacts,
        edge: settings.edge,
    };
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "vetrina::serve",
        addr = %settings.server.public_addr,
        "public read edge listening"
    );

    let result = axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")));

    sweep_handle.abort();
    event_handle.abort();
    seed_handle.abort();
    let _ = seed_handle.await;

    result
}

fn spawn_event_logger(cache: &QueryCache) -> tokio::task::JoinHandle<()> {
    let mut events = cache.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => debug!(
                    target = "vetrina::serve::events",
                    key = %event.key,
                    kind = ?event.kind,
                    epoch = event.epoch,
                    "cache event"
                ),
                Err(RecvError::Lagged(skipped)) => warn!(
                    target = "vetrina::serve::events",
                    skipped, "cache event logger lagged"
                ),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn spawn_sweeper(cache: &QueryCache, interval: std::time::Duration) -> tokio::task::JoinHandle<()> {
    let cache = cache.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // Skip the first immediate tick
        loop {
            ticker.tick().await;
            cache.sweep();
        }
    })
}

async fn run_snapshot(settings: config::Settings) -> Result<(), AppError> {
    let registry = Arc::new(ResourceRegistry::standard().map_err(AppError::from)?);
    let content = content_reader(&settings)?;

    let artifacts: Arc<dyn ArtifactWriter> =
        Arc::new(FsArtifactStore::new(settings.artifacts.directory.clone()).map_err(AppError::from)?);

    info!(
        target = "vetrina::snapshot",
        directory = %settings.artifacts.directory.display(),
        resources = registry.len(),
        "starting snapshot run"
    );

    let generator = SnapshotGenerator::new(registry, content, artifacts);
    let report = generator.run().await;

    println!("{report}");

    if report.all_failed() {
        return Err(AppError::snapshot(
            "every resource export failed; nothing was written",
        ));
    }
    Ok(())
}
