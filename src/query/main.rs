//! Query server for point-in-country checks.
//!
//! Loads country boundaries into memory at startup and serves the
//! containment API plus country management over HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use clap::Parser;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use incountry::config::Config;
use incountry::loader::{load_sources, DuplicatePolicy, LoadReport};
use incountry::{samples, BoundaryStore, PipService};

mod routes;
use routes::{router, AppState};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "query")]
#[command(about = "Point-in-country query server")]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (overrides config)
    #[arg(short, long)]
    listen: Option<String>,

    /// Boundary feed file or directory; may be repeated
    #[arg(short, long = "source")]
    sources: Vec<PathBuf>,

    /// Do not load the built-in sample countries
    #[arg(long)]
    no_samples: bool,

    /// What to do when a feed repeats a country code (overrides config)
    #[arg(long, value_enum)]
    on_duplicate: Option<DuplicatePolicy>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    config.data.sources.extend(args.sources);
    if args.no_samples {
        config.data.include_samples = false;
    }
    if let Some(policy) = args.on_duplicate {
        config.data.on_duplicate = policy;
    }

    info!("incountry query server v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(BoundaryStore::new());
    let mut report = LoadReport::default();
    if config.data.include_samples {
        report.merge(samples::load_into(&store, config.data.on_duplicate)?);
    }
    report.merge(load_sources(
        &store,
        &config.data.sources,
        config.data.on_duplicate,
    )?);

    info!(
        "Loaded {} countries ({} replaced, {} skipped, {} failed)",
        store.len(),
        report.replaced,
        report.skipped,
        report.failed.len()
    );
    if store.is_empty() {
        warn!("No countries loaded; every check will return 404 until countries are added");
    }

    let state = Arc::new(AppState {
        service: PipService::new(store),
    });

    let app = router(state)
        .layer(cors_layer(&config.server.cors_origins)?)
        .layer(TraceLayer::new_for_http());

    info!("Starting server on {}", config.server.listen);

    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen))?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return Ok(CorsLayer::permissive());
    }

    let origins = origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin {}", o))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any))
}
