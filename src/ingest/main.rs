//! Offline boundary ingest tool.
//!
//! Loads boundary feeds into a fresh store, reports what was accepted and
//! rejected, optionally runs the sample checks, and writes a normalized
//! seed list the query server can load directly.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{json, Value};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use incountry::config::Config;
use incountry::loader::{feed_files, load_path, DuplicatePolicy, LoadReport};
use incountry::{samples, BoundaryStore, PipService};

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Validate and normalize country boundary feeds")]
struct Args {
    /// Feed files or directories, loaded in order
    sources: Vec<PathBuf>,

    /// TOML config file; its [data] sources are loaded after the CLI ones
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Load the built-in sample countries first
    #[arg(long)]
    samples: bool,

    /// Run the sample checks against the loaded data
    #[arg(long)]
    verify: bool,

    /// Write the loaded countries as a seed list
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Fail if any feed entry was rejected
    #[arg(long)]
    strict: bool,

    #[arg(long, value_enum)]
    on_duplicate: Option<DuplicatePolicy>,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut sources = args.sources.clone();
    let mut policy = DuplicatePolicy::default();
    if let Some(path) = &args.config {
        let config = Config::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?;
        sources.extend(config.data.sources);
        policy = config.data.on_duplicate;
    }
    if let Some(p) = args.on_duplicate {
        policy = p;
    }

    if sources.is_empty() && !args.samples {
        anyhow::bail!("Nothing to ingest: pass feed sources or --samples");
    }

    let store = Arc::new(BoundaryStore::new());
    let mut report = LoadReport::default();

    if args.samples {
        report.merge(samples::load_into(&store, policy)?);
        info!("Loaded built-in samples");
    }

    let files = sources
        .iter()
        .map(|s| feed_files(s))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();
    info!("Found {} feed files", files.len());

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    for file in &files {
        pb.set_message(file_label(file));
        report.merge(load_path(&store, file, policy)?);
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        "Ingested {} countries: {} loaded, {} replaced, {} skipped, {} failed",
        store.len(),
        report.loaded,
        report.replaced,
        report.skipped,
        report.failed.len()
    );
    for (code, reason) in &report.failed {
        warn!("  {}: {}", code, reason);
    }

    let mut ok = true;

    if args.verify {
        let failures = samples::verify(&PipService::new(store.clone()));
        for failure in &failures {
            let check = &failure.check;
            error!(
                "Check failed: {} ({}, {}) in {}: expected {}, got {}",
                check.label,
                check.lat,
                check.lon,
                check.country_code,
                check.expected,
                failure
                    .actual
                    .map_or("country not loaded".to_string(), |a| a.to_string())
            );
        }
        info!(
            "Sample checks: {}/{} passed",
            samples::SAMPLE_CHECKS.len() - failures.len(),
            samples::SAMPLE_CHECKS.len()
        );
        ok &= failures.is_empty();
    }

    if let Some(path) = &args.output {
        write_seed_list(&store, path)?;
        info!("Wrote {} countries to {}", store.len(), path.display());
    }

    if args.strict && !report.failed.is_empty() {
        error!("{} feed entries were rejected", report.failed.len());
        ok = false;
    }

    if !ok {
        anyhow::bail!("Ingest finished with errors");
    }
    Ok(())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

/// Write every loaded record as `{country_code, country_name, polygon_data}`
fn write_seed_list(store: &BoundaryStore, path: &Path) -> Result<()> {
    let seeds: Vec<Value> = store
        .records()
        .iter()
        .map(|r| {
            json!({
                "country_code": r.code.as_str(),
                "country_name": r.name,
                "polygon_data": r.boundary.to_geojson(),
            })
        })
        .collect();

    let file = File::create(path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &seeds)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
