//! Bulk boundary loading from feed files.
//!
//! Sources are files or directories. Files may be gzip-compressed
//! (`.gz`). Directories are walked recursively in path order and every
//! `.json`/`.geojson` file is loaded. Geometry parsing runs in parallel;
//! records are installed in feed order so the outcome is deterministic.

mod feed;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::pip::{BoundaryRecord, BoundaryStore};

pub use feed::{decode_polygon_data, parse_feed, Feed, FeedEntry};

/// What to do when a feed entry's code is already loaded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// The later entry wins
    #[default]
    Replace,
    /// Keep whatever is already loaded
    Skip,
}

/// Outcome of loading one or more feeds
#[derive(Debug, Default, Clone)]
pub struct LoadReport {
    /// Records newly installed
    pub loaded: usize,
    /// Records that replaced an existing one
    pub replaced: usize,
    /// Entries ignored (no usable code/name, or duplicate under `Skip`)
    pub skipped: usize,
    /// (country code, reason) for entries whose geometry was rejected
    pub failed: Vec<(String, String)>,
}

impl LoadReport {
    pub fn merge(&mut self, other: LoadReport) {
        self.loaded += other.loaded;
        self.replaced += other.replaced;
        self.skipped += other.skipped;
        self.failed.extend(other.failed);
    }
}

/// Parse and install feed entries
pub fn load_entries(
    store: &BoundaryStore,
    entries: Vec<FeedEntry>,
    policy: DuplicatePolicy,
) -> LoadReport {
    let parsed: Vec<_> = entries
        .into_par_iter()
        .map(|entry| {
            BoundaryRecord::from_value(&entry.country_code, &entry.country_name, &entry.geometry)
                .map_err(|e| (entry.country_code, e.to_string()))
        })
        .collect();

    let mut report = LoadReport::default();
    for result in parsed {
        match result {
            Ok(record) => match policy {
                DuplicatePolicy::Replace => {
                    if store.insert(record).is_some() {
                        report.replaced += 1;
                    } else {
                        report.loaded += 1;
                    }
                }
                DuplicatePolicy::Skip => {
                    let code = record.code.clone();
                    if store.insert_if_absent(record) {
                        report.loaded += 1;
                    } else {
                        info!("{} already exists, skipping...", code);
                        report.skipped += 1;
                    }
                }
            },
            Err((code, reason)) => {
                warn!("Failed to load boundary {}: {}", code, reason);
                report.failed.push((code, reason));
            }
        }
    }
    report
}

/// Load a decoded feed document
pub fn load_document(
    store: &BoundaryStore,
    doc: Value,
    policy: DuplicatePolicy,
) -> Result<LoadReport> {
    let feed = parse_feed(doc)?;
    let mut report = load_entries(store, feed.entries, policy);
    report.skipped += feed.skipped;
    Ok(report)
}

/// Load every feed file under `path` (a file or a directory)
pub fn load_path(
    store: &BoundaryStore,
    path: &Path,
    policy: DuplicatePolicy,
) -> Result<LoadReport> {
    let mut report = LoadReport::default();
    for file in feed_files(path)? {
        let doc = read_document(&file)?;
        let file_report = load_document(store, doc, policy)
            .with_context(|| format!("Failed to load feed {}", file.display()))?;
        info!(
            "{}: {} loaded, {} replaced, {} skipped, {} failed",
            file.display(),
            file_report.loaded,
            file_report.replaced,
            file_report.skipped,
            file_report.failed.len()
        );
        report.merge(file_report);
    }
    Ok(report)
}

/// Load several sources in order
pub fn load_sources(
    store: &BoundaryStore,
    sources: &[PathBuf],
    policy: DuplicatePolicy,
) -> Result<LoadReport> {
    let mut report = LoadReport::default();
    for source in sources {
        report.merge(load_path(store, source, policy)?);
    }
    Ok(report)
}

/// Expand a source into the feed files it names
pub fn feed_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        anyhow::bail!("Feed source not found: {}", path.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).follow_links(true).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && is_feed_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn is_feed_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let name = name.strip_suffix(".gz").unwrap_or(name);
    name.ends_with(".json") || name.ends_with(".geojson")
}

/// Read and decode a JSON document, gunzipping `.gz` files
pub fn read_document(path: &Path) -> Result<Value> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open feed file {}", path.display()))?;
    let reader: Box<dyn Read> = if path.extension().map_or(false, |e| e == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    serde_json::from_reader(BufReader::new(reader))
        .with_context(|| format!("Failed to parse feed file {}", path.display()))
}
