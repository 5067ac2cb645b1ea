//! Output formatting and persistence for consolidation runs.
//!
//! Supports JSON (optionally gzipped) for the station set, CSV append for the
//! run history, and a logged summary.

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use tracing::{debug, info};

use crate::stats::{RunMetadata, RunRecord};
use csv::WriterBuilder;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Serializes `value` as pretty JSON, gzip-compressed when `gzip` is set.
pub fn to_json_bytes(value: &impl Serialize, gzip: bool) -> Result<Vec<u8>> {
    let json = serde_json::to_vec_pretty(value)?;
    if !gzip {
        return Ok(json);
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    Ok(encoder.finish()?)
}

/// Writes `value` to `path` as JSON, creating parent directories as needed.
pub fn write_json(path: &str, value: &impl Serialize, gzip: bool) -> Result<()> {
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create '{}'", parent.display()))?;
    }

    let body = to_json_bytes(value, gzip)?;
    fs::write(path, &body).with_context(|| format!("Failed to write '{path}'"))?;
    debug!(path, bytes = body.len(), gzip, "JSON written");
    Ok(())
}

/// Appends a [`RunRecord`] as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &str, record: &RunRecord) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}

/// Logs the headline numbers of a run.
pub fn print_summary(metadata: &RunMetadata) {
    info!(
        generated_at = %metadata.generated_at,
        total = metadata.total_stations,
        rail_ferry = metadata.rail_ferry_stations,
        bus = metadata.bus_stations,
        consolidated = metadata.consolidated_count,
        consolidated_pct = metadata.consolidated_pct(),
        bus_affiliations = metadata.bus_affiliations,
        "Run summary"
    );

    for (operator_id, count) in &metadata.operator_station_counts {
        debug!(operator_id = %operator_id, stations = count, "Operator stations");
    }
}
