//! CLI entry point for the station consolidator.
//!
//! Provides subcommands for consolidating all configured operator feeds into
//! one station set, listing the configured operators, and inspecting a single
//! stops feed.

mod infra;

use crate::infra::keys::{EnvKeyStore, KeyStore};
use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use station_consolidator::config::{ConsolidatorConfig, OperatorConfig};
use station_consolidator::dedupe::dedupe_platforms;
use station_consolidator::engine::{Consolidator, Thresholds};
use station_consolidator::fetch::{BasicClient, client_for, load_operator_feed, load_source};
use station_consolidator::model::{Operator, OperatorFeed, OperatorType};
use station_consolidator::naming::StandardNameCleaner;
use station_consolidator::output::{append_record, print_summary, write_json};
use station_consolidator::parser::parse_stops;
use station_consolidator::publish::write_json_to_s3;
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use tracing::Instrument;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "station_consolidator")]
#[command(about = "Merge multi-operator transit stops into physical stations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every configured operator feed and write the consolidated station set
    Consolidate {
        /// Operator config JSON
        #[arg(short, long, default_value = "operators.json")]
        config: String,

        /// File to write the station set JSON to
        #[arg(short, long, default_value = "stations.json")]
        output: String,

        /// Optional: CSV file to append a run summary row to
        #[arg(long)]
        history: Option<String>,

        /// Optional: S3 bucket name to upload the station set to (e.g., "my-bucket")
        #[arg(long)]
        s3_bucket: Option<String>,

        /// Gzip compress the station set JSON
        #[arg(long, default_value_t = false)]
        gzip: bool,

        /// Override the rail/ferry hub distance in meters
        #[arg(long)]
        rail_threshold: Option<f64>,

        /// Override the bus-to-hub distance in meters
        #[arg(long)]
        bus_threshold: Option<f64>,
    },
    /// List the operators in a config file
    ListOperators {
        /// Operator config JSON
        #[arg(short, long, default_value = "operators.json")]
        config: String,
    },
    /// Parse one stops.txt file or URL and report platform deduplication
    Inspect {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        #[arg(long, default_value = "local")]
        operator_id: String,

        #[arg(long, default_value = "Local")]
        operator_name: String,

        #[arg(long, value_enum, default_value_t = ModeArg::Rail)]
        mode: ModeArg,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    Rail,
    Bus,
    Ferry,
}

impl From<ModeArg> for OperatorType {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Rail => OperatorType::Rail,
            ModeArg::Bus => OperatorType::Bus,
            ModeArg::Ferry => OperatorType::Ferry,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/station_consolidator.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("station_consolidator.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Consolidate {
            config,
            output,
            history,
            s3_bucket,
            gzip,
            rail_threshold,
            bus_threshold,
        } => {
            let mut config = ConsolidatorConfig::load(&config)?;
            config.thresholds = Thresholds {
                rail_m: rail_threshold.unwrap_or(config.thresholds.rail_m),
                bus_m: bus_threshold.unwrap_or(config.thresholds.bus_m),
            };
            config.validate()?;

            consolidate(&config, &output, history.as_deref(), s3_bucket, gzip).await?;
        }
        Commands::ListOperators { config } => {
            let config = ConsolidatorConfig::load(&config)?;

            info!(total = config.operators.len(), "Operator list loaded");

            for op in &config.operators {
                let auth_str = if op.auth.requires_auth() {
                    "api-key"
                } else {
                    "open"
                };
                info!(
                    operator_id = %op.operator.id,
                    operator_name = %op.operator.name,
                    mode = ?op.operator.kind,
                    color = %op.operator.color,
                    source = %op.source,
                    auth = auth_str,
                    "Operator"
                );
            }

            info!(
                rail_m = config.thresholds.rail_m,
                bus_m = config.thresholds.bus_m,
                request_delay_ms = config.request_delay_ms,
                "Consolidation policy"
            );
        }
        Commands::Inspect {
            source,
            operator_id,
            operator_name,
            mode,
        } => {
            let bytes = load_source(&BasicClient::new()?, &source).await?;
            let stops = parse_stops(&bytes)?;
            let operator = Operator {
                id: operator_id,
                name: operator_name,
                color: "#000000".to_string(),
                kind: mode.into(),
            };
            let feed = OperatorFeed::new(operator, stops);
            let stations = dedupe_platforms(&feed, &StandardNameCleaner::new());
            let located = feed.stops.iter().filter(|s| s.has_location()).count();

            info!(
                stops = feed.stops.len(),
                located,
                stations = stations.len(),
                "Feed inspected"
            );
            for station in &stations {
                info!(
                    id = %station.id,
                    name = %station.name,
                    lat = station.latitude,
                    lon = station.longitude,
                    "Station"
                );
            }
        }
    }

    Ok(())
}

/// Fetches every operator feed sequentially, runs the consolidation engine and
/// persists the result.
#[tracing::instrument(skip(config, s3_bucket, gzip), fields(operators = config.operators.len()))]
async fn consolidate(
    config: &ConsolidatorConfig,
    output: &str,
    history: Option<&str>,
    s3_bucket: Option<String>,
    gzip: bool,
) -> Result<()> {
    let keys = match std::env::var("API_KEY_PREFIX") {
        Ok(prefix) => EnvKeyStore::with_prefix(prefix),
        Err(_) => EnvKeyStore::new(),
    };
    let feeds = fetch_all_operators(config, &keys).await;

    let mut consolidator =
        Consolidator::new(StandardNameCleaner::new()).with_thresholds(config.thresholds);
    if let Some(attribution) = &config.attribution {
        consolidator = consolidator.with_attribution(attribution.clone());
    }
    let thresholds = consolidator.thresholds();
    info!(
        rail_m = thresholds.rail_m,
        bus_m = thresholds.bus_m,
        feeds = feeds.len(),
        "Running consolidation"
    );

    let result = consolidator.run(&feeds, Utc::now());
    print_summary(&result.metadata);

    write_json(output, &result, gzip)?;
    info!(path = output, stations = result.stations.len(), "Station set written");

    if let Some(path) = history {
        append_record(path, &result.metadata.to_record())?;
    }

    if let Some(bucket) = s3_bucket {
        let aws = aws_config::load_from_env().await;
        let s3 = aws_sdk_s3::Client::new(&aws);
        let file_name = Path::new(output)
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or("stations.json");
        let key = format!(
            "stations/date={}/{}",
            result.metadata.generated_at.format("%Y-%m-%d"),
            file_name
        );

        write_json_to_s3(&s3, &bucket, &key, &result, gzip).await?;
        write_json_to_s3(&s3, &bucket, "stations/latest.json", &result, false).await?;
        info!(bucket = %bucket, key = %key, "Station set uploaded to S3");
    }

    Ok(())
}

/// Fetches operators one at a time with a fixed pause between requests.
///
/// A failed fetch is logged and the operator contributes an empty feed, so the
/// engine records it as skipped instead of aborting the run.
async fn fetch_all_operators<K: KeyStore>(config: &ConsolidatorConfig, keys: &K) -> Vec<OperatorFeed> {
    let delay = Duration::from_millis(config.request_delay_ms);
    let mut feeds = Vec::with_capacity(config.operators.len());

    for (i, op) in config.operators.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let span = tracing::info_span!(
            "fetch_operator",
            operator_id = %op.operator.id,
            operator_name = %op.operator.name,
        );

        let feed = fetch_operator(op, keys)
            .instrument(span)
            .await
            .unwrap_or_else(|e| {
                error!(operator_id = %op.operator.id, error = %e, "Operator fetch failed");
                OperatorFeed::new(op.operator.clone(), Vec::new())
            });

        if feed.stops.is_empty() {
            warn!(operator_id = %op.operator.id, "Operator feed returned no stops");
        } else {
            info!(operator_id = %op.operator.id, stops = feed.stops.len(), "Operator feed loaded");
        }
        feeds.push(feed);
    }

    feeds
}

async fn fetch_operator<K: KeyStore>(op: &OperatorConfig, keys: &K) -> Result<OperatorFeed> {
    let key = match (&op.api_key_env, op.auth.requires_auth()) {
        (Some(reference), true) => Some(keys.get(reference).await?),
        _ => None,
    };
    let client = client_for(&op.auth, key)?;

    let fetch_start = std::time::Instant::now();
    let feed = load_operator_feed(&client, op).await?;
    let elapsed = fetch_start.elapsed();
    if elapsed.as_secs() > 15 {
        warn!(elapsed_secs = elapsed.as_secs(), "Feed fetch was slow");
    }

    Ok(feed)
}
