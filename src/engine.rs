//! Consolidation run: deduplicate each feed, cluster rail/ferry stations into
//! hubs, affiliate nearby bus operators, and assemble the final station set.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::affiliation::affiliate_buses;
use crate::cluster::cluster_rail_ferry;
use crate::dedupe::dedupe_platforms;
use crate::model::{OperatorFeed, Station};
use crate::naming::NameCleaner;
use crate::stats::RunMetadata;

pub const DEFAULT_RAIL_THRESHOLD_M: f64 = 200.0;
pub const DEFAULT_BUS_THRESHOLD_M: f64 = 100.0;

/// Distance policy for both clustering passes, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Max seed distance for rail/ferry stations of different operators to merge.
    #[serde(default = "default_rail_m")]
    pub rail_m: f64,
    /// Max distance for a bus stop to count as serving a hub.
    #[serde(default = "default_bus_m")]
    pub bus_m: f64,
}

fn default_rail_m() -> f64 {
    DEFAULT_RAIL_THRESHOLD_M
}

fn default_bus_m() -> f64 {
    DEFAULT_BUS_THRESHOLD_M
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            rail_m: DEFAULT_RAIL_THRESHOLD_M,
            bus_m: DEFAULT_BUS_THRESHOLD_M,
        }
    }
}

/// Final station set plus run metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ConsolidationOutput {
    pub metadata: RunMetadata,
    pub stations: Vec<Station>,
}

pub struct Consolidator<C> {
    thresholds: Thresholds,
    cleaner: C,
    attribution: Option<String>,
}

impl<C: NameCleaner> Consolidator<C> {
    pub fn new(cleaner: C) -> Self {
        Self {
            thresholds: Thresholds::default(),
            cleaner,
            attribution: None,
        }
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_attribution(mut self, attribution: impl Into<String>) -> Self {
        self.attribution = Some(attribution.into());
        self
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Runs every pass over `feeds` in order.
    ///
    /// Output is hubs and standalone rail/ferry stations in seed order, then
    /// every bus station in feed order. Apart from `generated_at`, identical
    /// input yields identical output.
    #[tracing::instrument(skip_all, fields(feeds = feeds.len()))]
    pub fn run(&self, feeds: &[OperatorFeed], generated_at: DateTime<Utc>) -> ConsolidationOutput {
        let mut metadata = RunMetadata::new(generated_at);
        metadata.attribution = self.attribution.clone();

        let mut rail_ferry = Vec::new();
        let mut buses = Vec::new();
        let mut seen_operators = HashSet::new();

        for feed in feeds {
            let operator = &feed.operator;
            metadata.sources.push(operator.name.clone());
            if !seen_operators.insert(operator.id.as_str()) {
                warn!(
                    operator_id = %operator.id,
                    "Operator id appears in more than one feed; station counts are combined"
                );
            }

            let stations = dedupe_platforms(feed, &self.cleaner);
            *metadata
                .operator_station_counts
                .entry(operator.id.clone())
                .or_default() += stations.len();

            if stations.is_empty() {
                warn!(
                    operator_id = %operator.id,
                    stops = feed.stops.len(),
                    "Operator produced no stations, skipping"
                );
                metadata.skipped_operators.push(operator.id.clone());
                continue;
            }

            if operator.kind.is_rail_or_ferry() {
                rail_ferry.extend(stations);
            } else {
                buses.extend(stations);
            }
        }

        let mut hubs = cluster_rail_ferry(&rail_ferry, self.thresholds.rail_m);
        metadata.bus_affiliations = affiliate_buses(&mut hubs, &buses, self.thresholds.bus_m);

        metadata.consolidated_count = hubs.iter().filter(|h| h.is_consolidated).count();
        metadata.rail_ferry_stations = hubs.len();
        metadata.bus_stations = buses.len();

        let mut stations = hubs;
        stations.extend(buses);
        metadata.total_stations = stations.len();

        debug_assert!(
            stations.iter().all(|s| !s.operators.is_empty()),
            "every station must have at least one operator"
        );

        info!(
            total = metadata.total_stations,
            rail_ferry = metadata.rail_ferry_stations,
            bus = metadata.bus_stations,
            consolidated = metadata.consolidated_count,
            bus_affiliations = metadata.bus_affiliations,
            skipped = metadata.skipped_operators.len(),
            "Consolidation complete"
        );

        ConsolidationOutput { metadata, stations }
    }
}
