use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Run-level metadata emitted alongside the station set.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct RunMetadata {
    pub generated_at: DateTime<Utc>,
    pub total_stations: usize,
    pub rail_ferry_stations: usize,
    pub bus_stations: usize,

    // consolidation
    pub consolidated_count: usize,
    pub bus_affiliations: usize,

    // per operator, after platform deduplication
    pub operator_station_counts: BTreeMap<String, usize>,
    pub skipped_operators: Vec<String>,

    // attribution
    pub sources: Vec<String>,
    pub attribution: Option<String>,
}

impl RunMetadata {
    pub fn new(generated_at: DateTime<Utc>) -> Self {
        RunMetadata {
            generated_at,
            ..Default::default()
        }
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    /// Share of rail/ferry output stations that are multi-operator hubs.
    pub fn consolidated_pct(&self) -> f64 {
        Self::pct(self.consolidated_count, self.rail_ferry_stations)
    }

    /// Flattens the metadata into a single CSV history row.
    pub fn to_record(&self) -> RunRecord {
        RunRecord {
            timestamp: self.generated_at,
            total_stations: self.total_stations,
            rail_ferry_stations: self.rail_ferry_stations,
            bus_stations: self.bus_stations,
            consolidated_count: self.consolidated_count,
            bus_affiliations: self.bus_affiliations,
            operators: self.operator_station_counts.len(),
            skipped_operators: self.skipped_operators.join(";"),
        }
    }
}

/// One row of the run history CSV.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunRecord {
    pub timestamp: DateTime<Utc>,
    pub total_stations: usize,
    pub rail_ferry_stations: usize,
    pub bus_stations: usize,
    pub consolidated_count: usize,
    pub bus_affiliations: usize,
    pub operators: usize,
    pub skipped_operators: String,
}
