//! Core data types shared by every consolidation pass.

use serde::{Deserialize, Serialize};

use crate::distance::is_valid_location;

/// Physical mode an operator runs. Drives which pass a station goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorType {
    Rail,
    Bus,
    Ferry,
}

impl OperatorType {
    /// Rail and ferry stations are clustered into hubs; buses are only affiliated.
    pub fn is_rail_or_ferry(self) -> bool {
        matches!(self, OperatorType::Rail | OperatorType::Ferry)
    }
}

/// A transit operator as it appears in a station's `operators` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operator {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(rename = "type")]
    pub kind: OperatorType,
}

/// One stop record from an operator feed, usually a single platform.
#[derive(Debug, Clone, PartialEq)]
pub struct RawStop {
    pub stop_id: String,
    pub parent_station_id: Option<String>,
    pub raw_name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl RawStop {
    /// Key that groups platforms of the same physical station within one feed.
    pub fn station_key(&self) -> &str {
        self.parent_station_id.as_deref().unwrap_or(&self.stop_id)
    }

    pub fn has_location(&self) -> bool {
        is_valid_location(self.latitude, self.longitude)
    }
}

/// All stops fetched for a single operator.
#[derive(Debug, Clone)]
pub struct OperatorFeed {
    pub operator: Operator,
    pub stops: Vec<RawStop>,
}

impl OperatorFeed {
    pub fn new(operator: Operator, stops: Vec<RawStop>) -> Self {
        Self { operator, stops }
    }
}

/// A physical station, either from a single operator or a merged hub.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub operators: Vec<Operator>,
    pub is_consolidated: bool,
    pub primary_type: OperatorType,
    pub primary_color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<String>,
}

impl Station {
    /// Creates an unconsolidated station served by exactly one operator.
    pub fn for_operator(
        operator: &Operator,
        station_key: &str,
        name: String,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Station {
            id: format!("{}-{}", operator.id, station_key),
            name,
            latitude,
            longitude,
            operators: vec![operator.clone()],
            is_consolidated: false,
            primary_type: operator.kind,
            primary_color: operator.color.clone(),
            services: None,
        }
    }

    /// The operator the station was created from (the seed operator for hubs).
    pub fn lead_operator(&self) -> &Operator {
        &self.operators[0]
    }

    pub fn has_operator(&self, operator_id: &str) -> bool {
        self.operators.iter().any(|o| o.id == operator_id)
    }
}
