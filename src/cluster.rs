//! Cross-operator clustering of rail and ferry stations into hubs.
//!
//! Greedy single pass in input order: each unclaimed station seeds a cluster
//! and claims every later unclaimed station within the threshold whose
//! operator is not yet in the cluster. A station within reach of two seeds
//! joins whichever seed comes first.

use std::collections::HashSet;

use tracing::debug;

use crate::distance::station_distance;
use crate::model::{OperatorType, Station};
use crate::naming::hub_name;

/// Partitions rail/ferry stations into clusters and emits one station per
/// cluster. Singletons are returned unchanged; larger clusters go through
/// [`merge_cluster`].
pub fn cluster_rail_ferry(stations: &[Station], rail_threshold_m: f64) -> Vec<Station> {
    // Claims are positional: station ids are not guaranteed unique across
    // operators ("A-B" + "C" and "A" + "B-C" both render as "A-B-C").
    let mut claimed = vec![false; stations.len()];
    let mut output = Vec::new();

    for (i, seed) in stations.iter().enumerate() {
        if claimed[i] {
            continue;
        }
        claimed[i] = true;

        let mut joined = Vec::new();
        let mut operator_ids: HashSet<&str> = HashSet::from([seed.lead_operator().id.as_str()]);

        for (j, candidate) in stations.iter().enumerate().skip(i + 1) {
            if claimed[j] {
                continue;
            }
            let candidate_operator = candidate.lead_operator().id.as_str();
            if operator_ids.contains(candidate_operator) {
                continue;
            }
            if station_distance(seed, candidate) <= rail_threshold_m {
                operator_ids.insert(candidate_operator);
                claimed[j] = true;
                joined.push(candidate);
            }
        }

        if joined.is_empty() {
            output.push(seed.clone());
        } else {
            debug!(
                seed = %seed.id,
                members = joined.len() + 1,
                "Rail/ferry cluster formed"
            );
            output.push(merge_cluster(seed, &joined));
        }
    }

    output
}

/// Builds the consolidated hub record for `seed` and the stations that joined
/// it. Geometry is the seed's, never an average.
pub fn merge_cluster(seed: &Station, joined: &[&Station]) -> Station {
    let seed_operator = seed.lead_operator();
    let operators: Vec<_> = std::iter::once(seed_operator)
        .chain(joined.iter().map(|m| m.lead_operator()))
        .cloned()
        .collect();
    let primary = operators
        .iter()
        .find(|o| o.kind == OperatorType::Rail)
        .unwrap_or(seed_operator);
    let services = operators
        .iter()
        .map(|o| o.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    Station {
        id: format!("consolidated-{}", seed.id),
        name: hub_name(&seed.name),
        latitude: seed.latitude,
        longitude: seed.longitude,
        primary_type: primary.kind,
        primary_color: primary.color.clone(),
        operators,
        is_consolidated: true,
        services: Some(services),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::haversine_distance;
    use crate::model::Operator;

    fn operator(id: &str, kind: OperatorType) -> Operator {
        Operator {
            id: id.to_string(),
            name: format!("Operator {id}"),
            color: format!("#{id}{id}{id}"),
            kind,
        }
    }

    fn station(op: &str, kind: OperatorType, key: &str, lat: f64, lon: f64) -> Station {
        Station::for_operator(&operator(op, kind), key, format!("{key} Station"), lat, lon)
    }

    #[test]
    fn test_nearby_stations_from_different_operators_merge() {
        let stations = vec![
            station("A", OperatorType::Rail, "MAIN", 37.0, -122.0),
            station("B", OperatorType::Rail, "CTR", 37.0005, -122.0003),
        ];

        let hubs = cluster_rail_ferry(&stations, 200.0);

        assert_eq!(hubs.len(), 1);
        let hub = &hubs[0];
        assert!(hub.is_consolidated);
        assert_eq!(hub.id, "consolidated-A-MAIN");
        assert_eq!(hub.name, "MAIN Transit Center");
        assert_eq!(hub.operators.len(), 2);
        assert_eq!(hub.services.as_deref(), Some("Operator A, Operator B"));
        assert_eq!(hub.latitude, 37.0);
        assert_eq!(hub.longitude, -122.0);
    }

    #[test]
    fn test_distant_stations_stay_separate() {
        let stations = vec![
            station("A", OperatorType::Rail, "ONE", 37.0, -122.0),
            station("B", OperatorType::Rail, "TWO", 37.045, -122.0),
        ];

        let hubs = cluster_rail_ferry(&stations, 200.0);

        assert_eq!(hubs, stations);
        assert!(hubs.iter().all(|h| !h.is_consolidated));
    }

    #[test]
    fn test_same_operator_never_merges() {
        let stations = vec![
            station("A", OperatorType::Rail, "ONE", 37.0, -122.0),
            station("A", OperatorType::Rail, "TWO", 37.0001, -122.0),
        ];

        let hubs = cluster_rail_ferry(&stations, 200.0);

        assert_eq!(hubs.len(), 2);
        assert!(hubs.iter().all(|h| !h.is_consolidated));
    }

    #[test]
    fn test_one_member_per_operator() {
        // B has two stations near A's seed; only the first joins.
        let stations = vec![
            station("A", OperatorType::Rail, "SEED", 37.0, -122.0),
            station("B", OperatorType::Rail, "NEAR1", 37.0003, -122.0),
            station("B", OperatorType::Rail, "NEAR2", 37.0006, -122.0),
        ];

        let hubs = cluster_rail_ferry(&stations, 200.0);

        assert_eq!(hubs.len(), 2);
        assert_eq!(hubs[0].operators.len(), 2);
        assert_eq!(hubs[1].id, "B-NEAR2");
        assert!(!hubs[1].is_consolidated);
    }

    #[test]
    fn test_first_seed_claims_contested_station() {
        // C sits between A and B; A is processed first and claims it.
        let stations = vec![
            station("A", OperatorType::Rail, "WEST", 37.0, -122.002),
            station("B", OperatorType::Ferry, "EAST", 37.0, -121.998),
            station("C", OperatorType::Rail, "MID", 37.0, -122.0005),
        ];

        let hubs = cluster_rail_ferry(&stations, 200.0);

        assert_eq!(hubs.len(), 2);
        assert_eq!(hubs[0].id, "consolidated-A-WEST");
        assert!(hubs[0].has_operator("C"));
        assert_eq!(hubs[1].id, "B-EAST");
    }

    #[test]
    fn test_primary_prefers_rail_member() {
        let stations = vec![
            station("F", OperatorType::Ferry, "PIER", 37.0, -122.0),
            station("R", OperatorType::Rail, "DEPOT", 37.0002, -122.0),
        ];

        let hubs = cluster_rail_ferry(&stations, 200.0);

        assert_eq!(hubs[0].primary_type, OperatorType::Rail);
        assert_eq!(hubs[0].primary_color, "#RRR");
        // Geometry and id still come from the ferry seed.
        assert_eq!(hubs[0].id, "consolidated-F-PIER");
        assert_eq!(hubs[0].latitude, 37.0);
    }

    #[test]
    fn test_primary_falls_back_to_seed_without_rail() {
        let stations = vec![
            station("F", OperatorType::Ferry, "PIER", 37.0, -122.0),
            station("G", OperatorType::Ferry, "DOCK", 37.0002, -122.0),
        ];

        let hubs = cluster_rail_ferry(&stations, 200.0);

        assert_eq!(hubs[0].primary_type, OperatorType::Ferry);
        assert_eq!(hubs[0].primary_color, "#FFF");
    }

    #[test]
    fn test_members_are_within_threshold_of_seed() {
        let stations = vec![
            station("A", OperatorType::Rail, "S", 37.0, -122.0),
            station("B", OperatorType::Rail, "T", 37.0015, -122.0),
            station("C", OperatorType::Rail, "U", 37.0, -122.0015),
            station("D", OperatorType::Rail, "V", 37.003, -122.0),
        ];

        let hubs = cluster_rail_ferry(&stations, 200.0);

        for hub in hubs.iter().filter(|h| h.is_consolidated) {
            for op in &hub.operators {
                let member = stations
                    .iter()
                    .find(|s| s.lead_operator().id == op.id)
                    .unwrap();
                let d = haversine_distance(hub.latitude, hub.longitude, member.latitude, member.longitude);
                assert!(d <= 200.0, "{} is {d} m from its hub", member.id);
            }
        }
        assert_eq!(hubs.len(), 2);
        assert_eq!(hubs[1].id, "D-V");
    }

    #[test]
    fn test_colliding_ids_are_both_kept() {
        // "A-B" + "C" and "A" + "B-C" render the same id.
        let stations = vec![
            station("A-B", OperatorType::Rail, "C", 37.0, -122.0),
            station("A", OperatorType::Rail, "B-C", 38.0, -122.0),
        ];
        assert_eq!(stations[0].id, stations[1].id);

        let hubs = cluster_rail_ferry(&stations, 200.0);

        assert_eq!(hubs.len(), 2);
        assert_eq!(hubs[0].latitude, 37.0);
        assert_eq!(hubs[1].latitude, 38.0);
    }

    #[test]
    fn test_colliding_ids_still_merge_when_close() {
        let stations = vec![
            station("A-B", OperatorType::Rail, "C", 37.0, -122.0),
            station("A", OperatorType::Rail, "B-C", 37.0002, -122.0),
        ];

        let hubs = cluster_rail_ferry(&stations, 200.0);

        assert_eq!(hubs.len(), 1);
        assert!(hubs[0].has_operator("A-B"));
        assert!(hubs[0].has_operator("A"));
    }

    #[test]
    fn test_merge_cluster_lists_seed_operator_first() {
        let seed = station("F", OperatorType::Ferry, "PIER", 37.0, -122.0);
        let rail = station("R", OperatorType::Rail, "DEPOT", 37.0002, -122.0);

        let hub = merge_cluster(&seed, &[&rail]);

        assert_eq!(hub.operators[0].id, "F");
        assert_eq!(hub.operators[1].id, "R");
        assert_eq!(hub.primary_type, OperatorType::Rail);
    }

    #[test]
    fn test_empty_input() {
        assert!(cluster_rail_ferry(&[], 200.0).is_empty());
    }
}
