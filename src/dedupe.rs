//! Platform deduplication.
//!
//! An operator feed lists platforms, not stations. Platforms sharing a
//! parent-station id collapse into one [`Station`]; the first record seen
//! for a key supplies the name and coordinates.

use std::collections::HashSet;

use tracing::debug;

use crate::model::{OperatorFeed, Station};
use crate::naming::NameCleaner;

/// Collapses an operator's platform-level stops into one station per
/// `parent_station_id` (or `stop_id` when there is no parent).
///
/// Stops without a usable location are skipped before they can claim a key,
/// so a later platform of the same station with valid coordinates still wins.
/// Output order follows first appearance in the feed.
pub fn dedupe_platforms<C: NameCleaner + ?Sized>(feed: &OperatorFeed, cleaner: &C) -> Vec<Station> {
    let operator = &feed.operator;
    let mut seen: HashSet<&str> = HashSet::new();
    let mut stations = Vec::new();
    let mut without_location = 0usize;

    for stop in &feed.stops {
        if !stop.has_location() {
            without_location += 1;
            continue;
        }

        let key = stop.station_key();
        if !seen.insert(key) {
            continue;
        }

        let name = cleaner.clean(&stop.raw_name, &operator.name);
        stations.push(Station::for_operator(
            operator,
            key,
            name,
            stop.latitude,
            stop.longitude,
        ));
    }

    debug!(
        operator_id = %operator.id,
        stops = feed.stops.len(),
        stations = stations.len(),
        without_location,
        "Platforms deduplicated"
    );

    stations
}
