//! Folding bus operators into the rail/ferry hubs they serve.

use tracing::debug;

use crate::distance::station_distance;
use crate::model::{OperatorType, Station};

/// Appends every bus operator with a stop within `bus_threshold_m` of a hub
/// to that hub's operator list, once per operator.
///
/// Hub geometry, type and color are left alone, and `buses` is only read: a
/// matched bus stop stays in the output as its own station. Returns the number
/// of operator entries added across all hubs.
pub fn affiliate_buses(hubs: &mut [Station], buses: &[Station], bus_threshold_m: f64) -> usize {
    let mut added = 0;

    for hub in hubs.iter_mut() {
        for bus in buses {
            let bus_operator = bus.lead_operator();
            if hub.has_operator(&bus_operator.id) {
                continue;
            }
            if station_distance(hub, bus) <= bus_threshold_m {
                debug!(
                    hub = %hub.id,
                    bus_stop = %bus.id,
                    operator_id = %bus_operator.id,
                    "Bus operator affiliated with hub"
                );
                let mut entry = bus_operator.clone();
                entry.kind = OperatorType::Bus;
                hub.operators.push(entry);
                added += 1;
            }
        }
    }

    added
}
