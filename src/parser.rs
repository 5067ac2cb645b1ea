//! CSV parser for GTFS `stops.txt` feeds.

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::model::RawStop;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Deserialize)]
struct StopRow {
    stop_id: String,
    #[serde(default)]
    stop_name: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    stop_lat: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    stop_lon: Option<f64>,
    #[serde(default)]
    parent_station: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    location_type: Option<u8>,
}

impl StopRow {
    /// 0 = stop/platform, 1 = station. Entrances, generic nodes and boarding
    /// areas are not places a rider waits.
    fn is_stop_or_station(&self) -> bool {
        matches!(self.location_type, None | Some(0) | Some(1))
    }

    fn into_raw_stop(self) -> RawStop {
        // A half-known position is no position: both become (0, 0), the
        // feed-wide "no location" marker.
        let (latitude, longitude) = match (self.stop_lat, self.stop_lon) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => (0.0, 0.0),
        };

        RawStop {
            stop_id: self.stop_id,
            parent_station_id: self.parent_station.filter(|p| !p.is_empty()),
            raw_name: self.stop_name,
            latitude,
            longitude,
        }
    }
}

/// Decodes a GTFS `stops.txt` body into [`RawStop`]s, in file order.
///
/// Unknown columns are ignored and malformed rows are skipped with a warning.
///
/// # Errors
///
/// Returns an error if the header row cannot be read or lacks `stop_id`.
pub fn parse_stops(bytes: &[u8]) -> Result<Vec<RawStop>> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers().context("Failed to read stops header")?.clone();
    if !headers.iter().any(|h| h == "stop_id") {
        anyhow::bail!("stops feed has no stop_id column");
    }

    let mut stops = Vec::new();
    let mut skipped_rows = 0usize;

    for (row_idx, result) in reader.deserialize::<StopRow>().enumerate() {
        match result {
            Ok(row) if row.stop_id.is_empty() => skipped_rows += 1,
            Ok(row) if !row.is_stop_or_station() => {}
            Ok(row) => stops.push(row.into_raw_stop()),
            Err(e) => {
                warn!(row = row_idx + 2, error = %e, "Skipping malformed stop row");
                skipped_rows += 1;
            }
        }
    }

    debug!(stops = stops.len(), skipped_rows, "Stops parsed");
    Ok(stops)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_stops() {
        let body = b"stop_id,stop_name,stop_lat,stop_lon\n\
                     EMBR,Embarcadero,37.7929,-122.3971\n";

        let stops = parse_stops(body).unwrap();

        assert_eq!(stops.len(), 1);
        assert_eq!(stops[0].stop_id, "EMBR");
        assert_eq!(stops[0].raw_name, "Embarcadero");
        assert_eq!(stops[0].parent_station_id, None);
        assert_eq!(stops[0].latitude, 37.7929);
    }

    #[test]
    fn test_parse_parent_station_and_extra_columns() {
        let body = b"stop_id,stop_code,stop_name,stop_lat,stop_lon,location_type,parent_station,wheelchair_boarding\n\
                     MAIN,,Main St,37.7,-122.4,1,,1\n\
                     MAIN-1,101,Main St Platform 1,37.70001,-122.40001,0,MAIN,1\n";

        let stops = parse_stops(body).unwrap();

        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].station_key(), "MAIN");
        assert_eq!(stops[1].parent_station_id.as_deref(), Some("MAIN"));
        assert_eq!(stops[1].station_key(), "MAIN");
    }

    #[test]
    fn test_parse_drops_entrances_and_boarding_areas() {
        let body = b"stop_id,stop_name,stop_lat,stop_lon,location_type,parent_station\n\
                     P1,Platform,37.7,-122.4,0,S1\n\
                     E1,Entrance,37.7,-122.4,2,S1\n\
                     N1,Node,37.7,-122.4,3,S1\n\
                     B1,Boarding,37.7,-122.4,4,P1\n";

        let stops = parse_stops(body).unwrap();

        assert_eq!(stops.len(), 1);
        assert_eq!(stops[0].stop_id, "P1");
    }

    #[test]
    fn test_missing_or_bad_coordinates_become_no_location() {
        let body = b"stop_id,stop_name,stop_lat,stop_lon\n\
                     A,Nowhere,,\n\
                     B,Garbled,abc,-122.4\n";

        let stops = parse_stops(body).unwrap();

        assert_eq!(stops.len(), 2);
        assert!(stops.iter().all(|s| !s.has_location()));
        assert_eq!((stops[1].latitude, stops[1].longitude), (0.0, 0.0));
    }

    #[test]
    fn test_parse_strips_bom_and_whitespace() {
        let mut body = UTF8_BOM.to_vec();
        body.extend_from_slice(b"stop_id, stop_name ,stop_lat,stop_lon\n X1 , Ferry Building ,37.79,-122.39\n");

        let stops = parse_stops(&body).unwrap();

        assert_eq!(stops[0].stop_id, "X1");
        assert_eq!(stops[0].raw_name, "Ferry Building");
    }

    #[test]
    fn test_parse_without_stop_id_column_fails() {
        let body = b"id,name\n1,Foo\n";
        assert!(parse_stops(body).is_err());
    }

    #[test]
    fn test_parse_empty_body_yields_no_stops() {
        // No header at all: nothing to read, and no stop_id column.
        assert!(parse_stops(b"").is_err());

        let stops = parse_stops(b"stop_id,stop_name,stop_lat,stop_lon\n").unwrap();
        assert!(stops.is_empty());
    }
}
