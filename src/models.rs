use chrono::{DateTime, Local};
use serde::Deserialize;

/// A latitude/longitude pair in decimal degrees.
///
/// `(0.0, 0.0)` doubles as the "nothing picked yet" sentinel, see
/// [`Coordinate::is_unset`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const UNSET: Coordinate = Coordinate { lat: 0.0, lng: 0.0 };

    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True only for the exact zero/zero sentinel.
    pub fn is_unset(&self) -> bool {
        self.lat == 0.0 && self.lng == 0.0
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// The location handed to the parent form once an address is known.
#[derive(Debug, Clone, PartialEq)]
pub struct PickedLocation {
    pub lat: f64,
    pub lng: f64,
    pub address: Option<String>,
}

impl PickedLocation {
    pub fn with_address(coord: Coordinate, address: impl Into<String>) -> Self {
        Self {
            lat: coord.lat,
            lng: coord.lng,
            address: Some(address.into()),
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// Payload carried back from the map selection screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapSelection {
    pub picked_lat: f64,
    pub picked_lng: f64,
}

impl From<MapSelection> for Coordinate {
    fn from(sel: MapSelection) -> Self {
        Coordinate::new(sel.picked_lat, sel.picked_lng)
    }
}

/// Screens the host app can navigate between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Route {
    AddPlace(Option<MapSelection>),
    Map,
}

/// Device position as reported by a [`PositionSource`](crate::location::PositionSource).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub coords: Coords,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coords {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<Position> for Coordinate {
    fn from(pos: Position) -> Self {
        Coordinate::new(pos.coords.latitude, pos.coords.longitude)
    }
}

/// A place saved from the "Add Place" form. Kept in memory only.
#[derive(Debug, Clone)]
pub struct Place {
    pub title: String,
    pub location: PickedLocation,
    pub created_at: DateTime<Local>,
}

// Reverse geocoding response, trimmed to what we read.
#[derive(Debug, Deserialize)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
pub struct GeocodeResult {
    pub formatted_address: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_exact_zero_is_unset() {
        assert!(Coordinate::UNSET.is_unset());
        assert!(Coordinate::new(-0.0, 0.0).is_unset());
        assert!(!Coordinate::new(0.0, 0.0001).is_unset());
        assert!(!Coordinate::new(55.75583, 37.6173).is_unset());
    }

    #[test]
    fn coordinate_display_matches_query_format() {
        assert_eq!(Coordinate::new(10.0, 20.0).to_string(), "10,20");
        assert_eq!(Coordinate::new(55.75583, 37.6173).to_string(), "55.75583,37.6173");
        assert_eq!(Coordinate::new(-33.5, 151.25).to_string(), "-33.5,151.25");
    }

    #[test]
    fn geocode_response_tolerates_missing_fields() {
        let res: GeocodeResponse = serde_json::from_str(r#"{"results": []}"#).unwrap();
        assert!(res.status.is_none());
        assert!(res.results.is_empty());

        let res: GeocodeResponse = serde_json::from_str(
            r#"{"status": "OK", "results": [{"formatted_address": "X", "place_id": "abc"}]}"#,
        )
        .unwrap();
        assert_eq!(res.results[0].formatted_address, "X");
    }
}
