//! Google Maps helpers: static preview URLs and reverse geocoding.

use crate::config::MapsConfig;
use crate::error::GeoError;
use crate::models::{Coordinate, GeocodeResponse};
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Anything that can turn a coordinate into a human readable address.
pub trait AddressLookup {
    fn resolve_address(&self, coord: Coordinate)
        -> impl Future<Output = Result<String, GeoError>> + Send;
}

/// Builds the static map image URL for a coordinate.
///
/// Pure formatting: coordinates are not range checked, so out of range
/// values end up in the URL as given.
pub fn build_preview_url(config: &MapsConfig, coord: Coordinate) -> String {
    format!(
        "{}?center={coord}&zoom=14&size=400x200&maptype=roadmap&markers=color:red%7Clabel:S%7C{coord}&key={}",
        config.static_map_url, config.api_key
    )
}

pub struct MapsClient {
    client: Client,
    config: MapsConfig,
}

impl MapsClient {
    pub fn new(config: MapsConfig) -> Result<Self, GeoError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { client, config })
    }

    fn geocode_url(&self, coord: Coordinate) -> String {
        format!(
            "{}?latlng={coord}&key={}",
            self.config.geocode_url, self.config.api_key
        )
    }
}

impl AddressLookup for MapsClient {
    async fn resolve_address(&self, coord: Coordinate) -> Result<String, GeoError> {
        debug!("Reverse geocoding {}", coord);
        let res = self.client.get(self.geocode_url(coord)).send().await?;

        if !res.status().is_success() {
            warn!("Geocoding request for {} failed with {}", coord, res.status());
            return Err(GeoError::Lookup {
                status: res.status(),
            });
        }

        let body = res.json::<GeocodeResponse>().await?;
        first_address(body)
    }
}

fn first_address(body: GeocodeResponse) -> Result<String, GeoError> {
    match body.status.as_deref() {
        None | Some("OK") | Some("ZERO_RESULTS") => {}
        Some(status) => {
            return Err(GeoError::Service {
                status: status.to_string(),
                message: body.error_message,
            })
        }
    }

    body.results
        .into_iter()
        .next()
        .map(|r| r.formatted_address)
        .ok_or(GeoError::NoResults)
}
