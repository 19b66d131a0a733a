//! Device position for the picker's "Locate User" action.
//!
//! A terminal has no GPS, so the default [`IpPositionSource`] approximates
//! the device position via IP geolocation (IpApi). [`FixedPositionSource`]
//! reports a configured coordinate instead, which is handy on machines
//! behind VPNs or without network access to ip-api.com.

use ipgeolocate::{Locator, Service};
use std::future::Future;
use tracing::{error, info};

use crate::config::{LocationConfig, PositionSourceKind};
use crate::error::LocationError;
use crate::models::{Coords, Position};

pub trait PositionSource {
    fn current_position(&self) -> impl Future<Output = Result<Position, LocationError>> + Send;
}

/// Approximates the device position from the public IP address the
/// request comes from.
#[derive(Debug, Default, Clone, Copy)]
pub struct IpPositionSource;

impl PositionSource for IpPositionSource {
    async fn current_position(&self) -> Result<Position, LocationError> {
        let loc = Locator::get("", Service::IpApi).await.map_err(|e| {
            error!("Error using geolocation service: {}", e);
            LocationError::Unavailable(e.to_string())
        })?;

        let position = parse_position(&loc.latitude, &loc.longitude)?;
        info!(
            "Geolocation successful - ({}, {})",
            position.coords.latitude, position.coords.longitude
        );
        Ok(position)
    }
}

/// Always reports the same coordinate.
#[derive(Debug, Clone, Copy)]
pub struct FixedPositionSource {
    position: Position,
}

impl FixedPositionSource {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            position: Position {
                coords: Coords {
                    latitude,
                    longitude,
                },
            },
        }
    }
}

impl PositionSource for FixedPositionSource {
    async fn current_position(&self) -> Result<Position, LocationError> {
        Ok(self.position)
    }
}

/// Whichever source config.toml asks for.
#[derive(Debug, Clone)]
pub enum DevicePosition {
    Ip(IpPositionSource),
    Fixed(FixedPositionSource),
}

impl DevicePosition {
    pub fn from_config(config: &LocationConfig) -> Self {
        match config.source {
            PositionSourceKind::Ip => DevicePosition::Ip(IpPositionSource),
            PositionSourceKind::Fixed => {
                DevicePosition::Fixed(FixedPositionSource::new(config.fixed_lat, config.fixed_lng))
            }
        }
    }
}

impl PositionSource for DevicePosition {
    async fn current_position(&self) -> Result<Position, LocationError> {
        match self {
            DevicePosition::Ip(source) => source.current_position().await,
            DevicePosition::Fixed(source) => source.current_position().await,
        }
    }
}

fn parse_position(lat: &str, lon: &str) -> Result<Position, LocationError> {
    let latitude = lat
        .trim()
        .parse::<f64>()
        .map_err(|_| LocationError::InvalidCoordinate(format!("latitude {:?}", lat)))?;
    let longitude = lon
        .trim()
        .parse::<f64>()
        .map_err(|_| LocationError::InvalidCoordinate(format!("longitude {:?}", lon)))?;
    Ok(Position {
        coords: Coords {
            latitude,
            longitude,
        },
    })
}
