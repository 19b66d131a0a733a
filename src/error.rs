//! Typed errors for the geo utilities, device location and permissions.
//!
//! The binary wraps all of these in `color_eyre::Report` at the top level.

use thiserror::Error;

/// Errors from the reverse-geocoding lookup.
#[derive(Debug, Error)]
pub enum GeoError {
    /// The geocoding endpoint answered with a non-success HTTP status.
    #[error("failed to fetch address: HTTP {status}")]
    Lookup { status: reqwest::StatusCode },
    /// The lookup succeeded but returned no addresses for the coordinate.
    #[error("no address found for this location")]
    NoResults,
    /// The service rejected the request (e.g. `REQUEST_DENIED`).
    #[error("geocoding service returned {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Service {
        status: String,
        message: Option<String>,
    },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("location not available: {0}")]
    Unavailable(String),
    #[error("invalid coordinate in position report: {0}")]
    InvalidCoordinate(String),
}

#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("permission prompt unavailable")]
    Unavailable,
}
