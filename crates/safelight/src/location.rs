//! One-shot geolocation lookup.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Options for a position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationRequest {
    /// Prefer GPS-grade accuracy over a fast answer.
    pub high_accuracy: bool,
    /// Give up after this long.
    pub timeout: Duration,
    /// Accept a cached fix no older than this.
    pub maximum_age: Duration,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::ZERO,
        }
    }
}

/// A position fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Degrees north.
    pub latitude: f64,
    /// Degrees east.
    pub longitude: f64,
    /// Radius of uncertainty in meters.
    pub accuracy_m: f64,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Latitude: {:.5}\nLongitude: {:.5}\n(Accuracy: {:.1}m)",
            self.latitude, self.longitude, self.accuracy_m
        )
    }
}

/// Why a position could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// No location provider on this device.
    #[error("geolocation unsupported")]
    Unsupported,

    /// Location permission was refused.
    #[error("location permission denied")]
    PermissionDenied,

    /// The provider has no fix.
    #[error("position unavailable")]
    PositionUnavailable,

    /// The request did not finish in time.
    #[error("location request timed out")]
    Timeout,

    /// Anything else the provider reported.
    #[error("unknown location error: {0}")]
    Unknown(String),
}

impl LocationError {
    /// The message shown on the error banner.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Unsupported => "Your device does not support geolocation.",
            Self::PermissionDenied => "Unable to get location: permission denied.",
            Self::PositionUnavailable => "Unable to get location: position unavailable.",
            Self::Timeout => "Unable to get location: request timed out.",
            Self::Unknown(_) => "Unable to get location: unknown error.",
        }
    }
}

/// A source of position fixes.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Produce one position fix.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError`] if no fix can be produced.
    async fn current_position(&self, request: &LocationRequest)
        -> Result<Position, LocationError>;
}

/// Ask `provider` for a fix, bounded by the request timeout.
///
/// # Errors
///
/// Returns the provider's error, or [`LocationError::Timeout`] if it does not
/// answer in time.
pub async fn locate<P>(provider: &P, request: &LocationRequest) -> Result<Position, LocationError>
where
    P: LocationProvider + ?Sized,
{
    debug!(
        high_accuracy = request.high_accuracy,
        timeout_ms = request.timeout.as_millis(),
        "Requesting position"
    );
    tokio::time::timeout(request.timeout, provider.current_position(request))
        .await
        .unwrap_or(Err(LocationError::Timeout))
}

/// Serves a fixed, configured position.
#[derive(Debug, Clone, Default)]
pub struct StaticLocationProvider {
    fix: Option<Position>,
}

impl StaticLocationProvider {
    /// Create a provider answering with `fix`, or unavailable when `None`.
    #[must_use]
    pub fn new(fix: Option<Position>) -> Self {
        Self { fix }
    }
}

#[async_trait]
impl LocationProvider for StaticLocationProvider {
    async fn current_position(
        &self,
        _request: &LocationRequest,
    ) -> Result<Position, LocationError> {
        self.fix.ok_or(LocationError::PositionUnavailable)
    }
}
