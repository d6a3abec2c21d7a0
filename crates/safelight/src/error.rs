//! Error types for safelight.
//!
//! Each hardware-facing module owns a narrow error enum; this module gathers
//! them into the crate-level [`Error`] used at the coordinator and CLI edges.

use thiserror::Error;

use crate::camera::CameraError;
use crate::location::LocationError;
use crate::siren::PlaybackError;

/// The main error type for safelight operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Device Errors ===
    /// Camera acquisition failed.
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),

    /// Siren playback failed.
    #[error("siren error: {0}")]
    Playback(#[from] PlaybackError),

    /// Location lookup failed.
    #[error("location error: {0}")]
    Location(#[from] LocationError),

    // === Platform Errors ===
    /// Platform-specific operation failed.
    #[error("platform error: {0}")]
    Platform(String),
}

/// A specialized Result type for safelight operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new platform error.
    #[must_use]
    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform(message.into())
    }

    /// The message shown on the error banner.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Camera(e) => e.user_message(),
            Self::Playback(e) => e.user_message(),
            Self::Location(e) => e.user_message().to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CapabilityError;

    #[test]
    fn test_error_display() {
        let err = Error::platform("test error");
        assert_eq!(err.to_string(), "platform error: test error");
    }

    #[test]
    fn test_user_message_delegates() {
        let no_torch = CameraError::from(CapabilityError::NoTorch);
        let err = Error::from(no_torch.clone());
        assert_eq!(err.user_message(), no_torch.user_message());

        let err = Error::from(LocationError::Timeout);
        assert!(err.user_message().contains("timed out"));

        let err = Error::platform("no sysfs");
        assert_eq!(err.user_message(), "platform error: no sysfs");
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "timeout_ms must be greater than 0".to_string(),
        };
        assert!(err.to_string().contains("timeout_ms"));
    }

    #[test]
    fn test_playback_error_display() {
        let err = Error::from(PlaybackError::Failed("no such file".to_string()));
        assert!(err.to_string().contains("no such file"));
    }
}
