//! Device camera session.
//!
//! The torch is a property of a camera track, so switching it requires an
//! open rear-facing track. [`CameraSession`] owns at most one such track and
//! refuses to keep one whose hardware cannot drive a torch.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

/// A failure reported by the platform capture backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    /// The user or the system refused access to the camera.
    #[error("camera access not allowed: {0}")]
    NotAllowed(String),

    /// Any other backend failure.
    #[error("{0}")]
    Failed(String),
}

/// Which way the requested camera points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    /// The rear camera, next to the flash LED.
    #[default]
    Environment,
    /// The front camera.
    User,
}

/// Hardware capabilities reported for an open track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackCapabilities {
    /// The track can switch the flash LED on continuously.
    pub torch: bool,
}

/// An open video track.
#[async_trait]
pub trait VideoTrack: Send {
    /// Human-readable track label, for logs.
    fn label(&self) -> String;

    /// Capability metadata for this track.
    fn capabilities(&self) -> TrackCapabilities;

    /// Apply the torch constraint.
    ///
    /// # Errors
    ///
    /// Returns an error if the hardware rejects the constraint.
    async fn apply_torch(&mut self, on: bool) -> Result<(), MediaError>;

    /// Stop the track and free the hardware.
    fn stop(&mut self);
}

/// Platform media-capture API.
#[async_trait]
pub trait MediaCapture: Send {
    /// The track type this backend hands out.
    type Track: VideoTrack + std::fmt::Debug;

    /// Open a video track from the camera facing `facing`.
    ///
    /// The first call may trigger an OS permission prompt.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::NotAllowed`] on denial, [`MediaError::Failed`]
    /// otherwise.
    async fn open_video(&mut self, facing: FacingMode) -> Result<Self::Track, MediaError>;
}

/// A hardware capability the session needs but the device lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// The camera has no controllable flash LED.
    #[error("camera does not support torch")]
    NoTorch,
}

/// Errors that abort camera acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    /// Camera permission was refused.
    #[error("camera permission denied")]
    PermissionDenied,

    /// The camera lacks a required capability.
    #[error("capability unsupported: {0}")]
    CapabilityUnsupported(#[from] CapabilityError),

    /// Any other acquisition failure.
    #[error("camera acquisition failed: {0}")]
    AcquisitionFailed(String),
}

impl From<MediaError> for CameraError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::NotAllowed(_) => Self::PermissionDenied,
            MediaError::Failed(message) => Self::AcquisitionFailed(message),
        }
    }
}

impl CameraError {
    /// The message shown on the error banner.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::PermissionDenied => {
                "Unable to access camera: permission denied. The flashlight needs camera permission."
                    .to_string()
            }
            Self::CapabilityUnsupported(CapabilityError::NoTorch) => {
                "Your device (camera) does not support the flashlight.".to_string()
            }
            Self::AcquisitionFailed(message) => format!("Unable to access camera: {message}"),
        }
    }
}

/// Owns the single active camera track, if any.
#[derive(Debug)]
pub struct CameraSession<M: MediaCapture> {
    media: M,
    track: Option<M::Track>,
}

impl<M: MediaCapture> CameraSession<M> {
    /// Create an idle session over a capture backend.
    #[must_use]
    pub fn new(media: M) -> Self {
        Self { media, track: None }
    }

    /// Whether a track is currently held.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.track.is_some()
    }

    /// The capture backend.
    #[must_use]
    pub fn media(&self) -> &M {
        &self.media
    }

    /// Return the active track, opening the rear camera if none is held.
    ///
    /// A track without torch support is stopped again before failing, so no
    /// half-acquired session survives an error.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError`] if the camera cannot be opened or has no torch.
    pub async fn acquire(&mut self) -> Result<&mut M::Track, CameraError> {
        let track = match self.track.take() {
            Some(track) => track,
            None => self.open_track().await?,
        };
        Ok(self.track.insert(track))
    }

    async fn open_track(&mut self) -> Result<M::Track, CameraError> {
        let mut track = self
            .media
            .open_video(FacingMode::Environment)
            .await
            .map_err(|e| {
                warn!(error = %e, "Camera open failed");
                CameraError::from(e)
            })?;

        if !track.capabilities().torch {
            warn!(track = %track.label(), "Camera has no torch, releasing it");
            track.stop();
            return Err(CapabilityError::NoTorch.into());
        }

        debug!(track = %track.label(), "Camera session acquired");
        Ok(track)
    }

    /// Stop and drop the active track. Safe to call when idle.
    pub fn release(&mut self) {
        if let Some(mut track) = self.track.take() {
            debug!(track = %track.label(), "Releasing camera session");
            track.stop();
        }
    }
}
