//! Torch controller.
//!
//! Applies on/off requests to the camera session's flash LED and keeps a
//! best-effort record of what the LED was last told.

use thiserror::Error;
use tracing::{debug, warn};

use crate::camera::{CameraError, CameraSession, MediaCapture, VideoTrack};

/// Errors from a torch request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TorchError {
    /// The camera session could not be acquired; nothing was applied.
    #[error(transparent)]
    Camera(#[from] CameraError),

    /// The hardware rejected the torch constraint.
    #[error("torch constraint rejected: {0}")]
    ApplyFailed(String),
}

impl TorchError {
    /// Whether this is a tolerated, post-acquisition hardware hiccup.
    #[must_use]
    pub fn is_apply_failure(&self) -> bool {
        matches!(self, Self::ApplyFailed(_))
    }

    /// The message shown on the error banner.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Camera(e) => e.user_message(),
            Self::ApplyFailed(message) => format!("Torch did not respond: {message}"),
        }
    }
}

/// Stateful wrapper around the shared camera session.
#[derive(Debug)]
pub struct TorchController<M: MediaCapture> {
    session: CameraSession<M>,
    lit: bool,
}

impl<M: MediaCapture> TorchController<M> {
    /// Create a controller with the torch assumed off.
    #[must_use]
    pub fn new(session: CameraSession<M>) -> Self {
        Self {
            session,
            lit: false,
        }
    }

    /// Last state the hardware acknowledged.
    ///
    /// This can lag the physical LED when an apply fails.
    #[must_use]
    pub fn is_lit(&self) -> bool {
        self.lit
    }

    /// Whether a camera session is currently held.
    #[must_use]
    pub fn has_session(&self) -> bool {
        self.session.is_active()
    }

    /// The underlying camera session.
    #[must_use]
    pub fn session(&self) -> &CameraSession<M> {
        &self.session
    }

    /// Make sure a camera session is held, without touching the torch.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError`] if acquisition fails.
    pub async fn ensure_session(&mut self) -> Result<(), CameraError> {
        self.session.acquire().await.map(|_| ())
    }

    /// Switch the torch, acquiring the camera first if needed.
    ///
    /// # Errors
    ///
    /// Returns [`TorchError::Camera`] if acquisition fails, in which case no
    /// torch change is attempted, or [`TorchError::ApplyFailed`] if the
    /// hardware rejects the request.
    pub async fn set_torch(&mut self, on: bool) -> Result<(), TorchError> {
        let track = self.session.acquire().await?;
        track
            .apply_torch(on)
            .await
            .map_err(|e| TorchError::ApplyFailed(e.to_string()))?;
        self.lit = on;
        Ok(())
    }

    /// Switch the torch, logging apply failures instead of returning them.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError`] only when acquisition fails.
    pub async fn set_torch_tolerant(&mut self, on: bool) -> Result<(), CameraError> {
        match self.set_torch(on).await {
            Ok(()) => Ok(()),
            Err(TorchError::ApplyFailed(message)) => {
                warn!(on, error = %message, "Torch apply failed, continuing");
                Ok(())
            }
            Err(TorchError::Camera(e)) => Err(e),
        }
    }

    /// Turn the torch off if a session is held. Never acquires a camera.
    pub async fn force_off(&mut self) {
        if !self.session.is_active() {
            self.lit = false;
            return;
        }
        if let Err(e) = self.set_torch_tolerant(false).await {
            warn!(error = %e, "Could not switch torch off");
        }
    }

    /// Release the camera session; the torch goes dark with it.
    pub fn release(&mut self) {
        if self.session.is_active() {
            debug!("Torch controller releasing camera");
        }
        self.session.release();
        self.lit = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::fakes::FakeCapture;
    use crate::camera::{CapabilityError, MediaError};

    fn controller(fake: &FakeCapture) -> TorchController<FakeCapture> {
        TorchController::new(CameraSession::new(fake.clone()))
    }

    #[tokio::test]
    async fn test_set_torch_acquires_and_applies() {
        let fake = FakeCapture::with_torch();
        let mut torch = controller(&fake);

        torch.set_torch(true).await.unwrap();

        assert!(torch.is_lit());
        assert!(torch.has_session());
        let events: Vec<bool> = fake.torch_events().into_iter().map(|(_, on)| on).collect();
        assert_eq!(events, vec![true]);
    }

    #[tokio::test]
    async fn test_acquisition_failure_skips_apply() {
        let fake = FakeCapture::without_torch();
        let mut torch = controller(&fake);

        let err = torch.set_torch(true).await.unwrap_err();

        assert_eq!(
            err,
            TorchError::Camera(CameraError::CapabilityUnsupported(CapabilityError::NoTorch))
        );
        assert!(fake.torch_events().is_empty());
        assert!(!torch.has_session());
        assert!(!torch.is_lit());
    }

    #[tokio::test]
    async fn test_apply_failure_is_reported() {
        let fake = FakeCapture::with_torch();
        fake.reject_applies(&[true]);
        let mut torch = controller(&fake);

        let err = torch.set_torch(true).await.unwrap_err();

        assert!(err.is_apply_failure());
        assert!(!torch.is_lit());
        assert!(torch.has_session());
    }

    #[tokio::test]
    async fn test_tolerant_swallows_apply_failure_only() {
        let fake = FakeCapture::with_torch();
        fake.reject_applies(&[true]);
        let mut torch = controller(&fake);
        assert!(torch.set_torch_tolerant(true).await.is_ok());

        let denied = FakeCapture::failing(MediaError::NotAllowed("no".to_string()));
        let mut torch = controller(&denied);
        assert_eq!(
            torch.set_torch_tolerant(true).await.unwrap_err(),
            CameraError::PermissionDenied
        );
    }

    #[tokio::test]
    async fn test_force_off_never_acquires() {
        let fake = FakeCapture::with_torch();
        let mut torch = controller(&fake);

        torch.force_off().await;

        assert_eq!(fake.opens(), 0);
        assert!(fake.torch_events().is_empty());
    }

    #[tokio::test]
    async fn test_release_resets_state() {
        let fake = FakeCapture::with_torch();
        let mut torch = controller(&fake);
        torch.set_torch(true).await.unwrap();

        torch.release();

        assert!(!torch.is_lit());
        assert!(!torch.has_session());
        assert_eq!(fake.live_tracks(), 0);
    }

    #[test]
    fn test_user_message() {
        let err = TorchError::ApplyFailed("busy".to_string());
        assert_eq!(err.user_message(), "Torch did not respond: busy");
    }
}
