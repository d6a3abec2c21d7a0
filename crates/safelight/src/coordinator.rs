//! Mode coordinator.
//!
//! Flashlight and SOS share one camera session and one torch, and at most one
//! of them is logically on. The siren is independent of both. All of it lives
//! in one owned [`AppSessionState`] driven from a single task: user intents
//! and SOS timer expiries are taken one at a time, and each handler runs to
//! completion before the next is looked at. Location lookups are the one
//! slow request; they run in their own task and report back on a channel.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::camera::{CameraError, CameraSession, MediaCapture};
use crate::error::Error;
use crate::location::{locate, LocationError, LocationProvider, LocationRequest, Position};
use crate::panel::{ErrorSurface, PanelSnapshot};
use crate::siren::{AudioOutput, PlaybackError, Siren};
use crate::sos::{SosSequencer, SosTimer};
use crate::torch::{TorchController, TorchError};

/// Something the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Look up the current position.
    Locate,
    /// Toggle the flashlight.
    ToggleFlashlight,
    /// Toggle the SOS light signal.
    ToggleSos,
    /// Toggle the siren.
    ToggleSiren,
    /// Turn everything off and leave the event loop.
    Shutdown,
}

/// All mutable state of a session.
#[derive(Debug)]
pub struct AppSessionState<M: MediaCapture, A> {
    torch: TorchController<M>,
    sos: SosSequencer,
    flashlight_on: bool,
    siren: Siren<A>,
    errors: ErrorSurface,
    coordinates: Option<String>,
    locating: bool,
}

impl<M: MediaCapture, A: AudioOutput> AppSessionState<M, A> {
    /// Fresh state: everything off, no camera held.
    #[must_use]
    pub fn new(media: M, audio: A) -> Self {
        Self {
            torch: TorchController::new(CameraSession::new(media)),
            sos: SosSequencer::new(),
            flashlight_on: false,
            siren: Siren::new(audio),
            errors: ErrorSurface::default(),
            coordinates: None,
            locating: false,
        }
    }

    /// Whether flashlight mode is on.
    #[must_use]
    pub fn flashlight_on(&self) -> bool {
        self.flashlight_on
    }

    /// The SOS sequencer.
    #[must_use]
    pub fn sos(&self) -> &SosSequencer {
        &self.sos
    }

    /// The torch controller.
    #[must_use]
    pub fn torch(&self) -> &TorchController<M> {
        &self.torch
    }

    /// Whether the siren is sounding.
    #[must_use]
    pub fn siren_on(&self) -> bool {
        self.siren.is_on()
    }

    /// The error banner.
    #[must_use]
    pub fn errors(&self) -> &ErrorSurface {
        &self.errors
    }

    /// Copy out what the UI renders.
    #[must_use]
    pub fn snapshot(&self) -> PanelSnapshot {
        PanelSnapshot {
            flashlight_on: self.flashlight_on,
            sos_running: self.sos.is_running(),
            sos_cycles: self.sos.cycles_completed(),
            siren_on: self.siren.is_on(),
            locating: self.locating,
            coordinates: self.coordinates.clone(),
            error: self.errors.message().map(str::to_string),
        }
    }
}

/// Maps intents onto the torch, the SOS sequencer and the siren.
#[derive(Debug)]
pub struct ModeCoordinator<M: MediaCapture, A, L> {
    state: AppSessionState<M, A>,
    location: Arc<L>,
    location_request: LocationRequest,
    fix_tx: mpsc::Sender<LocationFix>,
    fixes: mpsc::Receiver<LocationFix>,
    panel: watch::Sender<PanelSnapshot>,
}

type LocationFix = Result<Position, LocationError>;

impl<M, A, L> ModeCoordinator<M, A, L>
where
    M: MediaCapture,
    A: AudioOutput,
    L: LocationProvider + 'static,
{
    /// Create a coordinator with everything off.
    #[must_use]
    pub fn new(media: M, audio: A, location: L, location_request: LocationRequest) -> Self {
        let state = AppSessionState::new(media, audio);
        let (panel, _) = watch::channel(state.snapshot());
        let (fix_tx, fixes) = mpsc::channel(1);
        Self {
            state,
            location: Arc::new(location),
            location_request,
            fix_tx,
            fixes,
            panel,
        }
    }

    /// Session state, for inspection.
    #[must_use]
    pub fn state(&self) -> &AppSessionState<M, A> {
        &self.state
    }

    /// Subscribe to panel updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PanelSnapshot> {
        self.panel.subscribe()
    }

    fn publish(&self) {
        self.panel.send_replace(self.state.snapshot());
    }

    /// Toggle the flashlight.
    ///
    /// A running SOS signal is stopped first, cancelling its pending step
    /// before any flashlight torch request is made. Turning on keeps the flag
    /// set even if the hardware rejects the torch constraint; only a failed
    /// camera acquisition leaves it off.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError`] if the camera cannot be acquired.
    pub async fn activate_flashlight(&mut self) -> Result<(), CameraError> {
        let state = &mut self.state;
        if state.sos.is_running() {
            debug!("Flashlight overrides SOS");
            state.sos.stop(&mut state.torch).await;
        }

        if state.flashlight_on {
            state.torch.force_off().await;
            state.flashlight_on = false;
            state.torch.release();
            info!("Flashlight off");
            return Ok(());
        }

        match state.torch.set_torch(true).await {
            Ok(()) => {}
            Err(TorchError::ApplyFailed(message)) => {
                warn!(error = %message, "Torch did not confirm, keeping flashlight on");
            }
            Err(TorchError::Camera(e)) => return Err(e),
        }
        state.flashlight_on = state.torch.has_session();
        info!("Flashlight on");
        Ok(())
    }

    /// Toggle the SOS signal.
    ///
    /// Flashlight mode is switched off first, best effort.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError`] if starting needs a camera that cannot be
    /// acquired; SOS then stays off.
    pub async fn activate_sos(&mut self) -> Result<(), CameraError> {
        let state = &mut self.state;
        if state.flashlight_on {
            debug!("SOS overrides flashlight");
            state.flashlight_on = false;
            state.torch.force_off().await;
        }

        if state.sos.is_running() {
            state.sos.stop(&mut state.torch).await;
            info!("SOS off");
            return Ok(());
        }

        state.sos.start(&mut state.torch).await?;
        info!("SOS on");
        Ok(())
    }

    /// Toggle the siren.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError`] if playback cannot start; the siren is then
    /// off.
    pub async fn activate_siren(&mut self) -> Result<(), PlaybackError> {
        let on = self.state.siren.toggle().await?;
        info!(on, "Siren toggled");
        Ok(())
    }

    /// Start a position lookup in the background.
    ///
    /// The lookup runs in its own task so SOS steps and other intents keep
    /// flowing while it is pending; [`Self::run`] picks up the answer. A
    /// request while one is already pending is ignored.
    pub fn request_location(&mut self) {
        if self.state.locating {
            debug!("Location lookup already pending");
            return;
        }
        self.state.locating = true;

        let provider = Arc::clone(&self.location);
        let request = self.location_request;
        let fix_tx = self.fix_tx.clone();
        tokio::spawn(async move {
            let fix = locate(provider.as_ref(), &request).await;
            // the coordinator may have shut down meanwhile
            let _ = fix_tx.send(fix).await;
        });
    }

    /// Show the outcome of a finished lookup and publish it.
    pub fn finish_location(&mut self, fix: LocationFix) {
        self.state.locating = false;
        match fix {
            Ok(position) => {
                debug!(
                    latitude = position.latitude,
                    longitude = position.longitude,
                    "Position fixed"
                );
                self.state.coordinates = Some(position.to_string());
            }
            Err(e) => {
                error!(error = %e, "Location lookup failed");
                self.state.errors.show(Error::from(e).user_message());
            }
        }
        self.publish();
    }

    /// Wait for the pending lookup to finish and show its outcome. Returns
    /// `false` if no lookup was pending.
    pub async fn await_location(&mut self) -> bool {
        if !self.state.locating {
            return false;
        }
        match self.fixes.recv().await {
            Some(fix) => {
                self.finish_location(fix);
                true
            }
            None => false,
        }
    }

    /// Run the next SOS step if one is due. Returns whether a step ran.
    pub async fn run_sos_step(&mut self) -> bool {
        let state = &mut self.state;
        let ran = state.sos.step(&mut state.torch).await.is_some();
        if ran {
            self.publish();
        }
        ran
    }

    /// Handle one intent: clear the banner, act, surface any failure and
    /// publish the new panel. Returns `false` for [`Intent::Shutdown`].
    pub async fn handle(&mut self, intent: Intent) -> bool {
        debug!(?intent, "Handling intent");
        self.state.errors.clear();

        let outcome: Result<(), Error> = match intent {
            Intent::Locate => {
                self.request_location();
                Ok(())
            }
            Intent::ToggleFlashlight => self.activate_flashlight().await.map_err(Error::from),
            Intent::ToggleSos => self.activate_sos().await.map_err(Error::from),
            Intent::ToggleSiren => self.activate_siren().await.map_err(Error::from),
            Intent::Shutdown => {
                self.shutdown().await;
                self.publish();
                return false;
            }
        };

        if let Err(e) = outcome {
            error!(?intent, error = %e, "Request failed");
            self.state.errors.show(e.user_message());
        }
        self.publish();
        true
    }

    /// Turn everything off and release the camera.
    pub async fn shutdown(&mut self) {
        let state = &mut self.state;
        state.sos.stop(&mut state.torch).await;
        if state.flashlight_on {
            state.flashlight_on = false;
            state.torch.force_off().await;
        }
        state.torch.release();
        state.siren.stop();
        debug!("Session shut down");
    }

    /// Event loop: take intents from `intents` and fire SOS steps as they
    /// come due, until a shutdown intent arrives or the sender goes away.
    ///
    /// Only the waits for the next step and for a pending location fix race
    /// against incoming intents; a handler that has started always finishes
    /// first.
    pub async fn run(mut self, mut intents: mpsc::Receiver<Intent>) -> AppSessionState<M, A> {
        self.publish();
        loop {
            let due = self.state.sos.timer().deadline();
            tokio::select! {
                intent = intents.recv() => {
                    let Some(intent) = intent else {
                        debug!("Intent channel closed");
                        self.shutdown().await;
                        self.publish();
                        break;
                    };
                    if !self.handle(intent).await {
                        break;
                    }
                }
                () = SosTimer::wait(due) => {
                    self.run_sos_step().await;
                }
                Some(fix) = self.fixes.recv() => {
                    self.finish_location(fix);
                }
            }
        }
        self.state
    }
}
