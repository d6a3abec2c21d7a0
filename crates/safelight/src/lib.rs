//! `safelight` - An emergency toolkit: flashlight, SOS signal, siren and
//! location readout.
//!
//! The flashlight and the SOS signal share the camera flash LED and are
//! mutually exclusive. The siren and the location lookup are independent of
//! both. All mode state is owned by a single [`ModeCoordinator`] task.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod camera;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod location;
pub mod logging;
pub mod panel;
pub mod platform;
pub mod siren;
pub mod sos;
pub mod torch;

pub use camera::{CameraError, CameraSession, FacingMode, MediaCapture, VideoTrack};
pub use config::Config;
pub use coordinator::{AppSessionState, Intent, ModeCoordinator};
pub use error::{Error, Result};
pub use location::{LocationError, LocationProvider, LocationRequest, Position};
pub use logging::init_logging;
pub use panel::PanelSnapshot;
pub use siren::{AudioOutput, PlaybackError, Siren};
pub use sos::{SosSequencer, SosState};
pub use torch::{TorchController, TorchError};
