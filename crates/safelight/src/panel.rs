//! What the user sees: mode indicators, the coordinate readout and a single
//! error banner.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single-slot error banner. A new message replaces the previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorSurface {
    current: Option<(String, DateTime<Utc>)>,
}

impl ErrorSurface {
    /// Show `message`, replacing whatever was shown.
    pub fn show(&mut self, message: impl Into<String>) {
        self.current = Some((message.into(), Utc::now()));
    }

    /// Hide the banner.
    pub fn clear(&mut self) {
        self.current = None;
    }

    /// The message currently shown.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.current.as_ref().map(|(message, _)| message.as_str())
    }

    /// When the current message was raised.
    #[must_use]
    pub fn raised_at(&self) -> Option<DateTime<Utc>> {
        self.current.as_ref().map(|(_, at)| *at)
    }
}

/// A point-in-time copy of everything the UI renders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PanelSnapshot {
    /// Flashlight mode on.
    pub flashlight_on: bool,
    /// SOS signal running.
    pub sos_running: bool,
    /// Completed SOS passes since it was started.
    pub sos_cycles: u64,
    /// Siren sounding.
    pub siren_on: bool,
    /// A location request is in flight.
    pub locating: bool,
    /// Last coordinate readout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<String>,
    /// Current error banner text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PanelSnapshot {
    /// Render as plain text for a terminal.
    #[must_use]
    pub fn render(&self) -> String {
        let flag = |on: bool| if on { "ON" } else { "off" };
        let mut out = format!(
            "flashlight: {}  sos: {}  siren: {}",
            flag(self.flashlight_on),
            flag(self.sos_running),
            flag(self.siren_on)
        );
        if self.locating {
            out.push_str("\nlocating...");
        } else if let Some(coordinates) = &self.coordinates {
            out.push('\n');
            out.push_str(coordinates);
        }
        if let Some(error) = &self.error {
            out.push_str("\n! ");
            out.push_str(error);
        }
        out
    }
}
