//! Looping audio siren.
//!
//! The siren has no hardware in common with the torch; its only state is
//! whether it should be sounding.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error};

/// Errors from audio playback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// Playback could not be started.
    #[error("playback failed: {0}")]
    Failed(String),
}

impl PlaybackError {
    /// The message shown on the error banner.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Failed(message) => format!("Unable to play sound: {message}"),
        }
    }
}

/// Platform audio playback of a looped alarm sound.
#[async_trait]
pub trait AudioOutput: Send {
    /// Start or resume looped playback.
    ///
    /// # Errors
    ///
    /// Returns an error if playback cannot start.
    async fn play(&mut self) -> Result<(), PlaybackError>;

    /// Pause playback. Idempotent.
    fn pause(&mut self);

    /// Seek back to the start of the sound.
    fn rewind(&mut self);
}

/// On/off siren over an [`AudioOutput`].
#[derive(Debug)]
pub struct Siren<A> {
    audio: A,
    on: bool,
}

impl<A: AudioOutput> Siren<A> {
    /// Create a silent siren.
    #[must_use]
    pub fn new(audio: A) -> Self {
        Self { audio, on: false }
    }

    /// Whether the siren is sounding.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Start the siren from the beginning of the sound.
    ///
    /// If playback fails the siren is stopped again before returning.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError`] if playback cannot start.
    pub async fn start(&mut self) -> Result<(), PlaybackError> {
        self.on = true;
        self.audio.rewind();
        if let Err(e) = self.audio.play().await {
            error!(error = %e, "Siren playback failed");
            self.stop();
            return Err(e);
        }
        debug!("Siren started");
        Ok(())
    }

    /// Silence the siren and rewind the sound.
    pub fn stop(&mut self) {
        self.audio.pause();
        self.audio.rewind();
        if self.on {
            debug!("Siren stopped");
        }
        self.on = false;
    }

    /// Flip the siren. Returns the new state.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError`] if turning on fails.
    pub async fn toggle(&mut self) -> Result<bool, PlaybackError> {
        if self.on {
            self.stop();
        } else {
            self.start().await?;
        }
        Ok(self.on)
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::FakeAudio;
    use super::*;

    #[tokio::test]
    async fn test_toggle_on_and_off() {
        let audio = FakeAudio::default();
        let mut siren = Siren::new(audio.clone());

        assert!(siren.toggle().await.unwrap());
        assert!(audio.is_playing());

        assert!(!siren.toggle().await.unwrap());
        assert!(!audio.is_playing());
    }

    #[tokio::test]
    async fn test_start_rewinds_first() {
        let audio = FakeAudio::default();
        let mut siren = Siren::new(audio.clone());

        siren.start().await.unwrap();

        let log = audio.log.lock().unwrap();
        assert_eq!(log.rewinds, 1);
        assert_eq!(log.plays, 1);
    }

    #[tokio::test]
    async fn test_playback_failure_stops_siren() {
        let mut siren = Siren::new(FakeAudio::broken("no output device"));

        let err = siren.start().await.unwrap_err();

        assert_eq!(err, PlaybackError::Failed("no output device".to_string()));
        assert!(!siren.is_on());
    }

    #[test]
    fn test_user_message() {
        let err = PlaybackError::Failed("decode error".to_string());
        assert_eq!(err.user_message(), "Unable to play sound: decode error");
    }
}
