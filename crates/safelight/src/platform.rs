//! Platform backends for the camera torch and the siren.
//!
//! On Linux the torch is the camera flash LED exposed through sysfs. Other
//! platforms get a capture backend that always fails, so the rest of the
//! app still runs and reports the missing camera on the error banner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::camera::{FacingMode, MediaCapture, MediaError, TrackCapabilities, VideoTrack};
use crate::config::{CameraConfig, Config};
use crate::siren::{AudioOutput, PlaybackError};

/// Name of the platform this build drives.
#[must_use]
pub fn platform_name() -> &'static str {
    #[cfg(target_os = "linux")]
    {
        safelight_linux::platform_name()
    }
    #[cfg(not(target_os = "linux"))]
    {
        std::env::consts::OS
    }
}

/// Initialize platform components.
///
/// # Errors
///
/// Returns an error if the platform layer cannot be initialized.
pub fn init() -> crate::Result<()> {
    #[cfg(target_os = "linux")]
    safelight_linux::init().map_err(|e| crate::Error::platform(e.to_string()))?;
    Ok(())
}

#[cfg(target_os = "linux")]
pub use linux::{SysfsCapture, SysfsTrack};

/// The capture backend for this build.
#[cfg(target_os = "linux")]
pub type DefaultCapture = SysfsCapture;

/// The capture backend for this build.
#[cfg(not(target_os = "linux"))]
pub type DefaultCapture = UnsupportedCapture;

/// Build the capture backend for this build from configuration.
#[must_use]
pub fn default_capture(config: &CameraConfig) -> DefaultCapture {
    #[cfg(target_os = "linux")]
    {
        SysfsCapture::new(config.leds_root.clone(), config.led_path.clone())
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = config;
        UnsupportedCapture
    }
}

/// The torch LED this build would drive, if one can be found.
#[must_use]
pub fn detect_torch_led(config: &CameraConfig) -> Option<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        config
            .led_path
            .clone()
            .or_else(|| safelight_linux::find_torch_led(&config.leds_root).ok())
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = config;
        None
    }
}

#[cfg(target_os = "linux")]
mod linux {
    use std::path::PathBuf;

    use async_trait::async_trait;
    use safelight_linux::{find_torch_led, LedError, TorchLed};
    use tracing::debug;

    use crate::camera::{FacingMode, MediaCapture, MediaError, TrackCapabilities, VideoTrack};

    impl From<LedError> for MediaError {
        fn from(err: LedError) -> Self {
            if err.is_permission_denied() {
                Self::NotAllowed(err.to_string())
            } else {
                Self::Failed(err.to_string())
            }
        }
    }

    /// Drives the camera flash LED through the kernel LED class.
    #[derive(Debug, Clone)]
    pub struct SysfsCapture {
        leds_root: PathBuf,
        led_path: Option<PathBuf>,
    }

    impl SysfsCapture {
        /// Use `led_path` if set, otherwise the first torch LED under
        /// `leds_root`.
        #[must_use]
        pub fn new(leds_root: PathBuf, led_path: Option<PathBuf>) -> Self {
            Self {
                leds_root,
                led_path,
            }
        }

        fn resolve(&self) -> Result<PathBuf, LedError> {
            match &self.led_path {
                Some(path) => Ok(path.clone()),
                None => find_torch_led(&self.leds_root),
            }
        }
    }

    /// An opened flash LED, standing in for a camera track.
    #[derive(Debug)]
    pub struct SysfsTrack {
        led: TorchLed,
    }

    #[async_trait]
    impl VideoTrack for SysfsTrack {
        fn label(&self) -> String {
            self.led.name()
        }

        fn capabilities(&self) -> TrackCapabilities {
            TrackCapabilities {
                torch: self.led.supports_torch(),
            }
        }

        async fn apply_torch(&mut self, on: bool) -> Result<(), MediaError> {
            self.led.set(on).map_err(MediaError::from)
        }

        fn stop(&mut self) {
            self.led.shutdown();
        }
    }

    #[async_trait]
    impl MediaCapture for SysfsCapture {
        type Track = SysfsTrack;

        async fn open_video(&mut self, facing: FacingMode) -> Result<SysfsTrack, MediaError> {
            if facing == FacingMode::User {
                debug!("Front camera requested, the flash LED serves the rear camera");
            }
            let path = self.resolve()?;
            let led = TorchLed::open(path)?;
            Ok(SysfsTrack { led })
        }
    }
}

/// A capture backend for platforms without a camera driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedCapture;

/// A track that can never be opened.
#[derive(Debug)]
pub enum NoTrack {}

#[async_trait]
impl VideoTrack for NoTrack {
    fn label(&self) -> String {
        match *self {}
    }

    fn capabilities(&self) -> TrackCapabilities {
        match *self {}
    }

    async fn apply_torch(&mut self, _on: bool) -> Result<(), MediaError> {
        match *self {}
    }

    fn stop(&mut self) {
        match *self {}
    }
}

#[async_trait]
impl MediaCapture for UnsupportedCapture {
    type Track = NoTrack;

    async fn open_video(&mut self, _facing: FacingMode) -> Result<NoTrack, MediaError> {
        Err(MediaError::Failed(
            "no camera backend for this platform".to_string(),
        ))
    }
}

/// How long a freshly started player must survive before playback counts
/// as started.
const STARTUP_GRACE: Duration = Duration::from_millis(100);

/// Loops a sound file through an external player program.
///
/// Each loop iteration is one player process. Pausing kills the current
/// process; there is no seek, so every start plays from the beginning.
#[derive(Debug)]
pub struct CommandAudio {
    player: String,
    sound_file: PathBuf,
    restart_delay: Duration,
    task: Option<JoinHandle<()>>,
}

impl CommandAudio {
    /// Loop `sound_file` through `player`, waiting `restart_delay` between
    /// iterations.
    #[must_use]
    pub fn new(
        player: impl Into<String>,
        sound_file: impl Into<PathBuf>,
        restart_delay: Duration,
    ) -> Self {
        Self {
            player: player.into(),
            sound_file: sound_file.into(),
            restart_delay,
            task: None,
        }
    }

    /// Build from the `[siren]` configuration section.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.siren.player.clone(),
            config.sound_file(),
            config.siren_restart_delay(),
        )
    }

    /// Whether a loop is running.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn spawn_player(player: &str, sound_file: &Path) -> std::io::Result<Child> {
        Command::new(player)
            .arg(sound_file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
    }
}

#[async_trait]
impl AudioOutput for CommandAudio {
    async fn play(&mut self) -> Result<(), PlaybackError> {
        if self.is_playing() {
            return Ok(());
        }

        tokio::fs::metadata(&self.sound_file).await.map_err(|e| {
            PlaybackError::Failed(format!("{}: {e}", self.sound_file.display()))
        })?;

        let mut child = CommandAudio::spawn_player(&self.player, &self.sound_file)
            .map_err(|e| PlaybackError::Failed(format!("{}: {e}", self.player)))?;

        // A player that rejects the file or the device exits straight away.
        let running = match tokio::time::timeout(STARTUP_GRACE, child.wait()).await {
            Err(_still_playing) => Some(child),
            Ok(Ok(status)) if status.success() => None,
            Ok(Ok(status)) => {
                return Err(PlaybackError::Failed(format!("{} exited with {status}", self.player)));
            }
            Ok(Err(e)) => return Err(PlaybackError::Failed(format!("{}: {e}", self.player))),
        };
        debug!(player = %self.player, sound = %self.sound_file.display(), "Siren loop started");

        let player = self.player.clone();
        let sound_file = self.sound_file.clone();
        let delay = self.restart_delay;
        self.task = Some(tokio::spawn(async move {
            let mut running = running;
            loop {
                if let Some(mut child) = running.take() {
                    match child.wait().await {
                        Ok(status) if status.success() => {
                            trace!(%status, "Siren player finished");
                        }
                        Ok(status) => {
                            warn!(player = %player, %status, "Siren player failed, loop stopped");
                            return;
                        }
                        Err(e) => {
                            warn!(error = %e, "Lost track of siren player");
                            return;
                        }
                    }
                }
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                match CommandAudio::spawn_player(&player, &sound_file) {
                    Ok(child) => running = Some(child),
                    Err(e) => {
                        warn!(player = %player, error = %e, "Failed to restart siren player");
                        return;
                    }
                }
            }
        }));
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Siren loop stopped");
        }
    }

    fn rewind(&mut self) {}
}

impl Drop for CommandAudio {
    fn drop(&mut self) {
        self.pause();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_name() {
        assert!(!platform_name().is_empty());
        assert!(init().is_ok());
    }

    #[tokio::test]
    async fn test_unsupported_capture_fails() {
        let mut capture = UnsupportedCapture;
        let err = capture
            .open_video(FacingMode::Environment)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Failed(_)));
    }

    #[tokio::test]
    async fn test_audio_missing_sound_file() {
        let mut audio = CommandAudio::new("true", "/nonexistent/alarm.wav", Duration::ZERO);
        let err = audio.play().await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/alarm.wav"));
        assert!(!audio.is_playing());
    }

    #[tokio::test]
    async fn test_audio_missing_player() {
        let dir = tempfile::tempdir().unwrap();
        let sound = dir.path().join("alarm.wav");
        std::fs::write(&sound, b"RIFF").unwrap();

        let mut audio = CommandAudio::new("safelight-no-such-player", &sound, Duration::ZERO);
        let err = audio.play().await.unwrap_err();
        assert!(err.to_string().contains("safelight-no-such-player"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_audio_loops_until_paused() {
        let dir = tempfile::tempdir().unwrap();
        let sound = dir.path().join("alarm.wav");
        std::fs::write(&sound, b"RIFF").unwrap();

        let mut audio = CommandAudio::new("true", &sound, Duration::from_millis(20));
        audio.play().await.unwrap();
        assert!(audio.is_playing());

        // a second play while looping is a no-op
        audio.play().await.unwrap();
        assert!(audio.is_playing());

        audio.pause();
        assert!(!audio.is_playing());
        audio.pause();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_audio_failing_player_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let sound = dir.path().join("alarm.wav");
        std::fs::write(&sound, b"RIFF").unwrap();

        let mut audio = CommandAudio::new("false", &sound, Duration::ZERO);
        let err = audio.play().await.unwrap_err();
        assert!(err.to_string().contains("exited with"));
        assert!(!audio.is_playing());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_audio_loop_stops_when_player_fails() {
        // `sh` plays the "sound file": one logged run that outlives the
        // startup grace and then fails.
        let dir = tempfile::tempdir().unwrap();
        let runs = dir.path().join("runs");
        let sound = dir.path().join("alarm.sh");
        std::fs::write(
            &sound,
            format!("echo run >> '{}'\nsleep 0.3\nexit 1\n", runs.display()),
        )
        .unwrap();

        let mut audio = CommandAudio::new("sh", &sound, Duration::ZERO);
        audio.play().await.unwrap();
        assert!(audio.is_playing());

        tokio::time::sleep(Duration::from_millis(800)).await;
        let count = std::fs::read_to_string(&runs).unwrap().lines().count();
        assert_eq!(count, 1);
        assert!(!audio.is_playing());
    }

    #[cfg(target_os = "linux")]
    mod sysfs {
        use std::fs;
        use std::path::Path;

        use super::*;

        fn fake_led(root: &Path, name: &str, max: u32) -> PathBuf {
            let dir = root.join(name);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("max_brightness"), max.to_string()).unwrap();
            fs::write(dir.join("brightness"), "0").unwrap();
            dir
        }

        #[tokio::test]
        async fn test_sysfs_capture_drives_led() {
            let root = tempfile::tempdir().unwrap();
            let led = fake_led(root.path(), "white:flash", 255);

            let mut capture = SysfsCapture::new(root.path().to_path_buf(), None);
            let mut track = capture.open_video(FacingMode::Environment).await.unwrap();
            assert!(track.capabilities().torch);
            assert_eq!(track.label(), "white:flash");

            track.apply_torch(true).await.unwrap();
            assert_eq!(fs::read_to_string(led.join("brightness")).unwrap(), "255");

            track.stop();
            assert_eq!(fs::read_to_string(led.join("brightness")).unwrap(), "0");
        }

        #[tokio::test]
        async fn test_sysfs_capture_reports_missing_torch() {
            let root = tempfile::tempdir().unwrap();
            fake_led(root.path(), "white:flash", 0);

            let mut capture = SysfsCapture::new(root.path().to_path_buf(), None);
            let track = capture.open_video(FacingMode::Environment).await.unwrap();
            assert!(!track.capabilities().torch);
        }

        #[tokio::test]
        async fn test_sysfs_capture_without_led() {
            let root = tempfile::tempdir().unwrap();

            let mut capture = SysfsCapture::new(root.path().to_path_buf(), None);
            let err = capture
                .open_video(FacingMode::Environment)
                .await
                .unwrap_err();
            assert!(matches!(err, MediaError::Failed(_)));
        }

        #[tokio::test]
        async fn test_sysfs_capture_explicit_path() {
            let root = tempfile::tempdir().unwrap();
            fake_led(root.path(), "white:flash", 255);
            let chosen = fake_led(root.path(), "amber:torch", 1);

            let mut capture = SysfsCapture::new(root.path().to_path_buf(), Some(chosen));
            let track = capture.open_video(FacingMode::Environment).await.unwrap();
            assert_eq!(track.label(), "amber:torch");
        }

        #[test]
        fn test_detect_torch_led() {
            let root = tempfile::tempdir().unwrap();
            let mut config = CameraConfig {
                led_path: None,
                leds_root: root.path().to_path_buf(),
            };
            assert!(detect_torch_led(&config).is_none());

            let led = fake_led(root.path(), "led:torch", 1);
            assert_eq!(detect_torch_led(&config), Some(led));

            config.led_path = Some(PathBuf::from("/elsewhere"));
            assert_eq!(detect_torch_led(&config), Some(PathBuf::from("/elsewhere")));
        }

        #[test]
        fn test_default_capture_uses_config() {
            let config = CameraConfig::default();
            let capture = default_capture(&config);
            assert!(format!("{capture:?}").contains("/sys/class/leds"));
        }
    }
}
