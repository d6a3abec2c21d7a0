//! End-to-end tests driving a `ModeCoordinator` event loop through its
//! intent channel and panel watch, with in-memory platform backends.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use safelight::camera::{FacingMode, MediaCapture, MediaError, TrackCapabilities, VideoTrack};
use safelight::location::{LocationRequest, Position, StaticLocationProvider};
use safelight::siren::{AudioOutput, PlaybackError};
use safelight::{Intent, ModeCoordinator, PanelSnapshot};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct Hardware {
    torch: Vec<(Instant, bool)>,
    live_tracks: usize,
    playing: bool,
}

type Shared = Arc<Mutex<Hardware>>;

#[derive(Debug, Clone)]
struct Camera {
    hw: Shared,
    torch: bool,
}

#[derive(Debug)]
struct Track {
    hw: Shared,
    torch: bool,
}

#[async_trait]
impl VideoTrack for Track {
    fn label(&self) -> String {
        "test camera".to_string()
    }

    fn capabilities(&self) -> TrackCapabilities {
        TrackCapabilities { torch: self.torch }
    }

    async fn apply_torch(&mut self, on: bool) -> Result<(), MediaError> {
        self.hw.lock().unwrap().torch.push((Instant::now(), on));
        Ok(())
    }

    fn stop(&mut self) {
        self.hw.lock().unwrap().live_tracks -= 1;
    }
}

#[async_trait]
impl MediaCapture for Camera {
    type Track = Track;

    async fn open_video(&mut self, _facing: FacingMode) -> Result<Track, MediaError> {
        self.hw.lock().unwrap().live_tracks += 1;
        Ok(Track {
            hw: Arc::clone(&self.hw),
            torch: self.torch,
        })
    }
}

#[derive(Debug, Clone)]
struct Speaker {
    hw: Shared,
}

#[async_trait]
impl AudioOutput for Speaker {
    async fn play(&mut self) -> Result<(), PlaybackError> {
        self.hw.lock().unwrap().playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.hw.lock().unwrap().playing = false;
    }

    fn rewind(&mut self) {}
}

struct Harness {
    hw: Shared,
    origin: Instant,
    intents: mpsc::Sender<Intent>,
    panel: watch::Receiver<PanelSnapshot>,
    session: JoinHandle<()>,
}

impl Harness {
    fn start(torch: bool, fix: Option<Position>) -> Self {
        let hw = Shared::default();
        let coordinator = ModeCoordinator::new(
            Camera {
                hw: Arc::clone(&hw),
                torch,
            },
            Speaker {
                hw: Arc::clone(&hw),
            },
            StaticLocationProvider::new(fix),
            LocationRequest::default(),
        );
        let panel = coordinator.subscribe();
        let (intents, rx) = mpsc::channel(8);
        let session = tokio::spawn(async move {
            coordinator.run(rx).await;
        });
        Self {
            hw,
            origin: Instant::now(),
            intents,
            panel,
            session,
        }
    }

    async fn send(&self, intent: Intent) {
        self.intents.send(intent).await.unwrap();
        // let the event loop handle it
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    fn panel(&self) -> PanelSnapshot {
        self.panel.borrow().clone()
    }

    fn torch_log(&self) -> Vec<(u128, bool)> {
        self.hw
            .lock()
            .unwrap()
            .torch
            .iter()
            .map(|(at, on)| ((*at - self.origin).as_millis(), *on))
            .collect()
    }

    async fn finish(self) -> Shared {
        self.intents.send(Intent::Shutdown).await.unwrap();
        self.session.await.unwrap();
        self.hw
    }
}

#[tokio::test(start_paused = true)]
async fn sos_counts_passes_on_the_panel() {
    let harness = Harness::start(true, None);

    harness.send(Intent::ToggleSos).await;
    assert!(harness.panel().sos_running);

    tokio::time::sleep(Duration::from_millis(7000)).await;
    let panel = harness.panel();
    assert_eq!(panel.sos_cycles, 1);
    assert!(!panel.flashlight_on);

    let hw = harness.finish().await;
    let hw = hw.lock().unwrap();
    assert_eq!(hw.live_tracks, 0);
    assert_eq!(hw.torch.last().map(|(_, on)| *on), Some(false));
}

#[tokio::test(start_paused = true)]
async fn flashlight_takes_over_from_sos() {
    let harness = Harness::start(true, None);

    harness.send(Intent::ToggleSos).await;
    tokio::time::sleep(Duration::from_millis(299)).await;
    harness.send(Intent::ToggleFlashlight).await;

    let panel = harness.panel();
    assert!(panel.flashlight_on);
    assert!(!panel.sos_running);

    // nothing left scheduled to touch the torch
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(
        harness.torch_log(),
        [(0, true), (200, false), (300, false), (300, true)]
    );

    let hw = harness.finish().await;
    assert_eq!(hw.lock().unwrap().live_tracks, 0);
}

#[tokio::test(start_paused = true)]
async fn camera_without_torch_surfaces_error() {
    let harness = Harness::start(false, None);

    harness.send(Intent::ToggleSos).await;
    let panel = harness.panel();
    assert!(!panel.sos_running);
    assert_eq!(
        panel.error.as_deref(),
        Some("Your device (camera) does not support the flashlight.")
    );

    harness.send(Intent::ToggleFlashlight).await;
    assert!(!harness.panel().flashlight_on);

    // a successful request clears the banner
    harness.send(Intent::ToggleSiren).await;
    let panel = harness.panel();
    assert!(panel.siren_on);
    assert!(panel.error.is_none());

    let hw = harness.finish().await;
    let hw = hw.lock().unwrap();
    assert!(hw.torch.is_empty());
    assert_eq!(hw.live_tracks, 0);
    assert!(!hw.playing);
}

#[tokio::test(start_paused = true)]
async fn siren_and_location_run_alongside_sos() {
    let fix = Position {
        latitude: 51.5,
        longitude: -0.125,
        accuracy_m: 20.0,
    };
    let harness = Harness::start(true, Some(fix));

    harness.send(Intent::ToggleSos).await;
    harness.send(Intent::ToggleSiren).await;
    harness.send(Intent::Locate).await;

    let panel = harness.panel();
    assert!(panel.sos_running);
    assert!(panel.siren_on);
    assert!(!panel.locating);
    assert_eq!(
        panel.coordinates.as_deref(),
        Some("Latitude: 51.50000\nLongitude: -0.12500\n(Accuracy: 20.0m)")
    );
    assert!(harness.hw.lock().unwrap().playing);

    let hw = harness.finish().await;
    assert!(!hw.lock().unwrap().playing);
}

#[tokio::test(start_paused = true)]
async fn missing_position_shows_error() {
    let harness = Harness::start(true, None);

    harness.send(Intent::Locate).await;
    let panel = harness.panel();
    assert!(panel.coordinates.is_none());
    assert_eq!(
        panel.error.as_deref(),
        Some("Unable to get location: position unavailable.")
    );

    harness.finish().await;
}
