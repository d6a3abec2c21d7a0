//! SOS light signal sequencer.
//!
//! Morse "SOS" is three dots, three dashes, three dots. Each mark and each
//! gap is one step in an 18-entry table; the sequencer walks it forever,
//! driving the torch and arming a single timer for the next step.
//!
//! The sequencer itself never sleeps. Its owner waits on [`SosTimer::fired`]
//! and calls [`SosSequencer::step`], which keeps cancellation a matter of
//! disarming one deadline.

use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace, warn};

use crate::camera::{CameraError, MediaCapture};
use crate::torch::TorchController;

/// Length of a dot.
pub const DOT: Duration = Duration::from_millis(200);
/// Length of a dash.
pub const DASH: Duration = Duration::from_millis(600);
/// Dark time between marks of one letter.
pub const GAP: Duration = Duration::from_millis(200);
/// Dark time between letters.
pub const LETTER_GAP: Duration = Duration::from_millis(600);
/// Dark time after the word, before the pattern repeats.
pub const WORD_GAP: Duration = Duration::from_millis(1400);

/// Number of steps in one pass of the pattern.
pub const STEP_COUNT: usize = 18;

/// One entry of the pattern: hold the torch in `light` for `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SosStep {
    /// Torch on or off.
    pub light: bool,
    /// How long to hold before the next step.
    pub duration: Duration,
}

/// The full pattern, one letter at a time.
pub const SOS_PATTERN: [SosStep; STEP_COUNT] = build_pattern();

const fn build_pattern() -> [SosStep; STEP_COUNT] {
    // S, O, S
    let letters = [DOT, DASH, DOT];
    let mut steps = [SosStep {
        light: false,
        duration: GAP,
    }; STEP_COUNT];

    let mut letter = 0;
    while letter < letters.len() {
        let mut mark = 0;
        while mark < 3 {
            let index = letter * 6 + mark * 2;
            steps[index] = SosStep {
                light: true,
                duration: letters[letter],
            };
            let gap = if mark < 2 {
                GAP
            } else if letter + 1 < letters.len() {
                LETTER_GAP
            } else {
                WORD_GAP
            };
            steps[index + 1] = SosStep {
                light: false,
                duration: gap,
            };
            mark += 1;
        }
        letter += 1;
    }
    steps
}

/// Look up a step, wrapping past the end of the pattern.
#[must_use]
pub const fn step_at(index: usize) -> SosStep {
    SOS_PATTERN[index % STEP_COUNT]
}

/// The single cancellable timer driving the sequence.
#[derive(Debug, Default)]
pub struct SosTimer {
    deadline: Option<Instant>,
}

impl SosTimer {
    /// Arm the timer to fire `after` from now, replacing any pending deadline.
    pub fn arm(&mut self, after: Duration) {
        self.deadline = Some(Instant::now() + after);
    }

    /// Disarm the timer. Returns whether a deadline was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Whether a deadline is pending.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// The pending deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Resolve when the armed deadline passes; never resolves while disarmed.
    ///
    /// Cancel-safe: dropping the future leaves the timer armed.
    pub async fn fired(&self) {
        Self::wait(self.deadline).await;
    }

    /// Same as [`fired`](Self::fired) for a deadline copied out earlier.
    pub async fn wait(deadline: Option<Instant>) {
        match deadline {
            Some(deadline) => sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}

/// Sequencer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SosState {
    /// Not signalling.
    #[default]
    Inactive,
    /// Signalling; `step` is the next table index to execute.
    Running {
        /// Next step to run.
        step: usize,
    },
}

/// Drives the torch through [`SOS_PATTERN`].
#[derive(Debug, Default)]
pub struct SosSequencer {
    state: SosState,
    timer: SosTimer,
    cycles: u64,
}

impl SosSequencer {
    /// Create an inactive sequencer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SosState {
        self.state
    }

    /// Whether the signal is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self.state, SosState::Running { .. })
    }

    /// Index of the next step to run, 0 when inactive.
    #[must_use]
    pub fn step_index(&self) -> usize {
        match self.state {
            SosState::Running { step } => step,
            SosState::Inactive => 0,
        }
    }

    /// Full passes through the pattern since the last start.
    #[must_use]
    pub fn cycles_completed(&self) -> u64 {
        self.cycles
    }

    /// The step timer.
    #[must_use]
    pub fn timer(&self) -> &SosTimer {
        &self.timer
    }

    /// Start signalling from step 0.
    ///
    /// The camera must be acquired first; on failure the sequencer stays
    /// inactive and nothing is scheduled. The first step is due immediately.
    /// Starting while already running is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError`] if the camera cannot be acquired.
    pub async fn start<M: MediaCapture>(
        &mut self,
        torch: &mut TorchController<M>,
    ) -> Result<(), CameraError> {
        if self.is_running() {
            debug!("SOS already running");
            return Ok(());
        }

        torch.ensure_session().await?;

        self.state = SosState::Running { step: 0 };
        self.cycles = 0;
        self.timer.arm(Duration::ZERO);
        debug!("SOS signal started");
        Ok(())
    }

    /// Execute the current step and arm the timer for the next one.
    ///
    /// Torch failures are logged and do not interrupt the loop. The next
    /// deadline is measured from when the torch request settles. Returns the
    /// hold duration, or `None` when inactive.
    pub async fn step<M: MediaCapture>(
        &mut self,
        torch: &mut TorchController<M>,
    ) -> Option<Duration> {
        let SosState::Running { step } = self.state else {
            return None;
        };
        // The deadline is consumed by running this step.
        self.timer.cancel();

        let SosStep { light, duration } = step_at(step);
        trace!(step, light, duration_ms = duration.as_millis(), "SOS step");

        if let Err(e) = torch.set_torch_tolerant(light).await {
            warn!(step, error = %e, "SOS step could not reach the camera");
        }

        let next = (step + 1) % STEP_COUNT;
        if next == 0 {
            self.cycles += 1;
        }
        self.state = SosState::Running { step: next };
        self.timer.arm(duration);
        Some(duration)
    }

    /// Stop signalling.
    ///
    /// The pending step is cancelled before the torch is forced off, then the
    /// camera is released and the step index resets. Returns whether the
    /// sequencer was running.
    pub async fn stop<M: MediaCapture>(&mut self, torch: &mut TorchController<M>) -> bool {
        self.timer.cancel();
        if !self.is_running() {
            return false;
        }
        self.state = SosState::Inactive;

        torch.force_off().await;
        torch.release();
        debug!(cycles = self.cycles, "SOS signal stopped");
        true
    }
}
