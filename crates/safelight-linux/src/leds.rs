//! Torch LED access through the sysfs LED class.
//!
//! Each LED is a directory holding `brightness` and `max_brightness`
//! attribute files. Flash LEDs are named by the driver, usually something
//! like `white:flash` or `led:torch`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace, warn};

/// Where the kernel publishes LED class devices.
pub const DEFAULT_LEDS_ROOT: &str = "/sys/class/leds";

/// Substrings that mark an LED as a camera flash/torch.
const TORCH_NAME_HINTS: &[&str] = &["torch", "flash"];

const BRIGHTNESS_FILE: &str = "brightness";
const MAX_BRIGHTNESS_FILE: &str = "max_brightness";

/// Errors from the sysfs LED backend.
#[derive(Debug, Error)]
pub enum LedError {
    /// No LED looking like a torch exists under the root.
    #[error("no torch LED found under {}", .0.display())]
    NotFound(PathBuf),

    /// The process may not read or write the LED attributes.
    #[error("permission denied accessing {}", .0.display())]
    PermissionDenied(PathBuf),

    /// An attribute file held something that is not a brightness value.
    #[error("invalid value in {}: {value:?}", path.display())]
    InvalidValue {
        /// The attribute file.
        path: PathBuf,
        /// What was read.
        value: String,
    },

    /// Any other I/O failure.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The file or directory involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
}

impl LedError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            Self::PermissionDenied(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// Check if this error is a permission issue.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}

/// Result type for LED operations.
pub type Result<T> = std::result::Result<T, LedError>;

/// List LED directories under `root` whose names look like a torch.
///
/// The result is sorted so discovery is stable across runs.
///
/// # Errors
///
/// Returns an error if `root` cannot be read.
pub fn discover_torch_leds(root: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(root).map_err(|e| LedError::from_io(root, e))?;

    let mut found: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy().to_lowercase();
            TORCH_NAME_HINTS.iter().any(|hint| name.contains(hint))
        })
        .map(|entry| entry.path())
        .collect();
    found.sort();

    trace!(root = %root.display(), count = found.len(), "Scanned for torch LEDs");
    Ok(found)
}

/// Pick the first torch LED under `root`.
///
/// # Errors
///
/// Returns [`LedError::NotFound`] when nothing matches, or the scan error.
pub fn find_torch_led(root: &Path) -> Result<PathBuf> {
    discover_torch_leds(root)?
        .into_iter()
        .next()
        .ok_or_else(|| LedError::NotFound(root.to_path_buf()))
}

fn read_u32(path: &Path) -> Result<u32> {
    let raw = fs::read_to_string(path).map_err(|e| LedError::from_io(path, e))?;
    raw.trim().parse().map_err(|_| LedError::InvalidValue {
        path: path.to_path_buf(),
        value: raw.trim().to_string(),
    })
}

/// An opened torch LED.
#[derive(Debug)]
pub struct TorchLed {
    path: PathBuf,
    max_brightness: u32,
    lit: bool,
}

impl TorchLed {
    /// Open the LED at `path`, probing its capabilities.
    ///
    /// Opening checks that `brightness` is writable so that a missing udev
    /// rule shows up here rather than on the first toggle.
    ///
    /// # Errors
    ///
    /// Returns an error if the attributes cannot be read or written.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let max_brightness = read_u32(&path.join(MAX_BRIGHTNESS_FILE))?;

        let brightness_path = path.join(BRIGHTNESS_FILE);
        fs::OpenOptions::new()
            .write(true)
            .open(&brightness_path)
            .map_err(|e| LedError::from_io(&brightness_path, e))?;

        let lit = read_u32(&brightness_path)? > 0;
        debug!(led = %path.display(), max_brightness, lit, "Opened torch LED");

        Ok(Self {
            path,
            max_brightness,
            lit,
        })
    }

    /// The LED's sysfs directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The LED's name as published by the driver.
    #[must_use]
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Highest brightness the driver accepts.
    #[must_use]
    pub const fn max_brightness(&self) -> u32 {
        self.max_brightness
    }

    /// A zero `max_brightness` means the LED cannot be switched on.
    #[must_use]
    pub const fn supports_torch(&self) -> bool {
        self.max_brightness > 0
    }

    /// Whether the last successful write turned the LED on.
    #[must_use]
    pub const fn is_lit(&self) -> bool {
        self.lit
    }

    /// Switch the LED on at full brightness, or off.
    ///
    /// # Errors
    ///
    /// Returns an error if the write is rejected.
    pub fn set(&mut self, on: bool) -> Result<()> {
        let value = if on { self.max_brightness } else { 0 };
        let brightness_path = self.path.join(BRIGHTNESS_FILE);
        fs::write(&brightness_path, value.to_string())
            .map_err(|e| LedError::from_io(&brightness_path, e))?;
        trace!(led = %self.path.display(), value, "Wrote LED brightness");
        self.lit = on;
        Ok(())
    }

    /// Turn the LED off, logging instead of failing.
    pub fn shutdown(&mut self) {
        if !self.lit {
            return;
        }
        if let Err(e) = self.set(false) {
            warn!(led = %self.path.display(), error = %e, "Failed to switch LED off");
        }
    }
}
