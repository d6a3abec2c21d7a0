//! Linux-specific implementation for safelight
//!
//! Camera flash LEDs are exposed by the kernel LED class under
//! `/sys/class/leds`. This crate finds the torch LED and drives it.

#![cfg(target_os = "linux")]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod leds;

pub use leds::{discover_torch_leds, find_torch_led, LedError, TorchLed, DEFAULT_LEDS_ROOT};

/// Initialize Linux-specific components
///
/// # Errors
///
/// Returns an error if initialization fails
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!("Initializing Linux platform components");
    Ok(())
}

/// Get platform name
#[must_use]
pub fn platform_name() -> &'static str {
    "Linux"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init() {
        assert!(init().is_ok());
    }

    #[test]
    fn test_platform_name() {
        assert_eq!(platform_name(), "Linux");
    }

    #[test]
    fn test_default_root() {
        assert_eq!(DEFAULT_LEDS_ROOT, "/sys/class/leds");
    }
}
