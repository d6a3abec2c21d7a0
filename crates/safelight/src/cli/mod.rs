//! Command-line interface for safelight.
//!
//! This module provides the CLI structure for the `safelight` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::coordinator::Intent;

pub use commands::{
    ConfigCommand, LocateCommand, SosCommand, StatusCommand, TorchCommand, TorchState,
};

/// safelight - Flashlight, SOS signal, siren and location readout
///
/// Drives the camera flash LED as a flashlight or as a repeating SOS
/// signal, loops an alarm sound, and shows where you are.
#[derive(Debug, Parser)]
#[command(name = "safelight")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive console: l = locate, f = flashlight, s = SOS, a = siren, q = quit
    Run,

    /// Signal SOS with the torch
    Sos(SosCommand),

    /// Switch the torch on or off
    Torch(TorchCommand),

    /// Print the current position
    Locate(LocateCommand),

    /// Show platform and hardware status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.verbose, self.quiet)
    }
}

/// Map a line typed at the interactive console to an intent.
///
/// Unknown input maps to `None`.
#[must_use]
pub fn parse_console_input(line: &str) -> Option<Intent> {
    match line.trim().to_ascii_lowercase().as_str() {
        "l" | "locate" => Some(Intent::Locate),
        "f" | "flashlight" => Some(Intent::ToggleFlashlight),
        "s" | "sos" => Some(Intent::ToggleSos),
        "a" | "siren" | "alarm" => Some(Intent::ToggleSiren),
        "q" | "quit" | "exit" => Some(Intent::Shutdown),
        _ => None,
    }
}
