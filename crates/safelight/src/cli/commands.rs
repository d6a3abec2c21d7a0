//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// SOS command arguments.
#[derive(Debug, Args)]
pub struct SosCommand {
    /// Stop after this many full SOS passes (default: until ctrl-c)
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..))]
    pub cycles: Option<u64>,
}

/// Torch command arguments.
#[derive(Debug, Args)]
pub struct TorchCommand {
    /// Desired torch state
    #[arg(value_enum)]
    pub state: TorchState,
}

/// Locate command arguments.
#[derive(Debug, Args)]
pub struct LocateCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Torch state argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TorchState {
    /// Light the torch and hold it until interrupted
    On,
    /// Switch the torch off
    Off,
}

impl TorchState {
    /// Whether this state lights the torch.
    #[must_use]
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}
