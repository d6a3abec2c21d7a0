//! `safelight` - CLI for the safelight emergency toolkit
//!
//! This binary drives the flashlight, SOS signal, siren and location readout
//! from a terminal.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use safelight::camera::CameraSession;
use safelight::cli::{
    parse_console_input, Cli, Command, ConfigCommand, LocateCommand, SosCommand, TorchCommand,
};
use safelight::location::{locate, StaticLocationProvider};
use safelight::platform::{self, CommandAudio, DefaultCapture};
use safelight::{init_logging, Config, Intent, ModeCoordinator, TorchController};

type Coordinator = ModeCoordinator<DefaultCapture, CommandAudio, StaticLocationProvider>;

const CONSOLE_HELP: &str = "Commands: l = locate, f = flashlight, s = SOS, a = siren, q = quit";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    platform::init()?;

    let config_path = cli.config.clone();
    match cli.command {
        Command::Run => handle_run(&load_config(config_path)?).await,
        Command::Sos(sos_cmd) => handle_sos(&load_config(config_path)?, &sos_cmd).await,
        Command::Torch(torch_cmd) => handle_torch(&load_config(config_path)?, &torch_cmd).await,
        Command::Locate(locate_cmd) => {
            handle_locate(&load_config(config_path)?, &locate_cmd).await
        }
        Command::Status(status_cmd) => handle_status(&load_config(config_path)?, status_cmd.json),
        Command::Config(config_cmd) => handle_config(config_path, config_cmd),
    }
}

fn load_config(config_path: Option<PathBuf>) -> anyhow::Result<Config> {
    Config::load_from(config_path).context("Failed to load configuration")
}

fn build_coordinator(config: &Config) -> Coordinator {
    ModeCoordinator::new(
        platform::default_capture(&config.camera),
        CommandAudio::from_config(config),
        StaticLocationProvider::new(config.fixed_position()),
        config.location_request(),
    )
}

/// Forward console lines to the coordinator from a plain thread, so a
/// pending stdin read never holds up runtime shutdown.
fn spawn_console_reader(intents: mpsc::Sender<Intent>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let Some(intent) = parse_console_input(&line) else {
                if !line.trim().is_empty() {
                    eprintln!("Unknown command: {}. {CONSOLE_HELP}", line.trim());
                }
                continue;
            };
            if intents.blocking_send(intent).is_err() || intent == Intent::Shutdown {
                return;
            }
        }
        let _ = intents.blocking_send(Intent::Shutdown);
    });
}

async fn handle_run(config: &Config) -> anyhow::Result<()> {
    let coordinator = build_coordinator(config);
    let mut panel = coordinator.subscribe();
    let (tx, rx) = mpsc::channel(16);

    println!("safelight on {}", platform::platform_name());
    println!("{CONSOLE_HELP}");
    println!("{}", panel.borrow_and_update().render());

    let session = tokio::spawn(coordinator.run(rx));
    let printer = tokio::spawn(async move {
        while panel.changed().await.is_ok() {
            println!("{}", panel.borrow_and_update().render());
        }
    });
    let interrupt = {
        let tx = tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(Intent::Shutdown).await;
            }
        })
    };
    spawn_console_reader(tx);

    session.await.context("Session task failed")?;
    interrupt.abort();
    printer.await.context("Panel printer failed")?;
    Ok(())
}

async fn handle_sos(config: &Config, cmd: &SosCommand) -> anyhow::Result<()> {
    let coordinator = build_coordinator(config);
    let mut panel = coordinator.subscribe();
    let (tx, rx) = mpsc::channel(4);

    tx.send(Intent::ToggleSos).await?;
    let session = tokio::spawn(coordinator.run(rx));

    let watch_signal = async {
        while panel.changed().await.is_ok() {
            let snapshot = panel.borrow_and_update().clone();
            if let Some(error) = snapshot.error {
                return Some(error);
            }
            if cmd.cycles.is_some_and(|n| snapshot.sos_cycles >= n) {
                debug!(cycles = snapshot.sos_cycles, "Requested SOS passes done");
                return None;
            }
        }
        None
    };

    match cmd.cycles {
        Some(n) => println!("Signalling SOS for {n} pass(es), press ctrl-c to stop"),
        None => println!("Signalling SOS, press ctrl-c to stop"),
    }

    let failure = tokio::select! {
        _ = tokio::signal::ctrl_c() => None,
        failure = watch_signal => failure,
    };

    let _ = tx.send(Intent::Shutdown).await;
    session.await.context("Session task failed")?;

    match failure {
        Some(message) => Err(anyhow!(message)),
        None => Ok(()),
    }
}

async fn handle_torch(config: &Config, cmd: &TorchCommand) -> anyhow::Result<()> {
    let mut torch = TorchController::new(CameraSession::new(platform::default_capture(
        &config.camera,
    )));

    if cmd.state.is_on() {
        match torch.set_torch(true).await {
            Ok(()) => {}
            Err(e) if e.is_apply_failure() => {
                warn!(error = %e, "Torch did not confirm");
            }
            Err(e) => bail!(e.user_message()),
        }
        println!("Torch on, press ctrl-c to switch off");
        tokio::signal::ctrl_c().await?;
        torch.force_off().await;
    } else {
        torch
            .set_torch(false)
            .await
            .map_err(|e| anyhow!(e.user_message()))?;
    }

    torch.release();
    println!("Torch off");
    Ok(())
}

async fn handle_locate(config: &Config, cmd: &LocateCommand) -> anyhow::Result<()> {
    let provider = StaticLocationProvider::new(config.fixed_position());
    let position = locate(&provider, &config.location_request())
        .await
        .map_err(|e| anyhow!(e.user_message()))?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&position)?);
    } else {
        println!("{position}");
    }
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let torch_led = platform::detect_torch_led(&config.camera);
    let fixed_position = config.fixed_position();

    if json {
        let status = serde_json::json!({
            "platform": platform::platform_name(),
            "torch_led": torch_led,
            "config_path": Config::default_config_path(),
            "sound_file": config.sound_file(),
            "sound_file_present": config.sound_file().exists(),
            "fixed_position": fixed_position,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("safelight status");
        println!("----------------");
        println!("Platform:      {}", platform::platform_name());
        match &torch_led {
            Some(path) => println!("Torch LED:     {}", path.display()),
            None => println!("Torch LED:     not found"),
        }
        println!("Config:        {}", Config::default_config_path().display());
        println!(
            "Siren sound:   {}{}",
            config.sound_file().display(),
            if config.sound_file().exists() {
                ""
            } else {
                " (missing)"
            }
        );
        match fixed_position {
            Some(position) => println!(
                "Position:      {:.5}, {:.5}",
                position.latitude, position.longitude
            ),
            None => println!("Position:      not configured"),
        }
    }
    Ok(())
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = load_config(config_path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Camera]");
                match &config.camera.led_path {
                    Some(path) => println!("  LED path:           {}", path.display()),
                    None => println!("  LED path:           (autodetect)"),
                }
                println!(
                    "  LEDs root:          {}",
                    config.camera.leds_root.display()
                );
                println!();
                println!("[Siren]");
                println!("  Player:             {}", config.siren.player);
                println!("  Sound file:         {}", config.sound_file().display());
                println!("  Restart delay (ms): {}", config.siren.restart_delay_ms);
                println!();
                println!("[Location]");
                println!("  Timeout (ms):       {}", config.location.timeout_ms);
                println!("  High accuracy:      {}", config.location.high_accuracy);
                println!("  Maximum age (ms):   {}", config.location.maximum_age_ms);
                match config.fixed_position() {
                    Some(position) => println!(
                        "  Fixed position:     {:.5}, {:.5} (±{:.1}m)",
                        position.latitude, position.longitude, position.accuracy_m
                    ),
                    None => println!("  Fixed position:     (none)"),
                }
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
