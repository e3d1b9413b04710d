//! Application entry point — headless pitch-relay host.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Assemble the [`Controller`] and its ingestion loop with the system
//!    collaborators (serial ports, WAV store, default output device).
//! 5. Look for a device once.
//! 6. Spawn the ingestion tick, the feature tick and the status logger.
//! 7. Read commands from stdin until `quit` or EOF.
//!
//! Controller calls block (FFT, WAV writes, port opens), so every one made
//! from async code goes through [`offload`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use pitch_relay::{
    config::AppConfig,
    device::Preset,
    pipeline::{offload, status_channel, Collaborators, Controller, StatusReceiver},
    recording::RecordingState,
};

// ---------------------------------------------------------------------------
// Shell commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum ShellCommand {
    Pitch(f32),
    Reverb(f32),
    Preset(String),
    Record,
    Stop,
    Play,
    Status,
    Reconnect,
    Help,
    Quit,
}

const HELP: &str = "commands: pitch <0.5-2.0> | reverb <0-1> | preset <low|high|robot|reset> \
                    | record | stop | play | status | reconnect | quit";

fn parse_command(line: &str) -> Result<ShellCommand, String> {
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default().to_ascii_lowercase();
    let rest: Vec<&str> = words.collect();

    let number = |what: &str| -> Result<f32, String> {
        rest.first()
            .ok_or_else(|| format!("{what} needs a value"))?
            .parse::<f32>()
            .map_err(|e| format!("bad {what} value: {e}"))
            .and_then(|v| {
                if v.is_finite() {
                    Ok(v)
                } else {
                    Err(format!("bad {what} value: {v}"))
                }
            })
    };

    match verb.as_str() {
        "pitch" => number("pitch").map(ShellCommand::Pitch),
        "reverb" => number("reverb").map(ShellCommand::Reverb),
        "preset" if !rest.is_empty() => Ok(ShellCommand::Preset(rest.join(" "))),
        "preset" => Err("preset needs a name".into()),
        "record" => Ok(ShellCommand::Record),
        "stop" => Ok(ShellCommand::Stop),
        "play" => Ok(ShellCommand::Play),
        "status" => Ok(ShellCommand::Status),
        "reconnect" => Ok(ShellCommand::Reconnect),
        "help" | "?" => Ok(ShellCommand::Help),
        "quit" | "exit" => Ok(ShellCommand::Quit),
        "" => Err(String::new()),
        other => Err(format!("unknown command {other:?}")),
    }
}

/// Apply one command.  Returns `false` when the shell should exit.
fn dispatch(controller: &Controller, command: ShellCommand) -> bool {
    match command {
        ShellCommand::Pitch(factor) => {
            let delivery = controller.set_pitch(factor);
            log::info!("pitch {:.2} ({delivery:?})", controller.control_state().pitch);
        }
        ShellCommand::Reverb(mix) => {
            let delivery = controller.set_reverb(mix);
            log::info!("reverb {:.2} ({delivery:?})", controller.control_state().reverb);
        }
        ShellCommand::Preset(name) => match controller.apply_preset(&name) {
            Ok(delivery) => log::info!("preset {name} ({delivery:?})"),
            Err(e) => {
                let names: Vec<&str> = Preset::ALL.iter().map(|p| p.label()).collect();
                log::warn!("{e}; known presets: {}", names.join(", "));
            }
        },
        ShellCommand::Record => {
            controller.start_recording();
        }
        ShellCommand::Stop => {
            controller.stop_recording();
        }
        ShellCommand::Play => {
            controller.play_last_recording();
        }
        ShellCommand::Status => {
            let controls = controller.control_state();
            log::info!(
                "link {} ({}) | recording {} | pitch {:.2} reverb {:.2} | level {:.3}",
                controller.connection_status().label(),
                controller.port().as_deref().unwrap_or("-"),
                controller.recording_state().label(),
                controls.pitch,
                controls.reverb,
                controller.get_peak_level(),
            );
        }
        ShellCommand::Reconnect => {
            controller.reconnect();
        }
        ShellCommand::Help => log::info!("{HELP}"),
        ShellCommand::Quit => return false,
    }
    true
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

/// Stand-in for a UI redraw: pull a feature frame every `period` and log the
/// meter.
async fn feature_tick(
    controller: Arc<Controller>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let frame = match offload(&controller, Controller::extract_frame).await {
                    Ok(frame) => frame,
                    Err(e) => {
                        log::error!("feature tick failed: {e}");
                        continue;
                    }
                };
                log::debug!(
                    "level {:.3} | spectrogram {}x{}",
                    frame.level,
                    frame.spectrogram.bins,
                    frame.spectrogram.frames,
                );
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

/// Status events are already logged when emitted; drain the channel so the
/// shell has a single consumer.
async fn drain_status(mut status_rx: StatusReceiver) {
    while status_rx.recv().await.is_some() {}
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("pitch-relay starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e:#}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(run(config))
}

async fn run(config: AppConfig) -> Result<()> {
    // 4. Core
    let (status_tx, status_rx) = status_channel();
    let (controller, ingest) =
        Controller::assemble(&config, Collaborators::system(&config), status_tx);
    let controller = Arc::new(controller);

    // 5. Device
    offload(&controller, Controller::reconnect)
        .await
        .context("device discovery task failed")?;

    // 6. Ticks
    let (stop_tx, stop_rx) = watch::channel(false);
    let ingest_task = tokio::spawn(ingest.run(config.timing.ingest_tick(), stop_rx.clone()));
    let feature_task = tokio::spawn(feature_tick(
        Arc::clone(&controller),
        config.timing.feature_tick(),
        stop_rx,
    ));
    tokio::spawn(drain_status(status_rx));

    // 7. Command loop
    log::info!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        match parse_command(&line) {
            Ok(command) => match offload(&controller, move |c| dispatch(c, command)).await {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => log::error!("command failed: {e}"),
            },
            Err(msg) if msg.is_empty() => {}
            Err(msg) => log::warn!("{msg}"),
        }
    }

    if controller.recording_state() == RecordingState::Recording {
        offload(&controller, Controller::stop_recording)
            .await
            .context("final save failed")?;
    }

    let _ = stop_tx.send(true);
    let _ = ingest_task.await;
    let _ = feature_task.await;
    log::info!("pitch-relay stopped");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_commands() {
        assert_eq!(parse_command("pitch 1.5"), Ok(ShellCommand::Pitch(1.5)));
        assert_eq!(parse_command("REVERB 0.3"), Ok(ShellCommand::Reverb(0.3)));
        assert!(parse_command("pitch").is_err());
        assert!(parse_command("pitch high").is_err());
        assert!(parse_command("pitch nan").is_err());
        assert!(parse_command("reverb inf").is_err());
    }

    #[test]
    fn preset_keeps_multi_word_names() {
        assert_eq!(
            parse_command("preset Low Voice"),
            Ok(ShellCommand::Preset("Low Voice".into()))
        );
        assert!(parse_command("preset").is_err());
    }

    #[test]
    fn bare_verbs() {
        assert_eq!(parse_command("record"), Ok(ShellCommand::Record));
        assert_eq!(parse_command("  stop "), Ok(ShellCommand::Stop));
        assert_eq!(parse_command("exit"), Ok(ShellCommand::Quit));
        assert_eq!(parse_command(""), Err(String::new()));
        assert!(parse_command("dance").is_err());
    }
}
