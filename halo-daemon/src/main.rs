mod commands;

use anyhow::{Context, Result};
use commands::{Command, HELP};
use halo_core::AppConfig;
use halo_hue::HueBridge;
use halo_spotify::{HttpArtworkFetcher, SpotifyClient};
use halo_sync::{Collaborators, SyncController, SyncEvent};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    println!("Halo starting...");

    let env_file = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(env_file.as_deref()).context("Failed to load configuration")?;

    let bridge = HueBridge::new(&config.hue).context("Failed to create bridge client")?;
    let playback =
        SpotifyClient::new(&config.spotify).context("Failed to create playback client")?;
    let artwork = HttpArtworkFetcher::new().context("Failed to create artwork client")?;
    info!("Bridge at {}, lights {:?}", config.hue.bridge_ip, config.sync.light_ids);

    let collaborators = Collaborators {
        playback: Arc::new(playback),
        artwork: Arc::new(artwork),
        bridge: Arc::new(bridge),
    };
    let controller = SyncController::new(collaborators, config.sync)?;

    tokio::spawn(report_events(controller.subscribe()));

    match controller.start().await {
        Ok(()) => println!("Sync running. Type 'help' for commands."),
        Err(e) => println!("Could not start sync: {}. Type 'test' to check connectivity.", e),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read command")?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                None
            }
        };
        let Some(line) = line else { break };

        match commands::parse(&line) {
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => {
                if let Err(e) = run_command(&controller, command).await {
                    println!("Error: {:#}", e);
                }
            }
            Ok(None) => {}
            Err(e) => println!("{:#}", e),
        }
    }

    if controller.is_running() {
        controller.stop().await?;
    }
    println!("Halo stopped.");
    Ok(())
}

async fn run_command(controller: &SyncController, command: Command) -> Result<()> {
    match command {
        Command::Start => {
            controller.start().await?;
            println!("Sync started.");
        }
        Command::Stop => {
            controller.stop().await?;
            println!("Sync stopped.");
        }
        Command::Status => {
            println!("{}", serde_json::to_string_pretty(&controller.status())?);
        }
        Command::Lights => {
            for light in controller.list_lights().await? {
                let color = match (light.current_color, light.color_capable) {
                    (Some(color), _) => format!("  {}", color.to_hex()),
                    (None, true) => String::new(),
                    (None, false) => "  (no color)".to_string(),
                };
                println!(
                    "{:>4}  {:<24} {:<24} on={} reachable={}{}",
                    light.id, light.name, light.kind, light.on, light.reachable, color
                );
            }
        }
        Command::Groups => {
            for group in controller.list_groups().await? {
                println!(
                    "{:>4}  {:<24} {:<10} {:<14} lights {:?}",
                    group.id, group.name, group.kind, group.class, group.lights
                );
            }
        }
        Command::Test => {
            let report = controller.test_connection().await;
            println!(
                "playback service: {}, lighting bridge: {}",
                reachability(report.playback),
                reachability(report.lighting)
            );
        }
        Command::Once => match controller.sync_once().await? {
            Some(cycle) => println!("{}", serde_json::to_string_pretty(&cycle.outcome)?),
            None => println!("Nothing playing."),
        },
        Command::Set(update) => {
            let config = controller.update_config(update)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
    Ok(())
}

fn reachability(ok: bool) -> &'static str {
    if ok {
        "reachable"
    } else {
        "unreachable"
    }
}

async fn report_events(mut events: tokio::sync::broadcast::Receiver<SyncEvent>) {
    loop {
        match events.recv().await {
            Ok(SyncEvent::TrackChanged { track, palette, outcome }) => {
                let colors: Vec<String> = palette.iter().map(|c| c.to_hex()).collect();
                println!("Now playing: {} - {} [{}]", track.name, track.artist, colors.join(" "));
                if let Some(report) = outcome.report() {
                    for (light, reason) in &report.failed {
                        warn!("Light {} was not updated: {}", light, reason);
                    }
                }
            }
            Ok(SyncEvent::PlaybackStopped) => println!("Playback stopped."),
            Ok(SyncEvent::TickFailed { message }) => println!("Sync error: {}", message),
            Ok(SyncEvent::Started) | Ok(SyncEvent::Stopped) => {}
            Err(RecvError::Lagged(missed)) => warn!("Missed {} sync events", missed),
            Err(RecvError::Closed) => break,
        }
    }
}
