//! SonosPlay - play a local audio file on Sonos speakers.
//!
//! Discovers speakers, groups them by coordinator and streams one file to the
//! chosen group from a short-lived HTTP server on this machine.

mod config;
mod shell;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use serde::Serialize;
use sonosplay_core::{bootstrap_services, BootstrappedServices, Group, Player};
use tokio::signal;

use crate::config::AppConfig;

/// SonosPlay - play a local audio file on Sonos speakers.
#[derive(Parser, Debug)]
#[command(name = "sonosplay")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "warn", env = "SONOSPLAY_LOG_LEVEL", global = true)]
    log_level: log::LevelFilter,

    /// Advertise IP address (overrides config file).
    #[arg(short = 'a', long, env = "SONOSPLAY_ADVERTISE_IP", global = true)]
    advertise_ip: Option<std::net::IpAddr>,

    /// Discovery window in seconds (overrides config file).
    #[arg(short = 't', long, env = "SONOSPLAY_DISCOVERY_TIMEOUT", global = true)]
    discovery_timeout: Option<u64>,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Discover speakers and print their groups.
    List {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Play a file on a group until interrupted.
    Play {
        /// Audio file to serve.
        file: PathBuf,
        /// Group label, as printed by `list`.
        #[arg(short, long)]
        group: String,
        /// Volume to set on every member before playing.
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        volume: Option<u8>,
    },
    /// Interactive shell (default).
    Shell,
}

#[derive(Serialize)]
struct GroupSummary {
    label: String,
    coordinator: String,
    members: Vec<MemberSummary>,
}

#[derive(Serialize)]
struct MemberSummary {
    id: String,
    name: String,
    volume: Option<u8>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("SonosPlay v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(ip) = args.advertise_ip {
        config.advertise_ip = Some(ip);
    }
    if let Some(secs) = args.discovery_timeout {
        config.discovery_timeout_secs = secs;
    }
    log::info!(
        "Configuration: discovery_timeout={}s, advertise_ip={}, multicast={}, broadcast={}",
        config.discovery_timeout_secs,
        config
            .advertise_ip
            .map_or_else(|| "auto".to_string(), |ip| ip.to_string()),
        config.ssdp_multicast,
        config.ssdp_broadcast
    );

    let services = bootstrap_services(&config.to_bootstrap_config())
        .context("Failed to bootstrap services")?;

    let result = match args.command.unwrap_or(Cmd::Shell) {
        Cmd::List { json } => list(&services, json).await,
        Cmd::Play {
            file,
            group,
            volume,
        } => play(&services, file, &group, volume).await,
        Cmd::Shell => {
            shell::run(services.controller.clone()).await;
            Ok(())
        }
    };

    services.shutdown().await;
    result
}

async fn list(services: &BootstrappedServices, json: bool) -> Result<()> {
    let groups = services.controller.refresh_groups().await;
    let summaries = join_all(groups.iter().map(|g| summarize(g))).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No speakers found.");
    }
    for group in &summaries {
        println!("{}", group.label);
        for member in &group.members {
            let role = if member.id == group.coordinator {
                " (coordinator)"
            } else {
                ""
            };
            let volume = member
                .volume
                .map_or_else(|| "?".to_string(), |v| v.to_string());
            println!("  - {}{}  volume {}", member.name, role, volume);
        }
    }
    Ok(())
}

async fn summarize(group: &Group) -> GroupSummary {
    let volumes = join_all(group.members.iter().map(|m| m.volume())).await;
    GroupSummary {
        label: group.label.clone(),
        coordinator: group.coordinator.id().to_string(),
        members: group
            .members
            .iter()
            .zip(volumes)
            .map(|(member, volume)| MemberSummary {
                id: member.id().to_string(),
                name: member.display_name().to_string(),
                volume: volume.ok(),
            })
            .collect(),
    }
}

async fn play(
    services: &BootstrappedServices,
    file: PathBuf,
    group: &str,
    volume: Option<u8>,
) -> Result<()> {
    let controller = &services.controller;
    let groups = controller.refresh_groups().await;
    controller.select_group(group).with_context(|| {
        let known: Vec<_> = groups.iter().map(|g| g.label.as_str()).collect();
        format!("Available groups: {}", known.join(", "))
    })?;

    if let Some(level) = volume {
        let report = controller.set_volume(group, level).await?;
        if !report.is_complete() {
            log::warn!(
                "Volume {} applied to {} of {} speakers",
                level,
                report.success,
                report.total
            );
        }
    }

    let outcome = controller
        .play_selected(&file)
        .await
        .with_context(|| format!("Failed to play {}", file.display()))?;
    println!("Playing {} on {}", file.display(), outcome.label);
    println!("Serving {} (Ctrl+C to stop)", outcome.url);

    shutdown_signal().await;
    log::info!("Shutdown signal received, cleaning up...");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
