//! Application configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use sonosplay_core::protocol_constants::DEFAULT_DISCOVERY_TIMEOUT_SECS;
use sonosplay_core::{BootstrapConfig, DiscoveryConfig};

/// Configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Seconds to listen for speaker announcements.
    /// Override: `SONOSPLAY_DISCOVERY_TIMEOUT`
    pub discovery_timeout_secs: u64,

    /// IP address put into media URLs.
    /// This should be the IP that Sonos speakers can reach.
    /// If not specified, auto-detection will be attempted.
    /// Override: `SONOSPLAY_ADVERTISE_IP`
    pub advertise_ip: Option<IpAddr>,

    /// Enable SSDP multicast discovery.
    /// Override: `SONOSPLAY_SSDP_MULTICAST`
    pub ssdp_multicast: bool,

    /// Enable SSDP broadcast discovery.
    /// Override: `SONOSPLAY_SSDP_BROADCAST`
    pub ssdp_broadcast: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            discovery_timeout_secs: DEFAULT_DISCOVERY_TIMEOUT_SECS,
            advertise_ip: None,
            ssdp_multicast: true,
            ssdp_broadcast: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_yaml(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Some(multicast) = env_flag("SONOSPLAY_SSDP_MULTICAST") {
            self.ssdp_multicast = multicast;
        }
        if let Some(broadcast) = env_flag("SONOSPLAY_SSDP_BROADCAST") {
            self.ssdp_broadcast = broadcast;
        }

        // Note: SONOSPLAY_ADVERTISE_IP and SONOSPLAY_DISCOVERY_TIMEOUT are
        // handled by clap via #[arg(env = ...)] in main.rs
    }

    /// Converts to sonosplay-core's bootstrap inputs.
    pub fn to_bootstrap_config(&self) -> BootstrapConfig {
        BootstrapConfig {
            advertise_ip: self.advertise_ip,
            discovery_timeout: Duration::from_secs(self.discovery_timeout_secs),
            discovery: DiscoveryConfig {
                ssdp_multicast_enabled: self.ssdp_multicast,
                ssdp_broadcast_enabled: self.ssdp_broadcast,
                ..Default::default()
            },
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        other => {
            log::warn!("Ignoring {}={}: expected a boolean", name, other);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = AppConfig::from_yaml("discovery_timeout_secs: 2\nssdp_broadcast: true\n").unwrap();

        assert_eq!(config.discovery_timeout_secs, 2);
        assert!(config.ssdp_broadcast);
        assert!(config.ssdp_multicast);
        assert_eq!(config.advertise_ip, None);
    }

    #[test]
    fn bootstrap_config_carries_every_setting() {
        let config = AppConfig {
            discovery_timeout_secs: 3,
            advertise_ip: Some("192.168.1.20".parse().unwrap()),
            ssdp_multicast: false,
            ssdp_broadcast: true,
        };

        let bootstrap = config.to_bootstrap_config();

        assert_eq!(bootstrap.discovery_timeout, Duration::from_secs(3));
        assert_eq!(bootstrap.advertise_ip, config.advertise_ip);
        assert!(!bootstrap.discovery.ssdp_multicast_enabled);
        assert!(bootstrap.discovery.ssdp_broadcast_enabled);
    }

    #[test]
    fn unknown_yaml_types_are_rejected() {
        assert!(AppConfig::from_yaml("discovery_timeout_secs: soon\n").is_err());
    }
}
