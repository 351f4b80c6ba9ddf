//! Sonos speaker discovery.
//!
//! # Discovery Pipeline
//!
//! 1. Probe with SSDP multicast and broadcast in parallel (each optional)
//! 2. Merge answers by normalized RINCON UUID
//! 3. Fetch each speaker's device description for its room name; speakers
//!    whose description cannot be read are dropped
//! 4. Read the zone group topology once to hide stereo-pair halves and seed
//!    every device's group membership
//!
//! Steps 3 and 4 share one deadline: the probe window plus the description
//! and topology timeouts. Whatever has been gathered when it passes is used.

pub mod description;
pub mod ssdp;
pub mod types;

pub use types::{
    normalize_uuid, DeviceDescription, DiscoveredSpeaker, DiscoveryError, DiscoveryMethod,
    DiscoveryResult,
};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use tokio::time::{sleep_until, timeout, timeout_at, Instant};

use self::description::{default_location, fetch_device_description};
use self::ssdp::SsdpConfig;
use crate::protocol_constants::{DESCRIPTION_FETCH_TIMEOUT_SECS, TOPOLOGY_FETCH_TIMEOUT_SECS};
use crate::sonos::device::SonosDevice;
use crate::sonos::traits::{DeviceDiscovery, Player};
use crate::sonos::types::{find_group, is_invisible, ZoneGroup};
use crate::sonos::zone_groups::get_zone_groups;

/// Configuration for [`SonosDiscovery`].
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Enable SSDP multicast discovery.
    pub ssdp_multicast_enabled: bool,
    /// Enable SSDP broadcast discovery.
    pub ssdp_broadcast_enabled: bool,
    /// SSDP configuration.
    pub ssdp: SsdpConfig,
    /// Timeout for fetching device descriptions.
    pub description_fetch_timeout: Duration,
    /// Timeout for one topology read.
    pub topology_fetch_timeout: Duration,
    /// Maximum concurrent device description fetches.
    pub max_concurrent_fetches: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            ssdp_multicast_enabled: true,
            ssdp_broadcast_enabled: false,
            ssdp: SsdpConfig::default(),
            description_fetch_timeout: Duration::from_secs(DESCRIPTION_FETCH_TIMEOUT_SECS),
            topology_fetch_timeout: Duration::from_secs(TOPOLOGY_FETCH_TIMEOUT_SECS),
            max_concurrent_fetches: 8,
        }
    }
}

/// Discovers Sonos speakers and wraps them as [`SonosDevice`] players.
pub struct SonosDiscovery {
    config: DiscoveryConfig,
    client: Client,
}

impl SonosDiscovery {
    /// Creates a discovery service.
    ///
    /// `client` is handed to every discovered device for SOAP control.
    pub fn new(client: Client, config: DiscoveryConfig) -> Self {
        Self { config, client }
    }

    /// Creates a discovery service with default configuration.
    pub fn with_defaults(client: Client) -> Self {
        Self::new(client, DiscoveryConfig::default())
    }

    /// Runs the full discovery pipeline.
    ///
    /// Probing lasts `window`. The whole call returns by
    /// `window + description_fetch_timeout + topology_fetch_timeout`.
    ///
    /// # Errors
    /// `AllMethodsFailed` when every enabled probe errored (no interfaces,
    /// sockets unavailable). An empty network is `Ok(vec![])`.
    pub async fn discover_speakers(&self, window: Duration) -> DiscoveryResult<Vec<SonosDevice>> {
        let deadline = Instant::now()
            + window
            + self.config.description_fetch_timeout
            + self.config.topology_fetch_timeout;
        log::info!(
            "[Discovery] Starting discovery (multicast={}, broadcast={}, window={}ms)",
            self.config.ssdp_multicast_enabled,
            self.config.ssdp_broadcast_enabled,
            window.as_millis()
        );

        let run = |enabled: bool, method: DiscoveryMethod| async move {
            if enabled {
                Some(ssdp::probe(&self.config.ssdp, method, window).await)
            } else {
                None
            }
        };

        let (multicast, broadcast) = tokio::join!(
            run(
                self.config.ssdp_multicast_enabled,
                DiscoveryMethod::SsdpMulticast
            ),
            run(
                self.config.ssdp_broadcast_enabled,
                DiscoveryMethod::SsdpBroadcast
            ),
        );

        let mut failures = 0;
        let mut succeeded = 0;
        let mut by_uuid: BTreeMap<String, DiscoveredSpeaker> = BTreeMap::new();
        for (method, result) in [
            (DiscoveryMethod::SsdpMulticast, multicast),
            (DiscoveryMethod::SsdpBroadcast, broadcast),
        ] {
            match result {
                None => {}
                Some(Ok(speakers)) => {
                    succeeded += 1;
                    log::info!("[Discovery] {} found {} speaker(s)", method, speakers.len());
                    for speaker in speakers {
                        match by_uuid.get_mut(&speaker.uuid) {
                            Some(existing) => existing.merge(speaker),
                            None => {
                                by_uuid.insert(speaker.uuid.clone(), speaker);
                            }
                        }
                    }
                }
                Some(Err(e)) => {
                    failures += 1;
                    log::warn!("[Discovery] {} failed: {}", method, e);
                }
            }
        }

        if succeeded == 0 && failures > 0 {
            return Err(DiscoveryError::AllMethodsFailed);
        }

        let described = self
            .fetch_descriptions(by_uuid.into_values().collect(), deadline)
            .await;
        let topology = self.fetch_topology(&described, deadline).await;

        let mut devices: Vec<SonosDevice> = described
            .into_iter()
            .filter_map(|(speaker, name)| {
                let device =
                    SonosDevice::new(speaker.uuid.clone(), name, speaker.ip, self.client.clone());
                let Some(groups) = topology.as_deref() else {
                    return Some(device);
                };
                if is_invisible(groups, &speaker.uuid) {
                    log::debug!("[Discovery] Hiding invisible member {}", speaker.uuid);
                    return None;
                }
                Some(match find_group(groups, &speaker.uuid) {
                    Some(group) => device.with_group_info(group.group_info()),
                    None => device,
                })
            })
            .collect();

        devices.sort_by(|a, b| a.display_name().cmp(b.display_name()));

        log::info!("[Discovery] Returning {} speaker(s)", devices.len());
        Ok(devices)
    }

    /// Resolves room names, dropping speakers whose description is unreadable
    /// or still pending at `deadline`.
    async fn fetch_descriptions(
        &self,
        discovered: Vec<DiscoveredSpeaker>,
        deadline: Instant,
    ) -> Vec<(DiscoveredSpeaker, String)> {
        let timeout = self.config.description_fetch_timeout;

        let mut described: Vec<_> = stream::iter(discovered)
            .map(|speaker| async move {
                let location = speaker
                    .location
                    .clone()
                    .unwrap_or_else(|| default_location(&speaker.ip));
                match fetch_device_description(&self.client, &location, timeout).await {
                    Ok(desc) => {
                        if desc.uuid != speaker.uuid {
                            log::debug!(
                                "[Discovery] Description UDN {} differs from USN {}",
                                desc.uuid,
                                speaker.uuid
                            );
                        }
                        let name = desc.display_name().to_string();
                        Some((speaker, name))
                    }
                    Err(e) => {
                        log::warn!("[Discovery] Dropping {}: {}", speaker.uuid, e);
                        None
                    }
                }
            })
            .buffer_unordered(self.config.max_concurrent_fetches.max(1))
            .filter_map(|entry| async move { entry })
            .take_until(sleep_until(deadline))
            .collect()
            .await;

        described.sort_by(|a, b| a.0.uuid.cmp(&b.0.uuid));
        described
    }

    /// Reads zone topology from the first speaker that answers.
    ///
    /// Speakers are asked concurrently; `None` if none answers by `deadline`.
    async fn fetch_topology(
        &self,
        described: &[(DiscoveredSpeaker, String)],
        deadline: Instant,
    ) -> Option<Vec<ZoneGroup>> {
        let per_call = self.config.topology_fetch_timeout;
        let probes: Vec<_> = described
            .iter()
            .map(|(speaker, _)| async move {
                let ip = speaker.ip.as_str();
                (
                    ip,
                    timeout(per_call, get_zone_groups(&self.client, ip)).await,
                )
            })
            .collect();
        let mut answers =
            stream::iter(probes).buffer_unordered(self.config.max_concurrent_fetches.max(1));

        let first = async {
            while let Some((ip, answer)) = answers.next().await {
                match answer {
                    Ok(Ok(groups)) if !groups.is_empty() => return Some(groups),
                    Ok(Ok(_)) => log::debug!("[Discovery] Empty topology from {}", ip),
                    Ok(Err(e)) => log::warn!("[Discovery] Topology from {} failed: {}", ip, e),
                    Err(_) => log::warn!("[Discovery] Topology from {} timed out", ip),
                }
            }
            None
        };

        timeout_at(deadline, first).await.unwrap_or_else(|_| {
            log::warn!("[Discovery] No topology before the discovery deadline");
            None
        })
    }
}

#[async_trait]
impl DeviceDiscovery for SonosDiscovery {
    async fn discover(&self, timeout: Duration) -> Vec<Arc<dyn Player>> {
        match self.discover_speakers(timeout).await {
            Ok(devices) => devices
                .into_iter()
                .map(|d| Arc::new(d) as Arc<dyn Player>)
                .collect(),
            Err(e) => {
                log::warn!("[Discovery] No speakers: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    use tokio::net::TcpListener;

    /// Accepts connections on `addr` and never answers them.
    async fn silent_listener(addr: SocketAddr) -> SocketAddr {
        let listener = TcpListener::bind(addr).await.unwrap();
        let local = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        local
    }

    fn discovery(config: DiscoveryConfig) -> SonosDiscovery {
        SonosDiscovery::new(Client::new(), config)
    }

    fn speaker(ip: &str, uuid: &str, location: Option<String>) -> DiscoveredSpeaker {
        DiscoveredSpeaker::new(
            ip.to_string(),
            uuid,
            location,
            DiscoveryMethod::SsdpMulticast,
        )
    }

    #[tokio::test]
    async fn silent_descriptions_are_cut_off_at_the_deadline() {
        let addr = silent_listener("127.0.0.1:0".parse().unwrap()).await;
        let location = format!("http://{}/xml/device_description.xml", addr);
        let service = discovery(DiscoveryConfig {
            description_fetch_timeout: Duration::from_secs(10),
            ..Default::default()
        });
        let speakers = vec![
            speaker("127.0.0.1", "RINCON_A", Some(location.clone())),
            speaker("127.0.0.1", "RINCON_B", Some(location)),
        ];

        let started = std::time::Instant::now();
        let described = service
            .fetch_descriptions(speakers, Instant::now() + Duration::from_millis(300))
            .await;

        assert!(described.is_empty());
        assert!(
            started.elapsed() < Duration::from_secs(2),
            "{:?}",
            started.elapsed()
        );
    }

    // Topology is always read on the control port, so the silent speakers
    // need their own loopback addresses.
    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn silent_speakers_do_not_stall_topology() {
        let ips = ["127.0.0.77", "127.0.0.78", "127.0.0.79"];
        for ip in ips {
            let addr = format!("{}:{}", ip, crate::protocol_constants::SONOS_PORT);
            silent_listener(addr.parse().unwrap()).await;
        }
        let described: Vec<_> = ips
            .iter()
            .map(|ip| (speaker(ip, &format!("RINCON_{}", ip), None), ip.to_string()))
            .collect();

        // Each call times out quickly.
        let service = discovery(DiscoveryConfig {
            topology_fetch_timeout: Duration::from_millis(200),
            ..Default::default()
        });
        let started = std::time::Instant::now();
        let topology = service
            .fetch_topology(&described, Instant::now() + Duration::from_secs(5))
            .await;
        assert!(topology.is_none());
        assert!(
            started.elapsed() < Duration::from_secs(2),
            "{:?}",
            started.elapsed()
        );

        // The shared deadline wins over a long per-call timeout.
        let service = discovery(DiscoveryConfig {
            topology_fetch_timeout: Duration::from_secs(10),
            ..Default::default()
        });
        let started = std::time::Instant::now();
        let topology = service
            .fetch_topology(&described, Instant::now() + Duration::from_millis(300))
            .await;
        assert!(topology.is_none());
        assert!(
            started.elapsed() < Duration::from_secs(2),
            "{:?}",
            started.elapsed()
        );
    }
}
