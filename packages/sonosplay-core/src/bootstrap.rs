//! Application bootstrap and dependency wiring.
//!
//! The composition root: the one place where the HTTP client, discovery,
//! media server and command surface are created and wired together.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::context::LocalIpResolver;
use crate::error::{SonosPlayError, SonosPlayResult};
use crate::media::MediaServer;
use crate::protocol_constants::{DEFAULT_DISCOVERY_TIMEOUT_SECS, SOAP_TIMEOUT_SECS};
use crate::services::{PlaybackController, StopOutcome};
use crate::sonos::{DiscoveryConfig, SonosDiscovery};

/// Inputs to [`bootstrap_services`].
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Address handed to speakers in media URLs; auto-detected when `None`.
    pub advertise_ip: Option<IpAddr>,
    /// Bound on each discovery probe.
    pub discovery_timeout: Duration,
    pub discovery: DiscoveryConfig,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            advertise_ip: None,
            discovery_timeout: Duration::from_secs(DEFAULT_DISCOVERY_TIMEOUT_SECS),
            discovery: DiscoveryConfig::default(),
        }
    }
}

/// Container for all bootstrapped services.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Command surface for the front end.
    pub controller: Arc<PlaybackController>,
    /// The single-file media server owned by the controller.
    pub media: Arc<MediaServer>,
    /// Shared HTTP client used for SOAP and description fetches.
    http_client: Client,
}

impl BootstrappedServices {
    /// Returns the shared HTTP client.
    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    /// Stops whatever is playing and releases the media server.
    pub async fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");
        match self.controller.stop_active().await {
            Ok(StopOutcome::Stopped(label)) => log::info!("[Bootstrap] Stopped {}", label),
            Ok(StopOutcome::NothingPlaying) => {}
            Err(e) => log::warn!("[Bootstrap] Stop during shutdown failed: {}", e),
        }
        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Creates the shared HTTP client for all Sonos communication.
fn create_http_client() -> SonosPlayResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(SOAP_TIMEOUT_SECS))
        .build()
        .map_err(|e| SonosPlayError::NetworkUnavailable(format!("HTTP client: {}", e)))
}

/// Bootstraps all application services with their dependencies.
pub fn bootstrap_services(config: &BootstrapConfig) -> SonosPlayResult<BootstrappedServices> {
    let http_client = create_http_client()?;

    let resolver = match config.advertise_ip {
        Some(ip) => {
            log::info!("[Bootstrap] Advertising media on {}", ip);
            LocalIpResolver::explicit(ip)
        }
        None => LocalIpResolver::new(),
    };
    let media = Arc::new(MediaServer::new(resolver));

    let discovery = Arc::new(SonosDiscovery::new(
        http_client.clone(),
        config.discovery.clone(),
    ));
    let controller = Arc::new(
        PlaybackController::new(discovery, Arc::clone(&media))
            .with_discovery_timeout(config.discovery_timeout),
    );

    Ok(BootstrappedServices {
        controller,
        media,
        http_client,
    })
}
