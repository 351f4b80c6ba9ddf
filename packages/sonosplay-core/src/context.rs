//! Local address resolution and URL building for the media server.
//!
//! Speakers fetch audio from this machine, so every media URL must carry an
//! address they can reach. [`LocalIpResolver`] picks that address on a
//! best-effort basis and never fails: when nothing better is known it returns
//! the loopback address, and unreachable playback surfaces later as a device
//! error rather than a resolver error.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::sync::Arc;

use crate::protocol_constants::{LOOPBACK_FALLBACK, OUTBOUND_PROBE_ADDR};

/// Trait for detecting the local IP address.
///
/// Different environments may need different detection strategies.
/// This trait allows injecting the appropriate detector.
pub trait IpDetector: Send + Sync {
    /// Detects the local IP address.
    fn detect(&self) -> Result<IpAddr, NetworkError>;
}

/// Detects the outbound interface by "connecting" a UDP socket.
///
/// Connecting a datagram socket sends nothing; it only asks the OS which
/// local address would route to the target.
#[derive(Debug, Clone, Default)]
pub struct OutboundRouteDetector;

impl IpDetector for OutboundRouteDetector {
    fn detect(&self) -> Result<IpAddr, NetworkError> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .map_err(|e| NetworkError::Detection(e.to_string()))?;
        socket
            .connect(OUTBOUND_PROBE_ADDR)
            .map_err(|e| NetworkError::Detection(e.to_string()))?;
        let ip = socket
            .local_addr()
            .map_err(|e| NetworkError::Detection(e.to_string()))?
            .ip();

        // Sandboxes without a route report the unspecified address.
        if ip.is_unspecified() {
            return Err(NetworkError::Detection("no outbound route".into()));
        }
        Ok(ip)
    }
}

/// Detector using the system's network interface list.
#[derive(Debug, Clone, Default)]
pub struct LocalIpDetector;

impl IpDetector for LocalIpDetector {
    fn detect(&self) -> Result<IpAddr, NetworkError> {
        local_ip_address::local_ip().map_err(|e| NetworkError::Interface(e.to_string()))
    }
}

/// Detector that always reports a configured address.
#[derive(Debug, Clone)]
pub struct FixedIpDetector(pub IpAddr);

impl IpDetector for FixedIpDetector {
    fn detect(&self) -> Result<IpAddr, NetworkError> {
        Ok(self.0)
    }
}

/// Resolves the LAN address advertised to speakers.
///
/// Tries each detector in order and falls back to `127.0.0.1`.
#[derive(Clone)]
pub struct LocalIpResolver {
    detectors: Vec<Arc<dyn IpDetector>>,
}

impl LocalIpResolver {
    /// Outbound-route detection first, then interface enumeration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_detectors(vec![
            Arc::new(OutboundRouteDetector),
            Arc::new(LocalIpDetector),
        ])
    }

    /// Always resolves to `ip`.
    #[must_use]
    pub fn explicit(ip: IpAddr) -> Self {
        Self::with_detectors(vec![Arc::new(FixedIpDetector(ip))])
    }

    /// Uses the given detectors, in order.
    #[must_use]
    pub fn with_detectors(detectors: Vec<Arc<dyn IpDetector>>) -> Self {
        Self { detectors }
    }

    /// Returns the best available local address, or loopback.
    pub fn resolve(&self) -> String {
        for detector in &self.detectors {
            match detector.detect() {
                Ok(ip) => return ip.to_string(),
                Err(e) => log::debug!("[Network] IP detector failed: {}", e),
            }
        }
        log::warn!(
            "[Network] Could not determine LAN address, falling back to {}",
            LOOPBACK_FALLBACK
        );
        LOOPBACK_FALLBACK.to_string()
    }
}

impl Default for LocalIpResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur during network operations.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// Could not detect local IP address.
    #[error("Failed to detect local IP: {0}")]
    Detection(String),

    /// Network interface error.
    #[error("Network interface error: {0}")]
    Interface(String),
}

/// Builder for constructing URLs served by the media server.
pub struct UrlBuilder {
    ip: String,
    port: u16,
}

impl UrlBuilder {
    /// Creates a new `UrlBuilder` for the given server address.
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
        }
    }

    /// Returns the base URL for the server (e.g., `http://192.168.1.100:8080`).
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.ip, self.port)
    }

    /// Returns the URL for an already percent-encoded path segment.
    #[must_use]
    pub fn media_url(&self, url_path: &str) -> String {
        format!("{}/{}", self.base_url(), url_path.trim_start_matches('/'))
    }
}
