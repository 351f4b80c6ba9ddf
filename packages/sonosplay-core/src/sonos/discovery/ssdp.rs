//! SSDP-based Sonos speaker discovery.
//!
//! Supports both multicast (239.255.255.250) and broadcast probing for
//! networks with different multicast configurations.
//!
//! Each interface gets one socket used for both send and receive, since
//! devices reply unicast to the sending socket/port.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use local_ip_address::list_afinet_netifas;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::time::{timeout_at, Instant};

use super::types::{
    is_virtual_interface, DiscoveredSpeaker, DiscoveryError, DiscoveryMethod, DiscoveryResult,
};

/// Standard SSDP multicast address and port.
const MULTICAST_ADDR: &str = "239.255.255.250:1900";

/// Limited broadcast address for fallback.
const LIMITED_BROADCAST_ADDR: &str = "255.255.255.255:1900";

/// SSDP search target for Sonos ZonePlayer devices.
const SONOS_SEARCH_TARGET: &str = "urn:schemas-upnp-org:device:ZonePlayer:1";

/// Largest SSDP datagram we care to read.
const RECV_BUFFER_SIZE: usize = 2048;

/// Build the M-SEARCH message.
///
/// HOST always names the multicast address, even when sent via broadcast.
fn build_msearch_message(mx: u64) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: 239.255.255.250:1900\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {}\r\n\
         ST: {}\r\n\r\n",
        mx, SONOS_SEARCH_TARGET
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Header Parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Finds `needle` in `haystack`, ASCII case-insensitively.
fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Returns the value of header `name` (case-insensitive), trimmed.
fn header_value<'a>(response: &'a str, name: &str) -> Option<&'a str> {
    response.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
    })
}

/// Parses an SSDP response into a discovered speaker.
///
/// Returns None unless the USN carries a RINCON UUID.
fn parse_ssdp_response(
    response: &str,
    src_ip: &str,
    method: DiscoveryMethod,
) -> Option<DiscoveredSpeaker> {
    let usn = header_value(response, "usn")?;
    let uuid_start = find_ignore_ascii_case(usn, "uuid:")? + "uuid:".len();
    let uuid = usn[uuid_start..].split("::").next()?;

    // Sonos UUIDs are always uppercase RINCON_.
    if !uuid.starts_with("RINCON_") {
        return None;
    }

    let location = header_value(response, "location")
        .filter(|l| !l.is_empty())
        .map(str::to_string);

    Some(DiscoveredSpeaker::new(
        src_ip.to_string(),
        uuid,
        location,
        method,
    ))
}

// ─────────────────────────────────────────────────────────────────────────────
// Interfaces & Sockets
// ─────────────────────────────────────────────────────────────────────────────

/// Network interface used for probing.
#[derive(Debug, Clone)]
pub struct InterfaceInfo {
    /// Interface name (e.g., "en0", "eth0").
    pub name: String,
    /// IPv4 address bound to this interface.
    pub ip: Ipv4Addr,
    /// Directed broadcast address, assuming a /24.
    pub broadcast: Ipv4Addr,
}

/// Gets all non-virtual, non-loopback IPv4 interfaces.
pub fn get_interfaces() -> Vec<InterfaceInfo> {
    let interfaces = match list_afinet_netifas() {
        Ok(list) => list,
        Err(e) => {
            log::warn!("[Discovery] Failed to list network interfaces: {}", e);
            return Vec::new();
        }
    };

    interfaces
        .into_iter()
        .filter_map(|(name, addr)| match addr {
            _ if is_virtual_interface(&name) => None,
            IpAddr::V4(ip) if !ip.is_loopback() => {
                let [a, b, c, _] = ip.octets();
                Some(InterfaceInfo {
                    name,
                    ip,
                    broadcast: Ipv4Addr::new(a, b, c, 255),
                })
            }
            _ => None,
        })
        .collect()
}

/// Creates a non-blocking UDP socket bound to `iface_ip` on an ephemeral port.
///
/// Option failures other than bind are logged and tolerated.
fn create_socket(iface_ip: Ipv4Addr, enable_broadcast: bool) -> DiscoveryResult<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(DiscoveryError::SocketBind)?;

    if let Err(e) = socket.set_reuse_address(true) {
        log::warn!("[Discovery] SO_REUSEADDR on {}: {}", iface_ip, e);
    }
    // UPnP 1.0 recommends TTL 4 for SSDP multicast
    if let Err(e) = socket.set_multicast_ttl_v4(4) {
        log::warn!("[Discovery] Multicast TTL on {}: {}", iface_ip, e);
    }
    if enable_broadcast {
        if let Err(e) = socket.set_broadcast(true) {
            log::warn!("[Discovery] SO_BROADCAST on {}: {}", iface_ip, e);
        }
    }

    socket
        .set_nonblocking(true)
        .map_err(DiscoveryError::SocketBind)?;
    socket
        .bind(&SocketAddr::new(IpAddr::V4(iface_ip), 0).into())
        .map_err(DiscoveryError::SocketBind)?;

    UdpSocket::from_std(socket.into()).map_err(DiscoveryError::SocketBind)
}

// ─────────────────────────────────────────────────────────────────────────────
// Probe
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for SSDP discovery.
#[derive(Debug, Clone)]
pub struct SsdpConfig {
    /// Number of M-SEARCH packets to send.
    pub send_count: u64,
    /// Delay between M-SEARCH retries.
    pub retry_delay: Duration,
    /// MX value (max response delay in seconds).
    pub mx_value: u64,
}

impl Default for SsdpConfig {
    fn default() -> Self {
        Self {
            send_count: 3,
            retry_delay: Duration::from_millis(800),
            mx_value: 1,
        }
    }
}

/// Probes every usable interface with `method` for at most `window`.
///
/// Responses are deduplicated by normalized UUID and returned sorted by UUID.
///
/// # Errors
/// `NoInterfaces` when no interface exists or none could get a socket.
pub async fn probe(
    config: &SsdpConfig,
    method: DiscoveryMethod,
    window: Duration,
) -> DiscoveryResult<Vec<DiscoveredSpeaker>> {
    let use_broadcast = method == DiscoveryMethod::SsdpBroadcast;

    let sockets: Vec<_> = get_interfaces()
        .into_iter()
        .filter_map(|iface| match create_socket(iface.ip, use_broadcast) {
            Ok(socket) => Some((iface, socket)),
            Err(e) => {
                log::warn!(
                    "[Discovery] No socket for {} ({}): {}",
                    iface.name,
                    iface.ip,
                    e
                );
                None
            }
        })
        .collect();

    if sockets.is_empty() {
        return Err(DiscoveryError::NoInterfaces);
    }

    log::debug!(
        "[Discovery] {} on {} interface(s) for {}ms",
        method,
        sockets.len(),
        window.as_millis()
    );

    let msg = build_msearch_message(config.mx_value);
    let deadline = Instant::now() + window;

    let per_interface = sockets.iter().map(|(iface, socket)| {
        let targets = if use_broadcast {
            vec![
                format!("{}:1900", iface.broadcast),
                LIMITED_BROADCAST_ADDR.to_string(),
            ]
        } else {
            vec![MULTICAST_ADDR.to_string()]
        };
        probe_interface(config, method, iface, socket, targets, &msg, deadline)
    });

    let mut by_uuid: BTreeMap<String, DiscoveredSpeaker> = BTreeMap::new();
    for speaker in futures::future::join_all(per_interface)
        .await
        .into_iter()
        .flatten()
    {
        match by_uuid.get_mut(&speaker.uuid) {
            Some(existing) => existing.merge(speaker),
            None => {
                by_uuid.insert(speaker.uuid.clone(), speaker);
            }
        }
    }

    log::debug!(
        "[Discovery] {} complete: {} unique speaker(s)",
        method,
        by_uuid.len()
    );

    Ok(by_uuid.into_values().collect())
}

/// Sends M-SEARCH bursts while collecting replies on one socket until `deadline`.
async fn probe_interface(
    config: &SsdpConfig,
    method: DiscoveryMethod,
    iface: &InterfaceInfo,
    socket: &UdpSocket,
    targets: Vec<String>,
    msg: &str,
    deadline: Instant,
) -> Vec<DiscoveredSpeaker> {
    let send = async {
        for attempt in 0..config.send_count {
            if attempt > 0 {
                tokio::time::sleep(config.retry_delay).await;
            }
            for target in &targets {
                if let Err(e) = socket.send_to(msg.as_bytes(), target.as_str()).await {
                    log::warn!(
                        "[Discovery] M-SEARCH on {} to {} failed (attempt {}): {}",
                        iface.name,
                        target,
                        attempt + 1,
                        e
                    );
                }
            }
        }
    };

    let recv = async {
        let mut found = Vec::new();
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        loop {
            match timeout_at(deadline, socket.recv_from(&mut buf)).await {
                Ok(Ok((len, src))) => {
                    let response = String::from_utf8_lossy(&buf[..len]);
                    if let Some(speaker) =
                        parse_ssdp_response(&response, &src.ip().to_string(), method)
                    {
                        log::trace!(
                            "[Discovery] {} answered via {} ({})",
                            speaker.uuid,
                            iface.name,
                            method
                        );
                        found.push(speaker);
                    }
                }
                Ok(Err(e)) => {
                    log::warn!("[Discovery] Recv error on {}: {}", iface.name, e);
                }
                Err(_) => break,
            }
        }
        found
    };

    // Retries scheduled past the deadline are dropped.
    let (_, found) = tokio::join!(timeout_at(deadline, send), recv);
    found
}
