//! Shared types for Sonos speaker discovery.

use std::collections::BTreeSet;

use thiserror::Error;

/// How a speaker answered the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiscoveryMethod {
    /// SSDP multicast to 239.255.255.250:1900
    SsdpMulticast,
    /// SSDP broadcast (directed per-interface + limited 255.255.255.255)
    SsdpBroadcast,
}

impl std::fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SsdpMulticast => write!(f, "SSDP multicast"),
            Self::SsdpBroadcast => write!(f, "SSDP broadcast"),
        }
    }
}

/// Errors that can occur inside a discovery probe.
///
/// These never escape `DeviceDiscovery::discover`, which degrades to an
/// empty result.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Failed to bind UDP socket for discovery.
    #[error("failed to bind UDP socket: {0}")]
    SocketBind(#[source] std::io::Error),

    /// No usable network interfaces found.
    #[error("no usable network interfaces found")]
    NoInterfaces,

    /// Every enabled probe method failed.
    #[error("all discovery methods failed")]
    AllMethodsFailed,

    /// Device description could not be fetched.
    #[error("device description unavailable from {url}: {reason}")]
    Description { url: String, reason: String },

    /// Device description lacked the fields needed to identify the speaker.
    #[error("not a Sonos device: {0}")]
    NotSonosDevice(String),
}

/// Convenient Result alias for speaker discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// A probe responder before its device description has been read.
#[derive(Debug, Clone)]
pub struct DiscoveredSpeaker {
    /// Source IP of the SSDP response.
    pub ip: String,
    /// Normalized RINCON UUID.
    pub uuid: String,
    /// SSDP LOCATION URL if the response carried one.
    pub location: Option<String>,
    /// Which probe methods reached this speaker.
    pub methods: BTreeSet<DiscoveryMethod>,
}

impl DiscoveredSpeaker {
    pub fn new(ip: String, uuid: &str, location: Option<String>, method: DiscoveryMethod) -> Self {
        Self {
            ip,
            uuid: normalize_uuid(uuid),
            location,
            methods: BTreeSet::from([method]),
        }
    }

    /// Folds a duplicate answer for the same speaker into this one.
    pub fn merge(&mut self, other: DiscoveredSpeaker) {
        self.methods.extend(other.methods);
        if self.location.is_none() {
            self.location = other.location;
        }
    }
}

/// Identity read from a speaker's device description document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescription {
    /// Canonical UUID from the root device's UDN.
    pub uuid: String,
    /// `roomName`, present on current firmware.
    pub room_name: Option<String>,
    /// UPnP `friendlyName` of the root device.
    pub friendly_name: String,
}

impl DeviceDescription {
    /// Name shown to users: the room name, else the friendly name.
    pub fn display_name(&self) -> &str {
        self.room_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.friendly_name)
    }
}

/// Normalizes a Sonos UUID to canonical form for deduplication.
///
/// Handles the shapes seen in the wild:
/// - `uuid:` prefix (from UPnP UDN)
/// - `::urn:schemas-upnp-org:device:ZonePlayer:1` suffix (from USN)
/// - `:<digits>` suffixes (group/topology IDs like `RINCON_...01400:58`)
/// - `_MS`, `_MR`, `_LR` suffixes (root device + subdevices)
pub fn normalize_uuid(raw: &str) -> String {
    let mut uuid = raw.trim();
    uuid = uuid.strip_prefix("uuid:").unwrap_or(uuid);

    if let Some(idx) = uuid.find("::") {
        uuid = &uuid[..idx];
    }

    // Only RINCON ids carry a numeric topology suffix.
    if uuid.starts_with("RINCON_") {
        if let Some((head, suffix)) = uuid.rsplit_once(':') {
            if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) {
                uuid = head;
            }
        }
    }

    while let Some(stripped) = ["_MS", "_MR", "_LR"]
        .iter()
        .find_map(|suffix| uuid.strip_suffix(*suffix))
    {
        uuid = stripped;
    }

    uuid.to_string()
}

/// Virtual interface prefixes to filter out during discovery.
pub const VIRTUAL_INTERFACE_PREFIXES: &[&str] = &[
    "lo", "docker", "veth", "br-", "virbr", "vmnet", "vbox", "tun", "tap", "utun",
];

/// Checks if an interface name belongs to a virtual/container interface.
pub fn is_virtual_interface(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    VIRTUAL_INTERFACE_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_udn_and_usn_decorations() {
        assert_eq!(normalize_uuid("uuid:RINCON_ABC123"), "RINCON_ABC123");
        assert_eq!(
            normalize_uuid("uuid:RINCON_ABC123::urn:schemas-upnp-org:device:ZonePlayer:1"),
            "RINCON_ABC123"
        );
    }

    #[test]
    fn normalize_strips_topology_and_subdevice_suffixes() {
        assert_eq!(
            normalize_uuid("RINCON_ABC12301400:58"),
            "RINCON_ABC12301400"
        );
        assert_eq!(normalize_uuid("RINCON_ABC123_MR"), "RINCON_ABC123");
        assert_eq!(normalize_uuid("RINCON_ABC123_MS_LR"), "RINCON_ABC123");
    }

    #[test]
    fn normalize_leaves_other_ids_alone() {
        assert_eq!(normalize_uuid("some:123"), "some:123");
    }

    #[test]
    fn virtual_interfaces_are_recognized() {
        assert!(is_virtual_interface("lo"));
        assert!(is_virtual_interface("docker0"));
        assert!(is_virtual_interface("br-abc"));
        assert!(!is_virtual_interface("eth0"));
        assert!(!is_virtual_interface("en0"));
        assert!(!is_virtual_interface("wlan0"));
    }

    #[test]
    fn merge_keeps_first_location_and_unions_methods() {
        let mut a = DiscoveredSpeaker::new(
            "192.168.1.10".into(),
            "RINCON_A",
            None,
            DiscoveryMethod::SsdpBroadcast,
        );
        a.merge(DiscoveredSpeaker::new(
            "192.168.1.10".into(),
            "uuid:RINCON_A::urn:schemas-upnp-org:device:ZonePlayer:1",
            Some("http://192.168.1.10:1400/xml/device_description.xml".into()),
            DiscoveryMethod::SsdpMulticast,
        ));

        assert_eq!(a.methods.len(), 2);
        assert!(a.location.is_some());
    }

    #[test]
    fn display_name_prefers_room_name() {
        let mut desc = DeviceDescription {
            uuid: "RINCON_A".into(),
            room_name: Some("Kitchen".into()),
            friendly_name: "192.168.1.10 - Sonos One".into(),
        };
        assert_eq!(desc.display_name(), "Kitchen");

        desc.room_name = Some("  ".into());
        assert_eq!(desc.display_name(), "192.168.1.10 - Sonos One");
    }
}
