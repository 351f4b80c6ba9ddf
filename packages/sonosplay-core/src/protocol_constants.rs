//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by external specifications (UPnP, SSDP, HTTP)
//! or by the Sonos firmware, and changing them would break compatibility.

// ─────────────────────────────────────────────────────────────────────────────
// HTTP/SOAP
// ─────────────────────────────────────────────────────────────────────────────

/// Timeout for SOAP HTTP requests (seconds).
///
/// 10 seconds is reasonable for LAN operations.
pub const SOAP_TIMEOUT_SECS: u64 = 10;

/// Default Sonos speaker control port.
pub const SONOS_PORT: u16 = 1400;

// ─────────────────────────────────────────────────────────────────────────────
// Discovery
// ─────────────────────────────────────────────────────────────────────────────

/// Default bound on a discovery probe (seconds).
pub const DEFAULT_DISCOVERY_TIMEOUT_SECS: u64 = 5;

/// Timeout for fetching a speaker's device description (seconds).
pub const DESCRIPTION_FETCH_TIMEOUT_SECS: u64 = 2;

/// Timeout for one `GetZoneGroupState` call made during discovery (seconds).
pub const TOPOLOGY_FETCH_TIMEOUT_SECS: u64 = 2;

// ─────────────────────────────────────────────────────────────────────────────
// Local IP Resolution
// ─────────────────────────────────────────────────────────────────────────────

/// Non-routable address "connected" to by a UDP socket so the OS picks the
/// outbound interface. No packet is ever sent.
pub const OUTBOUND_PROBE_ADDR: &str = "10.255.255.255:1";

/// Address returned when the outbound interface cannot be determined.
pub const LOOPBACK_FALLBACK: &str = "127.0.0.1";

// ─────────────────────────────────────────────────────────────────────────────
// Media Server
// ─────────────────────────────────────────────────────────────────────────────

/// MIME type used when the file extension is not a known audio type.
pub const DEFAULT_AUDIO_MIME: &str = "audio/mpeg";

/// Upper bound on waiting for a media session to wind down (milliseconds).
///
/// After this the serving task is aborted.
pub const MEDIA_SHUTDOWN_TIMEOUT_MS: u64 = 2000;

// ─────────────────────────────────────────────────────────────────────────────
// Application Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Application name used in protocol data (DIDL-Lite creator).
pub const APP_NAME: &str = "SonosPlay";

/// Separator between member names in a group label.
pub const GROUP_LABEL_SEPARATOR: &str = " + ";
