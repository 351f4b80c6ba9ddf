//! SonosPlay Core - play a local audio file on Sonos speakers.
//!
//! Sonos players cannot read local disks, so this crate serves one file at a
//! time over an ephemeral HTTP server and tells the right speaker to fetch it.
//!
//! # Architecture
//!
//! - [`bootstrap`]: Wiring of the services below
//! - [`context`]: Local IP detection and URL building
//! - [`media`]: Single-file HTTP media server
//! - [`sonos`]: Sonos discovery and control (SSDP, UPnP/SOAP)
//! - [`services`]: Grouping, transport commands and the [`PlaybackController`]
//!   command surface
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`Player`](sonos::Player): One controllable speaker
//! - [`DeviceDiscovery`](sonos::DeviceDiscovery): Finding speakers on the LAN
//! - [`IpDetector`](context::IpDetector): Local IP detection
//!
//! The Sonos implementations live in [`sonos`]; tests substitute mocks.

#![warn(clippy::all)]

pub mod bootstrap;
pub mod context;
pub mod error;
pub mod media;
pub mod protocol_constants;
pub mod services;
pub mod sonos;

pub use bootstrap::{bootstrap_services, BootstrapConfig, BootstrappedServices};
pub use context::{IpDetector, LocalIpResolver, NetworkError, UrlBuilder};
pub use error::{ErrorCode, SonosPlayError, SonosPlayResult};
pub use media::{MediaHandle, MediaServer};

pub use sonos::{DeviceDiscovery, DiscoveryConfig, GroupInfo, Player, SonosDevice, SonosDiscovery};

pub use services::{
    Group, PlayOutcome, PlaybackController, StopOutcome, TransportController, VolumeReport,
};
