//! Sonos speaker control and discovery.
//!
//! This module adapts Sonos UPnP/SOAP services to the device-neutral
//! [`Player`] and [`DeviceDiscovery`] traits.
//!
//! # Module Structure
//!
//! - `traits` - `Player` / `DeviceDiscovery` capability traits
//! - `device` - `SonosDevice`, the concrete `Player`
//! - `discovery` - SSDP probe, device descriptions and `SonosDiscovery`
//! - `types` - Zone group topology types
//! - `zone_groups` - Zone group topology parsing and retrieval
//! - `services` - UPnP service definitions (URNs, paths)
//! - `didl` - DIDL-Lite metadata formatting for Sonos display
//! - `playback` - Play and stop commands
//! - `volume` - Per-speaker volume control
//! - `retry` - Backoff for transient SOAP faults
//! - `soap` - Low-level SOAP protocol implementation
//! - `utils` - Shared utility functions

pub mod device;
pub(crate) mod didl;
pub mod discovery;
pub(crate) mod playback;
pub(crate) mod retry;
pub mod services;
pub mod soap;
pub mod traits;
pub mod types;
pub mod utils;
pub(crate) mod volume;
pub mod zone_groups;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use device::SonosDevice;
pub use discovery::{DiscoveryConfig, SonosDiscovery};
pub use services::SonosService;
pub use traits::{DeviceDiscovery, GroupInfo, Player};
