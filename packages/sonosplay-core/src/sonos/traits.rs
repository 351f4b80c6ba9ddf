//! Trait abstractions for networked players.
//!
//! Group resolution and transport control depend on these traits rather than
//! on the Sonos adapter, so they can be driven by mocks in tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::SoapResult;

/// Group membership as reported by one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    /// Identifier of the device coordinating the group.
    pub coordinator_id: String,
    /// Identifiers of every addressable member, coordinator included.
    pub member_ids: Vec<String>,
}

impl GroupInfo {
    /// A device playing on its own.
    pub fn solo(id: &str) -> Self {
        Self {
            coordinator_id: id.to_string(),
            member_ids: vec![id.to_string()],
        }
    }
}

/// One physical player on the network.
///
/// Identity and name are fixed for the lifetime of a discovery snapshot; every
/// other operation goes to the device.
#[async_trait]
pub trait Player: Send + Sync {
    /// Stable unique identifier (RINCON UUID for Sonos).
    fn id(&self) -> &str;

    /// Human-readable room name.
    fn display_name(&self) -> &str;

    /// Current volume (0-100).
    async fn volume(&self) -> SoapResult<u8>;

    /// Sets the volume (values > 100 are clamped).
    async fn set_volume(&self, level: u8) -> SoapResult<()>;

    /// The group this device currently belongs to.
    async fn group_info(&self) -> SoapResult<GroupInfo>;

    /// Starts playback of `url`, showing `title` on the device.
    async fn play_uri(&self, url: &str, title: &str) -> SoapResult<()>;

    /// Halts transport.
    async fn stop(&self) -> SoapResult<()>;
}

/// Finds players on the local network.
#[async_trait]
pub trait DeviceDiscovery: Send + Sync {
    /// Probes the network for at most `timeout`.
    ///
    /// Returns whatever answered in time. Probe failures yield an empty set,
    /// never an error.
    async fn discover(&self, timeout: Duration) -> Vec<Arc<dyn Player>>;
}
