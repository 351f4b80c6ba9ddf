//! `Player` implementation backed by a Sonos speaker's UPnP services.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::SoapResult;
use crate::media::mime_for_path;
use crate::sonos::playback;
use crate::sonos::traits::{GroupInfo, Player};
use crate::sonos::types::find_group;
use crate::sonos::volume::{get_speaker_volume, set_speaker_volume};
use crate::sonos::zone_groups::get_zone_groups;

/// A Sonos speaker addressed by its LAN IP.
#[derive(Debug, Clone)]
pub struct SonosDevice {
    uuid: String,
    name: String,
    ip: String,
    client: Client,
    /// Topology snapshot taken during discovery, if one was available.
    group: Option<GroupInfo>,
}

impl SonosDevice {
    /// Creates a device handle.
    ///
    /// # Arguments
    /// * `uuid` - Normalized RINCON UUID
    /// * `name` - Room name shown to users
    /// * `ip` - IP address of the speaker
    /// * `client` - Shared HTTP client for SOAP requests
    pub fn new(uuid: String, name: String, ip: String, client: Client) -> Self {
        Self {
            uuid,
            name,
            ip,
            client,
            group: None,
        }
    }

    /// Seeds group membership so `group_info` does not query the speaker.
    pub fn with_group_info(mut self, group: GroupInfo) -> Self {
        self.group = Some(group);
        self
    }
}

#[async_trait]
impl Player for SonosDevice {
    fn id(&self) -> &str {
        &self.uuid
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    async fn volume(&self) -> SoapResult<u8> {
        get_speaker_volume(&self.client, &self.ip).await
    }

    async fn set_volume(&self, level: u8) -> SoapResult<()> {
        set_speaker_volume(&self.client, &self.ip, level).await
    }

    async fn group_info(&self) -> SoapResult<GroupInfo> {
        if let Some(group) = &self.group {
            return Ok(group.clone());
        }

        let groups = get_zone_groups(&self.client, &self.ip).await?;
        Ok(find_group(&groups, &self.uuid)
            .map(|g| g.group_info())
            .unwrap_or_else(|| {
                log::debug!(
                    "[Sonos] {} not listed in its own topology, treating as standalone",
                    self.uuid
                );
                GroupInfo::solo(&self.uuid)
            }))
    }

    async fn play_uri(&self, url: &str, title: &str) -> SoapResult<()> {
        let mime_type = mime_for_path(Path::new(title));
        playback::play_uri(&self.client, &self.ip, url, title, mime_type).await
    }

    async fn stop(&self) -> SoapResult<()> {
        playback::stop(&self.client, &self.ip).await
    }
}
