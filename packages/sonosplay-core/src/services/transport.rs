//! Transport commands against a coordinator or a member set.
//!
//! Volume changes fan out to every member concurrently and are best-effort:
//! one member's failure never stops delivery to the others.

use std::path::Path;
use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use serde::Serialize;

use crate::error::{SonosPlayError, SonosPlayResult};
use crate::media::MediaServer;
use crate::sonos::traits::Player;

/// Result of setting volume on multiple speakers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VolumeReport {
    /// Number of speakers that accepted the level.
    pub success: usize,
    /// Total number of speakers attempted.
    pub total: usize,
    /// (device, error) pairs for the speakers that did not.
    pub failures: Vec<(String, String)>,
}

impl VolumeReport {
    /// True when every member accepted the level.
    pub fn is_complete(&self) -> bool {
        self.success == self.total
    }

    /// Converts a partial outcome into `PartialVolumeFailure`.
    pub fn into_result(self) -> SonosPlayResult<Self> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(SonosPlayError::PartialVolumeFailure {
                succeeded: self.success,
                total: self.total,
            })
        }
    }
}

/// Issues play/stop/volume commands and tears the media session down on stop.
pub struct TransportController {
    media: Arc<MediaServer>,
}

impl TransportController {
    pub fn new(media: Arc<MediaServer>) -> Self {
        Self { media }
    }

    /// The media server this controller tears down on stop.
    pub fn media(&self) -> &Arc<MediaServer> {
        &self.media
    }

    /// Serves `file` and returns its URL; see [`MediaServer::serve`].
    pub async fn serve(&self, file: &Path) -> SonosPlayResult<String> {
        Ok(self.media.serve(file).await?)
    }

    /// Tells `coordinator` to stream `url`, showing `title`.
    pub async fn play(
        &self,
        coordinator: &dyn Player,
        url: &str,
        title: &str,
    ) -> SonosPlayResult<()> {
        log::info!(
            "[Transport] Play on {} ({}): {}",
            coordinator.display_name(),
            coordinator.id(),
            url
        );
        coordinator
            .play_uri(url, title)
            .await
            .map_err(|e| SonosPlayError::device(coordinator.display_name(), coordinator.id(), e))
    }

    /// Halts `target` (if any), then always stops the media server.
    ///
    /// The stop command's error is returned after teardown.
    pub async fn stop(&self, target: Option<&dyn Player>) -> SonosPlayResult<()> {
        let result = match target {
            Some(device) => {
                log::info!(
                    "[Transport] Stop on {} ({})",
                    device.display_name(),
                    device.id()
                );
                device
                    .stop()
                    .await
                    .map_err(|e| SonosPlayError::device(device.display_name(), device.id(), e))
            }
            None => Ok(()),
        };

        if let Err(e) = &result {
            log::warn!("[Transport] Stop failed, tearing down anyway: {}", e);
        }
        self.media.stop().await;
        result
    }

    /// Sets every member to `level` (clamped to 100) concurrently.
    pub async fn set_volume(&self, members: &[Arc<dyn Player>], level: u8) -> VolumeReport {
        let level = level.min(100);

        let results = join_all(members.iter().map(|member| async move {
            member.set_volume(level).await.map_err(|e| {
                log::debug!(
                    "[Transport] Volume {} on {} failed: {}",
                    level,
                    member.display_name(),
                    e
                );
                (member.display_name().to_string(), e.to_string())
            })
        }))
        .await;

        let failures: Vec<_> = results.into_iter().filter_map(Result::err).collect();
        VolumeReport {
            success: members.len() - failures.len(),
            total: members.len(),
            failures,
        }
    }

    /// Integer-truncated mean of the members' volumes.
    ///
    /// Fails as a whole if any member cannot be read.
    pub async fn get_average_volume(&self, members: &[Arc<dyn Player>]) -> SonosPlayResult<u8> {
        if members.is_empty() {
            return Err(SonosPlayError::NoSelection("group has no speakers"));
        }

        let volumes = try_join_all(members.iter().map(|member| async move {
            member
                .volume()
                .await
                .map_err(|e| SonosPlayError::device(member.display_name(), member.id(), e))
        }))
        .await?;

        let sum: u32 = volumes.iter().map(|&v| u32::from(v)).sum();
        Ok((sum / volumes.len() as u32) as u8)
    }
}
