//! Command surface driven by the front end.
//!
//! [`PlaybackController`] owns the latest group snapshot, the user's group
//! selection and the active playback target. State lives behind a
//! `parking_lot::RwLock` that is never held across an `.await`; slow work
//! (discovery, SOAP calls, server restarts) runs with the lock released.
//!
//! Play and stop are serialized by a separate async lock, so a stop issued
//! while a play is still starting waits for it and then stops it. An active
//! target therefore always has a live media session behind it.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::error::{SonosPlayError, SonosPlayResult};
use crate::media::MediaServer;
use crate::protocol_constants::DEFAULT_DISCOVERY_TIMEOUT_SECS;
use crate::services::group_resolver::{resolve_groups, Group};
use crate::services::transport::{TransportController, VolumeReport};
use crate::sonos::traits::{DeviceDiscovery, Player};

/// Coordinator currently streaming our file.
#[derive(Clone)]
pub struct ActiveTarget {
    /// Label of the group at the time play succeeded.
    pub label: String,
    pub coordinator: Arc<dyn Player>,
}

/// Outcome of a successful `play_selected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayOutcome {
    pub label: String,
    pub url: String,
}

/// Outcome of `stop_active`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped(String),
    NothingPlaying,
}

#[derive(Default)]
struct ControllerState {
    groups: Vec<Group>,
    selected: Option<String>,
    active: Option<ActiveTarget>,
}

/// Ties discovery, grouping, transport and the media server together.
pub struct PlaybackController {
    discovery: Arc<dyn DeviceDiscovery>,
    transport: TransportController,
    discovery_timeout: Duration,
    state: RwLock<ControllerState>,
    /// Held for the whole of `play_selected` and `stop_active`.
    transition: Mutex<()>,
}

impl PlaybackController {
    pub fn new(discovery: Arc<dyn DeviceDiscovery>, media: Arc<MediaServer>) -> Self {
        Self {
            discovery,
            transport: TransportController::new(media),
            discovery_timeout: Duration::from_secs(DEFAULT_DISCOVERY_TIMEOUT_SECS),
            state: RwLock::new(ControllerState::default()),
            transition: Mutex::new(()),
        }
    }

    /// Overrides the discovery window used by [`Self::refresh_groups`].
    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    pub fn transport(&self) -> &TransportController {
        &self.transport
    }

    /// Rediscovers speakers and replaces the group snapshot.
    ///
    /// The active target and media session survive; the selection survives
    /// only if a group with the same label still exists.
    pub async fn refresh_groups(&self) -> Vec<Group> {
        log::info!(
            "[Controller] Refreshing groups ({}s window)",
            self.discovery_timeout.as_secs_f32()
        );
        let devices = self.discovery.discover(self.discovery_timeout).await;
        let groups = resolve_groups(&devices).await;
        log::info!(
            "[Controller] {} device(s) in {} group(s)",
            devices.len(),
            groups.len()
        );

        let mut state = self.state.write();
        let still_listed = state
            .selected
            .as_ref()
            .map_or(true, |label| groups.iter().any(|g| &g.label == label));
        if !still_listed {
            log::debug!("[Controller] Selected group is gone, clearing selection");
            state.selected = None;
        }
        state.groups = groups.clone();
        groups
    }

    /// Last group snapshot.
    pub fn groups(&self) -> Vec<Group> {
        self.state.read().groups.clone()
    }

    pub fn selected(&self) -> Option<String> {
        self.state.read().selected.clone()
    }

    /// Label of the group currently playing, if any.
    pub fn active(&self) -> Option<String> {
        self.state.read().active.as_ref().map(|a| a.label.clone())
    }

    pub async fn current_url(&self) -> Option<String> {
        self.transport.media().current_url().await
    }

    /// Marks the group with `label` as the playback selection.
    pub fn select_group(&self, label: &str) -> SonosPlayResult<()> {
        let mut state = self.state.write();
        if !state.groups.iter().any(|g| g.label == label) {
            return Err(SonosPlayError::GroupNotFound(label.to_string()));
        }
        state.selected = Some(label.to_string());
        Ok(())
    }

    /// Serves `path` and starts it on the selected group's coordinator.
    pub async fn play_selected(&self, path: &Path) -> SonosPlayResult<PlayOutcome> {
        if path.as_os_str().is_empty() {
            return Err(SonosPlayError::NoSelection("no file chosen"));
        }
        let _transition = self.transition.lock().await;
        let group = {
            let state = self.state.read();
            let label = state
                .selected
                .as_deref()
                .ok_or(SonosPlayError::NoSelection("no group selected"))?;
            find(&state.groups, label)?
        };

        // The restart below cuts off whatever was streaming.
        self.state.write().active = None;

        let url = self.transport.serve(path).await?;
        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if let Err(e) = self
            .transport
            .play(group.coordinator.as_ref(), &url, &title)
            .await
        {
            log::warn!("[Controller] Play on {} failed: {}", group.label, e);
            self.transport.media().stop().await;
            return Err(e);
        }

        self.state.write().active = Some(ActiveTarget {
            label: group.label.clone(),
            coordinator: Arc::clone(&group.coordinator),
        });
        Ok(PlayOutcome {
            label: group.label,
            url,
        })
    }

    /// Stops the active target (if any) and tears the media server down.
    pub async fn stop_active(&self) -> SonosPlayResult<StopOutcome> {
        let _transition = self.transition.lock().await;
        let active = self.state.write().active.take();
        match active {
            Some(target) => {
                self.transport
                    .stop(Some(target.coordinator.as_ref()))
                    .await?;
                Ok(StopOutcome::Stopped(target.label))
            }
            None => {
                self.transport.stop(None).await?;
                Ok(StopOutcome::NothingPlaying)
            }
        }
    }

    /// Sets every member of the group with `label` to `level`.
    pub async fn set_volume(&self, label: &str, level: u8) -> SonosPlayResult<VolumeReport> {
        let group = self.group(label)?;
        let report = self.transport.set_volume(&group.members, level).await;
        if !report.is_complete() {
            log::warn!(
                "[Controller] Volume on {}: {}/{} applied",
                label,
                report.success,
                report.total
            );
        }
        Ok(report)
    }

    /// Average member volume of the group with `label`, for display.
    pub async fn get_display_volume(&self, label: &str) -> SonosPlayResult<u8> {
        let group = self.group(label)?;
        self.transport.get_average_volume(&group.members).await
    }

    fn group(&self, label: &str) -> SonosPlayResult<Group> {
        find(&self.state.read().groups, label)
    }
}

fn find(groups: &[Group], label: &str) -> SonosPlayResult<Group> {
    groups
        .iter()
        .find(|g| g.label == label)
        .cloned()
        .ok_or_else(|| SonosPlayError::GroupNotFound(label.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::Ordering;

    use tempfile::TempDir;

    use crate::context::LocalIpResolver;
    use crate::error::ErrorCode;
    use crate::services::test_support::{MockDiscovery, MockPlayer};

    struct Fixture {
        controller: PlaybackController,
        discovery: Arc<MockDiscovery>,
        kitchen: Arc<MockPlayer>,
        office: Arc<MockPlayer>,
        den: Arc<MockPlayer>,
    }

    fn fixture_with(den: MockPlayer) -> Fixture {
        let kitchen = Arc::new(
            MockPlayer::new("K", "Kitchen")
                .in_group("K", &["K", "O"])
                .with_volume(20),
        );
        let office = Arc::new(
            MockPlayer::new("O", "Office")
                .in_group("K", &["K", "O"])
                .with_volume(40),
        );
        let den = Arc::new(den);
        let players: Vec<Arc<dyn Player>> = vec![kitchen.clone(), office.clone(), den.clone()];
        let discovery = Arc::new(MockDiscovery::new(players));
        let media = Arc::new(MediaServer::new(LocalIpResolver::explicit(IpAddr::V4(
            Ipv4Addr::LOCALHOST,
        ))));
        let controller = PlaybackController::new(discovery.clone(), media)
            .with_discovery_timeout(Duration::from_millis(10));
        Fixture {
            controller,
            discovery,
            kitchen,
            office,
            den,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(MockPlayer::new("D", "Den"))
    }

    fn audio_file(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("My Song.mp3");
        std::fs::write(&path, b"ID3 not really").unwrap();
        path
    }

    #[tokio::test]
    async fn refresh_builds_sorted_groups() {
        let f = fixture();

        let groups = f.controller.refresh_groups().await;

        let labels: Vec<_> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["Den", "Kitchen + Office"]);
        assert_eq!(f.controller.groups().len(), 2);
        assert_eq!(f.discovery.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn select_requires_a_known_label() {
        let f = fixture();
        f.controller.refresh_groups().await;

        let err = f.controller.select_group("Attic").unwrap_err();
        assert_eq!(err.code(), "group_not_found");
        assert_eq!(f.controller.selected(), None);

        f.controller.select_group("Den").unwrap();
        assert_eq!(f.controller.selected().as_deref(), Some("Den"));
    }

    #[tokio::test]
    async fn selection_is_cleared_when_its_group_disappears() {
        let f = fixture();
        f.controller.refresh_groups().await;
        f.controller.select_group("Den").unwrap();

        let remaining: Vec<Arc<dyn Player>> = vec![f.kitchen.clone(), f.office.clone()];
        f.discovery.replace(remaining);
        f.controller.refresh_groups().await;

        assert_eq!(f.controller.selected(), None);
    }

    #[tokio::test]
    async fn play_requires_selection_and_file() {
        let f = fixture();
        f.controller.refresh_groups().await;
        let dir = TempDir::new().unwrap();

        let err = f
            .controller
            .play_selected(&audio_file(&dir))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "no_selection");

        f.controller.select_group("Den").unwrap();
        let err = f.controller.play_selected(Path::new("")).await.unwrap_err();
        assert_eq!(err.code(), "no_selection");
        assert!(!f.controller.transport().media().is_running().await);
    }

    #[tokio::test]
    async fn play_targets_the_coordinator_with_basename_title() {
        let f = fixture();
        f.controller.refresh_groups().await;
        f.controller.select_group("Kitchen + Office").unwrap();
        let dir = TempDir::new().unwrap();

        let outcome = f.controller.play_selected(&audio_file(&dir)).await.unwrap();

        assert_eq!(outcome.label, "Kitchen + Office");
        assert!(outcome.url.ends_with("/My%20Song.mp3"));
        let plays = f.kitchen.plays.lock().clone();
        assert_eq!(
            plays,
            vec![(outcome.url.clone(), "My Song.mp3".to_string())]
        );
        assert!(f.office.plays.lock().is_empty());
        assert_eq!(f.controller.active().as_deref(), Some("Kitchen + Office"));
        assert_eq!(f.controller.current_url().await, Some(outcome.url));
    }

    #[tokio::test]
    async fn failed_play_tears_the_server_down() {
        let f = fixture_with(MockPlayer::new("D", "Den").failing_play());
        f.controller.refresh_groups().await;
        f.controller.select_group("Den").unwrap();
        let dir = TempDir::new().unwrap();

        let err = f
            .controller
            .play_selected(&audio_file(&dir))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "device_unreachable");
        assert_eq!(f.controller.active(), None);
        assert!(!f.controller.transport().media().is_running().await);
    }

    #[tokio::test]
    async fn active_target_survives_refresh_and_stop_clears_it() {
        let f = fixture();
        f.controller.refresh_groups().await;
        f.controller.select_group("Den").unwrap();
        let dir = TempDir::new().unwrap();
        f.controller.play_selected(&audio_file(&dir)).await.unwrap();

        f.controller.refresh_groups().await;
        assert_eq!(f.controller.active().as_deref(), Some("Den"));
        assert!(f.controller.transport().media().is_running().await);

        let outcome = f.controller.stop_active().await.unwrap();
        assert_eq!(outcome, StopOutcome::Stopped("Den".into()));
        assert_eq!(f.den.stop_count(), 1);
        assert_eq!(f.controller.active(), None);
        assert!(!f.controller.transport().media().is_running().await);

        let outcome = f.controller.stop_active().await.unwrap();
        assert_eq!(outcome, StopOutcome::NothingPlaying);
        assert_eq!(f.den.stop_count(), 1);
    }

    #[tokio::test]
    async fn stop_issued_mid_play_waits_and_stops_that_play() {
        let slow = MockPlayer::new("D", "Den").with_play_delay(Duration::from_millis(300));
        let f = fixture_with(slow);
        f.controller.refresh_groups().await;
        f.controller.select_group("Den").unwrap();
        let dir = TempDir::new().unwrap();
        let path = audio_file(&dir);

        let (played, stopped) = tokio::join!(f.controller.play_selected(&path), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            f.controller.stop_active().await
        });

        assert!(played.is_ok());
        assert_eq!(stopped.unwrap(), StopOutcome::Stopped("Den".into()));
        assert_eq!(f.den.stop_count(), 1);
        assert_eq!(f.controller.active(), None);
        assert!(!f.controller.transport().media().is_running().await);
    }

    #[tokio::test]
    async fn failed_stop_still_clears_everything() {
        let f = fixture_with(MockPlayer::new("D", "Den").failing_stop());
        f.controller.refresh_groups().await;
        f.controller.select_group("Den").unwrap();
        let dir = TempDir::new().unwrap();
        f.controller.play_selected(&audio_file(&dir)).await.unwrap();

        assert!(f.controller.stop_active().await.is_err());

        assert_eq!(f.controller.active(), None);
        assert!(!f.controller.transport().media().is_running().await);
    }

    #[tokio::test]
    async fn volume_commands_cover_the_whole_group() {
        let f = fixture();
        f.controller.refresh_groups().await;

        assert_eq!(
            f.controller
                .get_display_volume("Kitchen + Office")
                .await
                .unwrap(),
            30
        );

        let report = f
            .controller
            .set_volume("Kitchen + Office", 55)
            .await
            .unwrap();
        assert!(report.is_complete());
        assert_eq!(report.total, 2);
        assert_eq!(f.kitchen.current_volume(), 55);
        assert_eq!(f.office.current_volume(), 55);
        assert_eq!(f.den.current_volume(), 0);

        let err = f.controller.set_volume("Attic", 10).await.unwrap_err();
        assert_eq!(err.code(), "group_not_found");
    }
}
