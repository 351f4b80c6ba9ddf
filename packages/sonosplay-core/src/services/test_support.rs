//! Hand-written `Player` and `DeviceDiscovery` doubles for service tests.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{SoapError, SoapResult};
use crate::sonos::traits::{DeviceDiscovery, GroupInfo, Player};

fn refused() -> SoapError {
    SoapError::HttpStatus(503, "speaker offline".into())
}

pub struct MockPlayer {
    id: String,
    name: String,
    group: GroupInfo,
    pub volume: AtomicU8,
    pub plays: Mutex<Vec<(String, String)>>,
    pub stops: AtomicUsize,
    fail_group_info: bool,
    fail_volume: bool,
    fail_play: bool,
    fail_stop: bool,
    play_delay: Option<Duration>,
}

impl MockPlayer {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            group: GroupInfo::solo(id),
            volume: AtomicU8::new(0),
            plays: Mutex::new(Vec::new()),
            stops: AtomicUsize::new(0),
            fail_group_info: false,
            fail_volume: false,
            fail_play: false,
            fail_stop: false,
            play_delay: None,
        }
    }

    pub fn in_group(mut self, coordinator: &str, members: &[&str]) -> Self {
        self.group = GroupInfo {
            coordinator_id: coordinator.to_string(),
            member_ids: members.iter().map(|m| m.to_string()).collect(),
        };
        self
    }

    pub fn with_volume(self, volume: u8) -> Self {
        self.volume.store(volume, Ordering::SeqCst);
        self
    }

    pub fn failing_group_info(mut self) -> Self {
        self.fail_group_info = true;
        self
    }

    pub fn failing_volume(mut self) -> Self {
        self.fail_volume = true;
        self
    }

    pub fn failing_play(mut self) -> Self {
        self.fail_play = true;
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    /// Makes `play_uri` take `delay` before answering.
    pub fn with_play_delay(mut self, delay: Duration) -> Self {
        self.play_delay = Some(delay);
        self
    }

    pub fn current_volume(&self) -> u8 {
        self.volume.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Player for MockPlayer {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    async fn volume(&self) -> SoapResult<u8> {
        if self.fail_volume {
            return Err(refused());
        }
        Ok(self.current_volume())
    }

    async fn set_volume(&self, level: u8) -> SoapResult<()> {
        if self.fail_volume {
            return Err(refused());
        }
        self.volume.store(level.min(100), Ordering::SeqCst);
        Ok(())
    }

    async fn group_info(&self) -> SoapResult<GroupInfo> {
        if self.fail_group_info {
            return Err(SoapError::Parse);
        }
        Ok(self.group.clone())
    }

    async fn play_uri(&self, url: &str, title: &str) -> SoapResult<()> {
        if let Some(delay) = self.play_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_play {
            return Err(SoapError::Fault("UPnPError (errorCode 714)".into()));
        }
        self.plays.lock().push((url.to_string(), title.to_string()));
        Ok(())
    }

    async fn stop(&self) -> SoapResult<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop {
            return Err(refused());
        }
        Ok(())
    }
}

/// Discovery that returns a fixed, swappable set of players.
pub struct MockDiscovery {
    pub players: Mutex<Vec<Arc<dyn Player>>>,
    pub calls: AtomicUsize,
}

impl MockDiscovery {
    pub fn new(players: Vec<Arc<dyn Player>>) -> Self {
        Self {
            players: Mutex::new(players),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn replace(&self, players: Vec<Arc<dyn Player>>) {
        *self.players.lock() = players;
    }
}

#[async_trait]
impl DeviceDiscovery for MockDiscovery {
    async fn discover(&self, _timeout: Duration) -> Vec<Arc<dyn Player>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.players.lock().clone()
    }
}
