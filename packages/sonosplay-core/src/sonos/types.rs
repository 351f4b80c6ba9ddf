//! Sonos domain types for zone group topology.
//!
//! These mirror the `ZoneGroupState` document a speaker returns and are
//! converted into the device-neutral [`GroupInfo`] consumed by group
//! resolution.

use serde::Serialize;

use crate::sonos::traits::GroupInfo;

/// A speaker within a Sonos zone group.
#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ZoneGroupMember {
    /// Unique identifier in RINCON_xxxxx format.
    pub uuid: String,
    /// Local IP address of the speaker.
    pub ip: String,
    /// User-configured room name.
    pub zone_name: String,
    /// Hidden members (the second half of a stereo pair) are not addressable
    /// as rooms.
    pub invisible: bool,
}

/// A Sonos zone group (speakers playing in sync).
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ZoneGroup {
    /// Zone group identifier.
    pub id: String,
    /// UUID of the group coordinator.
    pub coordinator_uuid: String,
    /// Speakers in this group, Zone Bridges and home-theater satellites excluded.
    pub members: Vec<ZoneGroupMember>,
}

impl ZoneGroup {
    /// Returns true if `uuid` is listed in this group (visible or not).
    pub fn contains(&self, uuid: &str) -> bool {
        self.members.iter().any(|m| m.uuid == uuid)
    }

    /// Device-neutral membership view: coordinator plus visible members.
    pub fn group_info(&self) -> GroupInfo {
        GroupInfo {
            coordinator_id: self.coordinator_uuid.clone(),
            member_ids: self
                .members
                .iter()
                .filter(|m| !m.invisible)
                .map(|m| m.uuid.clone())
                .collect(),
        }
    }
}

/// Finds the group a speaker belongs to within a topology snapshot.
pub fn find_group<'a>(groups: &'a [ZoneGroup], uuid: &str) -> Option<&'a ZoneGroup> {
    groups.iter().find(|g| g.contains(uuid))
}

/// Returns true if the topology marks `uuid` as a hidden member.
pub fn is_invisible(groups: &[ZoneGroup], uuid: &str) -> bool {
    groups
        .iter()
        .flat_map(|g| g.members.iter())
        .any(|m| m.uuid == uuid && m.invisible)
}
