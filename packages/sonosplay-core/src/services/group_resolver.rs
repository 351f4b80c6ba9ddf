//! Partitioning of discovered players into coordinator-led groups.
//!
//! Every device reports which group it belongs to; this module turns those
//! reports into one [`Group`] per distinct coordinator, with members sorted
//! by display name and a label derived from them.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;

use crate::protocol_constants::GROUP_LABEL_SEPARATOR;
use crate::sonos::traits::{GroupInfo, Player};

/// A coordinator plus its members, treated as one playback target.
#[derive(Clone)]
pub struct Group {
    /// Member names joined in sorted order; also the lookup key.
    pub label: String,
    /// Device receiving transport commands for the group.
    pub coordinator: Arc<dyn Player>,
    /// All members, coordinator included, sorted by display name.
    pub members: Vec<Arc<dyn Player>>,
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("label", &self.label)
            .field("coordinator", &self.coordinator.id())
            .field(
                "members",
                &self.members.iter().map(|m| m.id()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Queries every device for its group membership and builds groups.
///
/// Devices whose membership cannot be read are left out unless another
/// device lists them as a member.
pub async fn resolve_groups(devices: &[Arc<dyn Player>]) -> Vec<Group> {
    let infos = join_all(devices.iter().map(|device| async move {
        match device.group_info().await {
            Ok(info) => Some(info),
            Err(e) => {
                log::warn!(
                    "[Groups] Could not read group of {} ({}): {}",
                    device.display_name(),
                    device.id(),
                    e
                );
                None
            }
        }
    }))
    .await;

    build_groups(devices.iter().cloned().zip(infos).collect())
}

/// Builds groups from per-device membership reports.
///
/// - One group per distinct coordinator; a coordinator's own report wins
///   over its members' reports.
/// - Coordinators that were not enumerated (orphans) are dropped with every
///   device pointing at them.
/// - A device lands in at most one group.
/// - Groups are sorted by label.
pub fn build_groups(reports: Vec<(Arc<dyn Player>, Option<GroupInfo>)>) -> Vec<Group> {
    let by_id: HashMap<String, Arc<dyn Player>> = reports
        .iter()
        .map(|(device, _)| (device.id().to_string(), Arc::clone(device)))
        .collect();

    let mut reports: Vec<(Arc<dyn Player>, GroupInfo)> = reports
        .into_iter()
        .filter_map(|(device, info)| info.map(|info| (device, info)))
        .collect();
    // Coordinators first, then by id, so the outcome does not depend on
    // enumeration order.
    reports.sort_by(|(a, a_info), (b, b_info)| {
        let a_key = (a.id() != a_info.coordinator_id, a.id());
        let b_key = (b.id() != b_info.coordinator_id, b.id());
        a_key.cmp(&b_key)
    });

    let mut seen_coordinators: HashSet<String> = HashSet::new();
    let mut assigned: HashSet<String> = HashSet::new();
    let mut groups = Vec::new();

    for (device, info) in reports {
        if !seen_coordinators.insert(info.coordinator_id.clone()) {
            continue;
        }

        let Some(coordinator) = by_id.get(&info.coordinator_id) else {
            log::debug!(
                "[Groups] Dropping {}: coordinator {} was not discovered",
                device.id(),
                info.coordinator_id
            );
            continue;
        };
        if assigned.contains(&info.coordinator_id) {
            log::debug!(
                "[Groups] Coordinator {} already belongs to another group",
                info.coordinator_id
            );
            continue;
        }

        let mut member_ids: Vec<&str> = vec![info.coordinator_id.as_str(), device.id()];
        member_ids.extend(info.member_ids.iter().map(String::as_str));

        let mut members: Vec<Arc<dyn Player>> = Vec::new();
        for id in member_ids {
            if assigned.contains(id) {
                continue;
            }
            if let Some(member) = by_id.get(id) {
                assigned.insert(id.to_string());
                members.push(Arc::clone(member));
            }
        }

        if members.is_empty() {
            continue;
        }

        members.sort_by(|a, b| a.display_name().cmp(b.display_name()));
        let label = members
            .iter()
            .map(|m| m.display_name())
            .collect::<Vec<_>>()
            .join(GROUP_LABEL_SEPARATOR);

        groups.push(Group {
            label,
            coordinator: Arc::clone(coordinator),
            members,
        });
    }

    groups.sort_by(|a, b| a.label.cmp(&b.label));
    groups
}
