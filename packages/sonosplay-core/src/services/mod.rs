//! Application services layer.
//!
//! Business logic sitting between the front end and the infrastructure in
//! `sonos/` and `media/`: grouping, transport commands and the command
//! surface that ties them together.

pub mod controller;
pub mod group_resolver;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use controller::{ActiveTarget, PlayOutcome, PlaybackController, StopOutcome};
pub use group_resolver::{build_groups, resolve_groups, Group};
pub use transport::{TransportController, VolumeReport};
