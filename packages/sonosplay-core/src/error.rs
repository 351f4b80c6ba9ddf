//! Centralized error types for the SonosPlay core library.
//!
//! Low-level errors (`SoapError`, `DiscoveryError`, `MediaServerError`) live
//! beside the code that raises them; [`SonosPlayError`] is what the command
//! surface returns, carrying enough context (device or group identity plus
//! the underlying cause) for a precise user-facing message.

use std::path::PathBuf;

use thiserror::Error;

pub use crate::media::MediaServerError;
pub use crate::sonos::discovery::{DiscoveryError, DiscoveryResult};
pub use crate::sonos::soap::{SoapError, SoapResult};

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

impl ErrorCode for DiscoveryError {
    fn code(&self) -> &'static str {
        match self {
            Self::SocketBind(_) => "socket_bind_failed",
            Self::NoInterfaces => "no_network_interfaces",
            Self::AllMethodsFailed => "all_discovery_methods_failed",
            Self::Description { .. } => "description_unavailable",
            Self::NotSonosDevice(_) => "not_sonos_device",
        }
    }
}

impl ErrorCode for SoapError {
    fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "http_request_failed",
            Self::HttpStatus(_, _) => "http_error_status",
            Self::Fault(_) => "soap_fault",
            Self::Parse => "soap_parse_error",
        }
    }
}

impl ErrorCode for MediaServerError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidFile { .. } => "invalid_file",
            Self::Bind(_) => "server_bind_failed",
        }
    }
}

/// Application-wide error type for SonosPlay commands.
#[derive(Debug, Error)]
pub enum SonosPlayError {
    /// The LAN could not be probed.
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    /// A command against a specific device failed.
    #[error("{device} unreachable: {cause}")]
    DeviceUnreachable {
        /// Display name and id of the device.
        device: String,
        #[source]
        cause: SoapError,
    },

    /// A user-level precondition is missing (no group or no file).
    #[error("Nothing to play: {0}")]
    NoSelection(&'static str),

    /// The media server could not bind a listener.
    #[error("Failed to start media server: {0}")]
    ServerBind(#[source] std::io::Error),

    /// The chosen path cannot be served.
    #[error("Cannot serve {}: {reason}", .path.display())]
    InvalidFile { path: PathBuf, reason: String },

    /// No group carries the given label in the current snapshot.
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    /// Some members rejected a volume change.
    #[error("Volume applied to {succeeded} of {total} speaker(s)")]
    PartialVolumeFailure { succeeded: usize, total: usize },
}

impl ErrorCode for SonosPlayError {
    fn code(&self) -> &'static str {
        match self {
            Self::NetworkUnavailable(_) => "network_unavailable",
            Self::DeviceUnreachable { .. } => "device_unreachable",
            Self::NoSelection(_) => "no_selection",
            Self::ServerBind(_) => "server_bind_failed",
            Self::InvalidFile { .. } => "invalid_file",
            Self::GroupNotFound(_) => "group_not_found",
            Self::PartialVolumeFailure { .. } => "partial_volume_failure",
        }
    }
}

impl SonosPlayError {
    /// Wraps a device error with the device's identity.
    pub fn device(name: &str, id: &str, cause: SoapError) -> Self {
        Self::DeviceUnreachable {
            device: format!("{} ({})", name, id),
            cause,
        }
    }
}

impl From<MediaServerError> for SonosPlayError {
    fn from(err: MediaServerError) -> Self {
        match err {
            MediaServerError::InvalidFile { path, reason } => Self::InvalidFile { path, reason },
            MediaServerError::Bind(e) => Self::ServerBind(e),
        }
    }
}

impl From<DiscoveryError> for SonosPlayError {
    fn from(err: DiscoveryError) -> Self {
        Self::NetworkUnavailable(err.to_string())
    }
}

/// Convenient Result alias for application-wide operations.
pub type SonosPlayResult<T> = Result<T, SonosPlayError>;
