//! UPnP services a speaker is driven through.

use std::fmt;

/// The three Sonos services SonosPlay talks to.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum SonosService {
    /// Set URI, play, stop.
    AVTransport,
    /// Per-speaker volume.
    RenderingControl,
    /// Group membership.
    ZoneGroupTopology,
}

impl SonosService {
    /// Service type and control path, relative to port 1400.
    fn endpoint(self) -> (&'static str, &'static str) {
        match self {
            Self::AVTransport => ("AVTransport", "/MediaRenderer/AVTransport/Control"),
            Self::RenderingControl => (
                "RenderingControl",
                "/MediaRenderer/RenderingControl/Control",
            ),
            Self::ZoneGroupTopology => ("ZoneGroupTopology", "/ZoneGroupTopology/Control"),
        }
    }

    /// Service URN, used in the envelope and the `SOAPAction` header.
    #[must_use]
    pub fn urn(self) -> String {
        format!("urn:schemas-upnp-org:service:{}:1", self.endpoint().0)
    }

    /// Control URL path on the speaker.
    #[must_use]
    pub fn control_path(self) -> &'static str {
        self.endpoint().1
    }
}

impl fmt::Display for SonosService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint().0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urns_and_paths() {
        assert_eq!(
            SonosService::AVTransport.urn(),
            "urn:schemas-upnp-org:service:AVTransport:1"
        );
        assert_eq!(
            SonosService::ZoneGroupTopology.control_path(),
            "/ZoneGroupTopology/Control"
        );
        assert_eq!(
            SonosService::RenderingControl.to_string(),
            "RenderingControl"
        );
    }
}
