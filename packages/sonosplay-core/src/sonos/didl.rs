//! DIDL-Lite metadata formatting for Sonos display.
//!
//! Sonos shows the `dc:title` of the metadata sent with `SetAVTransportURI`
//! as the now-playing line, so a local file is presented as a single music
//! track titled after the file.

use crate::protocol_constants::APP_NAME;
use crate::sonos::utils::escape_xml;

/// Formats DIDL-Lite metadata XML for a single audio track.
///
/// # Arguments
/// * `media_url` - The URL the speaker will fetch
/// * `title` - Display title (usually the file's basename)
/// * `mime_type` - MIME type advertised in `protocolInfo`
pub(crate) fn format_didl_lite(media_url: &str, title: &str, mime_type: &str) -> String {
    let mut didl = String::from(
        r#"<DIDL-Lite xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/" xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/">"#,
    );
    didl.push_str(r#"<item id="1" parentID="0" restricted="true">"#);
    didl.push_str(&format!("<dc:title>{}</dc:title>", escape_xml(title)));
    didl.push_str(&format!(
        "<dc:creator>{}</dc:creator>",
        escape_xml(APP_NAME)
    ));
    didl.push_str("<upnp:class>object.item.audioItem.musicTrack</upnp:class>");
    didl.push_str(&format!(
        r#"<res protocolInfo="http-get:*:{}:*">{}</res>"#,
        mime_type,
        escape_xml(media_url)
    ));
    didl.push_str("</item></DIDL-Lite>");
    didl
}
