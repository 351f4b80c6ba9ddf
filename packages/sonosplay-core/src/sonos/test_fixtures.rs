//! Shared test fixtures for Sonos topology and device description payloads.
//!
//! These are used by multiple test modules to avoid duplication.

/// Builds a `ZoneGroupMember` element for a visible speaker.
pub fn member_xml(uuid: &str, ip: &str, zone_name: &str) -> String {
    format!(
        r#"<ZoneGroupMember UUID="{uuid}" Location="http://{ip}:1400/xml/device_description.xml" ZoneName="{zone_name}" />"#
    )
}

/// Wraps members in a `ZoneGroup` element.
pub fn group_xml(id: &str, coordinator: &str, members: &[String]) -> String {
    format!(
        r#"<ZoneGroup Coordinator="{coordinator}" ID="{id}">{}</ZoneGroup>"#,
        members.concat()
    )
}

/// Wraps groups in the `ZoneGroups` root (unescaped form).
pub fn zone_groups_xml(groups: &[String]) -> String {
    format!("<ZoneGroups>{}</ZoneGroups>", groups.concat())
}

/// GetZoneGroupState SOAP response with a stereo pair, a home-theater sub,
/// a Zone Bridge and a two-room group. The topology is entity-escaped the way
/// speakers send it.
pub const ZONE_GROUP_STATE_RESPONSE: &str = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><u:GetZoneGroupStateResponse xmlns:u="urn:schemas-upnp-org:service:ZoneGroupTopology:1"><ZoneGroupState>&lt;ZoneGroupState&gt;&lt;ZoneGroups&gt;&lt;ZoneGroup Coordinator=&quot;RINCON_LEFT&quot; ID=&quot;RINCON_LEFT:1&quot;&gt;&lt;ZoneGroupMember UUID=&quot;RINCON_LEFT&quot; Location=&quot;http://192.168.1.40:1400/xml/device_description.xml&quot; ZoneName=&quot;Living Room&quot;&gt;&lt;Satellite UUID=&quot;RINCON_SUB&quot; Location=&quot;http://192.168.1.42:1400/xml/device_description.xml&quot; ZoneName=&quot;Living Room&quot; Invisible=&quot;1&quot;/&gt;&lt;/ZoneGroupMember&gt;&lt;ZoneGroupMember UUID=&quot;RINCON_RIGHT&quot; Location=&quot;http://192.168.1.41:1400/xml/device_description.xml&quot; ZoneName=&quot;Living Room&quot; Invisible=&quot;1&quot;/&gt;&lt;/ZoneGroup&gt;&lt;ZoneGroup Coordinator=&quot;RINCON_BOOST&quot; ID=&quot;RINCON_BOOST:2&quot;&gt;&lt;ZoneGroupMember UUID=&quot;RINCON_BOOST&quot; Location=&quot;http://192.168.1.5:1400/xml/device_description.xml&quot; ZoneName=&quot;BOOST&quot; IsZoneBridge=&quot;1&quot;/&gt;&lt;/ZoneGroup&gt;&lt;ZoneGroup Coordinator=&quot;RINCON_KITCHEN&quot; ID=&quot;RINCON_KITCHEN:3&quot;&gt;&lt;ZoneGroupMember UUID=&quot;RINCON_KITCHEN&quot; Location=&quot;http://192.168.1.10:1400/xml/device_description.xml&quot; ZoneName=&quot;Kitchen&quot;/&gt;&lt;ZoneGroupMember UUID=&quot;RINCON_OFFICE&quot; Location=&quot;http://192.168.1.20:1400/xml/device_description.xml&quot; ZoneName=&quot;Office&quot;/&gt;&lt;/ZoneGroup&gt;&lt;/ZoneGroups&gt;&lt;/ZoneGroupState&gt;</ZoneGroupState></u:GetZoneGroupStateResponse></s:Body></s:Envelope>"#;

/// Device description for a player, carrying both `roomName` and `friendlyName`.
pub const DEVICE_DESCRIPTION: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <specVersion><major>1</major><minor>0</minor></specVersion>
  <device>
    <deviceType>urn:schemas-upnp-org:device:ZonePlayer:1</deviceType>
    <friendlyName>192.168.1.10 - Sonos One - RINCON_KITCHEN</friendlyName>
    <manufacturer>Sonos, Inc.</manufacturer>
    <modelName>Sonos One</modelName>
    <UDN>uuid:RINCON_KITCHEN</UDN>
    <roomName>Kitchen &amp; Dining</roomName>
    <deviceList>
      <device>
        <deviceType>urn:schemas-upnp-org:device:MediaRenderer:1</deviceType>
        <friendlyName>Kitchen - Sonos One Media Renderer</friendlyName>
        <UDN>uuid:RINCON_KITCHEN_MR</UDN>
      </device>
    </deviceList>
  </device>
</root>"#;

/// Device description without `roomName`, as returned by some older firmware.
pub const DEVICE_DESCRIPTION_NO_ROOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <device>
    <friendlyName>Office Speaker</friendlyName>
    <UDN>uuid:RINCON_OFFICE</UDN>
  </device>
</root>"#;
