//! Zone group topology parsing and retrieval.
//!
//! Handles parsing ZoneGroupState XML into structured `ZoneGroup` data
//! and fetching topology from Sonos speakers via SOAP.

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use reqwest::Client;

use crate::sonos::services::SonosService;
use crate::sonos::soap::{SoapRequestBuilder, SoapResult};
use crate::sonos::types::{ZoneGroup, ZoneGroupMember};
use crate::sonos::utils::{extract_ip_from_location, extract_xml_text, get_xml_attr};

/// Parses ZoneGroupState XML (already unescaped) into zone groups.
///
/// # Filtering
/// - Zone Bridges (BOOST devices with `IsZoneBridge="1"`) are skipped since
///   they cannot play audio.
/// - `<Satellite>` elements (home-theater surrounds and subs) are skipped;
///   they follow their soundbar.
/// - Groups left without members are excluded entirely.
pub fn parse_zone_group_xml(xml: &str) -> Vec<ZoneGroup> {
    let mut groups = Vec::new();
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut current: Option<ZoneGroup> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"ZoneGroup" => {
                    current = get_xml_attr(e, b"Coordinator").map(|coordinator_uuid| ZoneGroup {
                        id: get_xml_attr(e, b"ID").unwrap_or_default(),
                        coordinator_uuid,
                        members: Vec::new(),
                    });
                }
                b"ZoneGroupMember" => {
                    let Some(group) = current.as_mut() else {
                        continue;
                    };
                    if get_xml_attr(e, b"IsZoneBridge").as_deref() == Some("1") {
                        continue;
                    }

                    let uuid = get_xml_attr(e, b"UUID");
                    let ip =
                        get_xml_attr(e, b"Location").and_then(|l| extract_ip_from_location(&l));
                    let zone_name = get_xml_attr(e, b"ZoneName");

                    if let (Some(uuid), Some(ip), Some(zone_name)) = (uuid, ip, zone_name) {
                        group.members.push(ZoneGroupMember {
                            uuid,
                            ip,
                            zone_name,
                            invisible: get_xml_attr(e, b"Invisible").as_deref() == Some("1"),
                        });
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"ZoneGroup" => {
                if let Some(group) = current.take() {
                    if !group.members.is_empty() {
                        groups.push(group);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("[Sonos] XML parse error in zone groups: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    groups
}

/// Fetches the current zone groups from a Sonos speaker and parses the topology.
///
/// # Arguments
/// * `client` - The HTTP client to use for the request
/// * `ip` - IP address of any Sonos speaker on the network
pub async fn get_zone_groups(client: &Client, ip: &str) -> SoapResult<Vec<ZoneGroup>> {
    let response = SoapRequestBuilder::new(client, ip, SonosService::ZoneGroupTopology)
        .action("GetZoneGroupState")
        .send()
        .await?;

    let Some(decoded_xml) = extract_xml_text(&response, "ZoneGroupState") else {
        return Ok(vec![]);
    };

    Ok(parse_zone_group_xml(&decoded_xml))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sonos::test_fixtures::{
        group_xml, member_xml, zone_groups_xml, ZONE_GROUP_STATE_RESPONSE,
    };
    use crate::sonos::types::{find_group, is_invisible};

    #[test]
    fn single_speaker_group() {
        let xml = zone_groups_xml(&[group_xml(
            "G1",
            "RINCON_KITCHEN",
            &[member_xml("RINCON_KITCHEN", "192.168.1.10", "Kitchen")],
        )]);

        let groups = parse_zone_group_xml(&xml);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].coordinator_uuid, "RINCON_KITCHEN");
        assert_eq!(groups[0].members[0].zone_name, "Kitchen");
        assert_eq!(groups[0].members[0].ip, "192.168.1.10");
    }

    #[test]
    fn multi_room_group_lists_all_members() {
        let xml = zone_groups_xml(&[
            group_xml(
                "G1",
                "RINCON_KITCHEN",
                &[
                    member_xml("RINCON_OFFICE", "192.168.1.20", "Office"),
                    member_xml("RINCON_KITCHEN", "192.168.1.10", "Kitchen"),
                ],
            ),
            group_xml(
                "G2",
                "RINCON_BEDROOM",
                &[member_xml("RINCON_BEDROOM", "192.168.1.30", "Bedroom")],
            ),
        ]);

        let groups = parse_zone_group_xml(&xml);
        assert_eq!(groups.len(), 2);
        let info = groups[0].group_info();
        assert_eq!(info.coordinator_id, "RINCON_KITCHEN");
        assert_eq!(info.member_ids, vec!["RINCON_OFFICE", "RINCON_KITCHEN"]);
        assert_eq!(
            find_group(&groups, "RINCON_BEDROOM").map(|g| g.id.as_str()),
            Some("G2")
        );
    }

    #[test]
    fn zone_bridges_and_bridge_only_groups_are_skipped() {
        let bridge = r#"<ZoneGroupMember UUID="RINCON_BOOST" Location="http://192.168.1.5:1400/xml/device_description.xml" ZoneName="BOOST" IsZoneBridge="1" />"#;
        let xml = zone_groups_xml(&[
            group_xml("G0", "RINCON_BOOST", &[bridge.to_string()]),
            group_xml(
                "G1",
                "RINCON_KITCHEN",
                &[member_xml("RINCON_KITCHEN", "192.168.1.10", "Kitchen")],
            ),
        ]);

        let groups = parse_zone_group_xml(&xml);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id, "G1");
    }

    #[test]
    fn invisible_members_and_satellites_are_hidden_from_group_info() {
        let groups = parse_zone_group_xml(
            &extract_xml_text(ZONE_GROUP_STATE_RESPONSE, "ZoneGroupState").unwrap(),
        );

        let living = find_group(&groups, "RINCON_LEFT").unwrap();
        assert!(!living.contains("RINCON_SUB"));
        assert!(is_invisible(&groups, "RINCON_RIGHT"));
        assert_eq!(living.group_info().member_ids, vec!["RINCON_LEFT"]);
    }

    #[test]
    fn malformed_xml_yields_what_was_parsed() {
        let groups = parse_zone_group_xml("<ZoneGroups><ZoneGroup Coordinator=");
        assert!(groups.is_empty());
    }
}
