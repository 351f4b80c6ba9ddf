//! Device description fetch and parsing.
//!
//! The SSDP LOCATION document is the only place a speaker's room name is
//! available without a SOAP round-trip.

use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use reqwest::Client;

use super::types::{normalize_uuid, DeviceDescription, DiscoveryError, DiscoveryResult};
use crate::protocol_constants::SONOS_PORT;

/// Default device description URL for a speaker without a LOCATION header.
pub fn default_location(ip: &str) -> String {
    format!("http://{}:{}/xml/device_description.xml", ip, SONOS_PORT)
}

/// Parses the root `<device>` of a UPnP device description.
///
/// Embedded devices (`deviceList`) are ignored so their names cannot shadow
/// the root's.
pub fn parse_device_description(xml: &str) -> Option<DeviceDescription> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut device_depth = 0usize;
    let mut udn = None;
    let mut friendly_name = None;
    let mut room_name = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"device" => device_depth += 1,
                field @ (b"UDN" | b"friendlyName" | b"roomName") if device_depth == 1 => {
                    let slot = match field {
                        b"UDN" => &mut udn,
                        b"friendlyName" => &mut friendly_name,
                        _ => &mut room_name,
                    };
                    if let Ok(text) = reader.read_text(e.name()) {
                        if slot.is_none() {
                            *slot =
                                Some(html_escape::decode_html_entities(&text).trim().to_string());
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"device" => {
                device_depth = device_depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                log::debug!("[Discovery] Device description parse error: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    let uuid = normalize_uuid(&udn?);
    if uuid.is_empty() {
        return None;
    }

    Some(DeviceDescription {
        friendly_name: friendly_name.unwrap_or_else(|| uuid.clone()),
        uuid,
        room_name,
    })
}

/// Fetches and parses a speaker's device description.
///
/// # Arguments
/// * `client` - The HTTP client to use for the request
/// * `location` - Description URL (SSDP LOCATION or [`default_location`])
/// * `timeout` - Bound on the whole request
pub async fn fetch_device_description(
    client: &Client,
    location: &str,
    timeout: Duration,
) -> DiscoveryResult<DeviceDescription> {
    let unavailable = |reason: String| DiscoveryError::Description {
        url: location.to_string(),
        reason,
    };

    let response = client
        .get(location)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| unavailable(e.to_string()))?;

    if !response.status().is_success() {
        return Err(unavailable(format!("HTTP {}", response.status())));
    }

    let body = response
        .text()
        .await
        .map_err(|e| unavailable(e.to_string()))?;

    parse_device_description(&body)
        .ok_or_else(|| DiscoveryError::NotSonosDevice(location.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sonos::test_fixtures::{DEVICE_DESCRIPTION, DEVICE_DESCRIPTION_NO_ROOM};

    #[test]
    fn reads_root_device_identity() {
        let desc = parse_device_description(DEVICE_DESCRIPTION).unwrap();
        assert_eq!(desc.uuid, "RINCON_KITCHEN");
        assert_eq!(desc.room_name.as_deref(), Some("Kitchen & Dining"));
        assert_eq!(desc.display_name(), "Kitchen & Dining");
        assert_eq!(
            desc.friendly_name,
            "192.168.1.10 - Sonos One - RINCON_KITCHEN"
        );
    }

    #[test]
    fn falls_back_to_friendly_name() {
        let desc = parse_device_description(DEVICE_DESCRIPTION_NO_ROOM).unwrap();
        assert_eq!(desc.uuid, "RINCON_OFFICE");
        assert_eq!(desc.room_name, None);
        assert_eq!(desc.display_name(), "Office Speaker");
    }

    #[test]
    fn description_without_udn_is_rejected() {
        let xml = "<root><device><friendlyName>Printer</friendlyName></device></root>";
        assert!(parse_device_description(xml).is_none());
    }

    #[test]
    fn default_location_uses_control_port() {
        assert_eq!(
            default_location("192.168.1.10"),
            "http://192.168.1.10:1400/xml/device_description.xml"
        );
    }
}
