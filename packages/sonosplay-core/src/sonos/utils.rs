//! XML and URL helpers shared by the SOAP and discovery code.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::protocol_constants::SONOS_PORT;

/// Text of the first element whose local name is `element_name`.
///
/// Namespace prefixes are ignored and HTML entities in the text are decoded,
/// so an escaped `ZoneGroupState` payload comes back as plain XML.
pub fn extract_xml_text(xml: &str, element_name: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == element_name.as_bytes() => {
                return reader
                    .read_text(e.name())
                    .ok()
                    .map(|text| html_escape::decode_html_entities(&text).into_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
        buf.clear();
    }
}

/// Value of attribute `attr_name` on `elem`, lossily decoded.
pub fn get_xml_attr(elem: &BytesStart, attr_name: &[u8]) -> Option<String> {
    elem.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == attr_name)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Host part of a `Location` URL such as
/// `http://192.168.1.100:1400/xml/device_description.xml`.
pub fn extract_ip_from_location(location: &str) -> Option<String> {
    let url = reqwest::Url::parse(location).ok()?;
    if url.scheme() != "http" {
        return None;
    }
    url.host_str().map(str::to_string)
}

/// `http://{ip}:1400{endpoint}`.
pub fn build_sonos_url(ip: &str, endpoint: &str) -> String {
    format!("http://{}:{}{}", ip, SONOS_PORT, endpoint)
}

/// Escapes `& < > " '` for SOAP arguments and DIDL-Lite values.
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
