//! Per-speaker volume control via RenderingControl.

use reqwest::Client;

use crate::sonos::services::SonosService;
use crate::sonos::soap::{SoapError, SoapRequestBuilder, SoapResult};
use crate::sonos::utils::extract_xml_text;

/// Gets volume from an individual speaker (0-100).
pub async fn get_speaker_volume(client: &Client, speaker_ip: &str) -> SoapResult<u8> {
    let response = SoapRequestBuilder::new(client, speaker_ip, SonosService::RenderingControl)
        .action("GetVolume")
        .instance_id()
        .master_channel()
        .send()
        .await?;

    parse_volume_response(&response)
}

/// Sets volume on an individual speaker (values > 100 are clamped).
pub async fn set_speaker_volume(client: &Client, speaker_ip: &str, volume: u8) -> SoapResult<()> {
    let clamped = volume.min(100);

    SoapRequestBuilder::new(client, speaker_ip, SonosService::RenderingControl)
        .action("SetVolume")
        .instance_id()
        .master_channel()
        .arg("DesiredVolume", clamped.to_string())
        .send()
        .await?;

    Ok(())
}

fn parse_volume_response(response: &str) -> SoapResult<u8> {
    extract_xml_text(response, "CurrentVolume")
        .and_then(|v| v.trim().parse::<u8>().ok())
        .map(|v| v.min(100))
        .ok_or(SoapError::Parse)
}
