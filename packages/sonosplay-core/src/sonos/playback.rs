//! Transport commands for Sonos speakers.
//!
//! Provides play and stop via AVTransport SOAP actions, retrying transient
//! SOAP errors when starting playback.

use reqwest::Client;

use crate::sonos::didl::format_didl_lite;
use crate::sonos::retry::with_retry;
use crate::sonos::services::SonosService;
use crate::sonos::soap::{SoapError, SoapRequestBuilder, SoapResult};

/// Commands a Sonos speaker to play a specific URL.
///
/// Sets the transport URI with DIDL-Lite metadata, then sends `Play`.
/// Both steps retry transient SOAP faults (701, 714, 716).
///
/// # Arguments
/// * `client` - The HTTP client to use for the request
/// * `ip` - IP address of the Sonos speaker (coordinator for grouped speakers)
/// * `uri` - The media URL to play
/// * `title` - Display title for the Sonos UI
/// * `mime_type` - MIME type of the media
pub async fn play_uri(
    client: &Client,
    ip: &str,
    uri: &str,
    title: &str,
    mime_type: &str,
) -> SoapResult<()> {
    let metadata = format_didl_lite(uri, title, mime_type);

    log::info!("[Sonos] SetAVTransportURI: ip={}, uri={}", ip, uri);

    with_retry("SetAVTransportURI", || {
        SoapRequestBuilder::new(client, ip, SonosService::AVTransport)
            .action("SetAVTransportURI")
            .instance_id()
            .arg("CurrentURI", uri)
            .arg("CurrentURIMetaData", metadata.as_str())
            .send()
    })
    .await?;

    with_retry("Play", || {
        SoapRequestBuilder::new(client, ip, SonosService::AVTransport)
            .action("Play")
            .instance_id()
            .arg("Speed", "1")
            .send()
    })
    .await?;

    log::info!("[Sonos] Play command succeeded for {}", ip);
    Ok(())
}

/// Stops playback on a Sonos speaker.
///
/// Fault 701 ("transition not available") means the speaker is already
/// stopped and is treated as success.
pub async fn stop(client: &Client, ip: &str) -> SoapResult<()> {
    let result = SoapRequestBuilder::new(client, ip, SonosService::AVTransport)
        .action("Stop")
        .instance_id()
        .send()
        .await;

    match result {
        Ok(_) => Ok(()),
        Err(SoapError::Fault(msg)) if msg.contains("701") => {
            log::debug!("[Sonos] Stop: {} already stopped (ignoring 701)", ip);
            Ok(())
        }
        Err(e) => Err(e),
    }
}
