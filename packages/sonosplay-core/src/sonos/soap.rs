//! Low-level SOAP protocol implementation for UPnP/Sonos communication.
//!
//! This module handles envelope building, HTTP transport and fault
//! detection. Typed commands live in `playback`, `volume` and `zone_groups`.

use std::time::{Duration, Instant};

use reqwest::Client;
use thiserror::Error;

use super::services::SonosService;
use super::utils::{build_sonos_url, escape_xml, extract_xml_text};
use crate::protocol_constants::SOAP_TIMEOUT_SECS;

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur during SOAP operations with Sonos speakers.
#[derive(Debug, Error)]
pub enum SoapError {
    /// HTTP request to the speaker failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Speaker returned a non-success HTTP status without a SOAP fault.
    #[error("HTTP error {0}: {1}")]
    HttpStatus(u16, String),

    /// Speaker returned a SOAP fault response.
    #[error("SOAP fault: {0}")]
    Fault(String),

    /// Failed to parse SOAP response XML.
    #[error("Failed to parse SOAP response")]
    Parse,
}

/// Convenient Result alias for SOAP operations.
pub type SoapResult<T> = Result<T, SoapError>;

impl SoapError {
    /// Returns true if this error is transient and the operation should be retried.
    ///
    /// Transient Sonos SOAP fault codes:
    /// - 701: Transition not available (device changing states)
    /// - 714: Illegal seek target (previous source still loading)
    /// - 716: Resource not found (device busy initializing)
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            SoapError::Fault(msg) => {
                msg.contains("701")
                    || msg.contains("714")
                    || msg.contains("716")
                    || msg.to_lowercase().contains("transition")
            }
            SoapError::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SOAP Request/Response
// ─────────────────────────────────────────────────────────────────────────────

/// Builds the SOAP envelope for an action.
///
/// Must be a single line with no leading whitespace: Sonos rejects XML with
/// whitespace before the root element.
fn build_envelope(service: SonosService, action: &str, args: &[(&str, String)]) -> String {
    let mut body = format!(
        r#"<?xml version="1.0" encoding="utf-8"?><s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/"><s:Body><u:{} xmlns:u="{}">"#,
        action,
        service.urn()
    );
    for (k, v) in args {
        body.push_str(&format!("<{k}>{}</{k}>", escape_xml(v)));
    }
    body.push_str(&format!("</u:{}></s:Body></s:Envelope>", action));
    body
}

/// Maps a raw HTTP response onto the SOAP result.
///
/// Faults are checked before the status since Sonos sends them with 500.
fn interpret_response(status: u16, body: String) -> SoapResult<String> {
    if body.contains("<s:Fault>") || body.contains("<soap:Fault>") {
        let detail = extract_xml_text(&body, "errorCode")
            .map(|code| format!(" (errorCode {})", code))
            .unwrap_or_default();
        let fault = extract_xml_text(&body, "faultstring")
            .unwrap_or_else(|| "Unknown SOAP fault".to_string());
        return Err(SoapError::Fault(format!("{}{}", fault, detail)));
    }

    if !(200..300).contains(&status) {
        return Err(SoapError::HttpStatus(status, body));
    }

    Ok(body)
}

/// Sends a SOAP request to a Sonos speaker and returns the response body.
///
/// # Arguments
/// * `client` - The HTTP client to use for the request
/// * `ip` - IP address of the Sonos speaker
/// * `service` - The UPnP service hosting the action
/// * `action` - The SOAP action name (e.g., "Play", "Stop", "GetVolume")
/// * `args` - Key-value pairs for action arguments (order is preserved)
pub async fn send_soap_request(
    client: &Client,
    ip: &str,
    service: SonosService,
    action: &str,
    args: &[(&str, String)],
) -> SoapResult<String> {
    let url = build_sonos_url(ip, service.control_path());
    let body = build_envelope(service, action, args);

    log::debug!(
        "[SOAP] {}#{} -> {} ({} bytes)",
        service,
        action,
        url,
        body.len()
    );

    let start = Instant::now();
    let res = client
        .post(&url)
        .header("Content-Type", "text/xml; charset=\"utf-8\"")
        .header("SOAPAction", format!("\"{}#{}\"", service.urn(), action))
        .body(body)
        .timeout(Duration::from_secs(SOAP_TIMEOUT_SECS))
        .send()
        .await?;

    let status = res.status().as_u16();
    let text = res.text().await?;
    log::debug!(
        "[SOAP] {} on {} completed in {:?} (HTTP {})",
        action,
        ip,
        start.elapsed(),
        status
    );

    interpret_response(status, text)
}

// ─────────────────────────────────────────────────────────────────────────────
// SOAP Request Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Fluent builder for SOAP calls against one speaker.
///
/// # Example
/// ```ignore
/// let response = SoapRequestBuilder::new(&client, "192.168.1.100", SonosService::AVTransport)
///     .action("Play")
///     .instance_id()
///     .arg("Speed", "1")
///     .send()
///     .await?;
/// ```
pub struct SoapRequestBuilder<'a> {
    client: &'a Client,
    ip: &'a str,
    service: SonosService,
    action: &'a str,
    args: Vec<(&'a str, String)>,
}

impl<'a> SoapRequestBuilder<'a> {
    /// Creates a builder targeting `service` on the speaker at `ip`.
    #[must_use]
    pub fn new(client: &'a Client, ip: &'a str, service: SonosService) -> Self {
        Self {
            client,
            ip,
            service,
            action: "",
            args: Vec::new(),
        }
    }

    /// Sets the SOAP action name.
    #[must_use]
    pub fn action(mut self, action: &'a str) -> Self {
        self.action = action;
        self
    }

    /// Adds an argument; arguments keep insertion order.
    #[must_use]
    pub fn arg(mut self, key: &'a str, value: impl Into<String>) -> Self {
        self.args.push((key, value.into()));
        self
    }

    /// Adds the standard InstanceID="0" argument used by most Sonos actions.
    #[must_use]
    pub fn instance_id(self) -> Self {
        self.arg("InstanceID", "0")
    }

    /// Adds the Master channel argument used by RenderingControl.
    #[must_use]
    pub fn master_channel(self) -> Self {
        self.arg("Channel", "Master")
    }

    /// Sends the request and returns the response body.
    pub async fn send(self) -> SoapResult<String> {
        if self.action.is_empty() {
            return Err(SoapError::Fault(
                "SoapRequestBuilder: action not set".into(),
            ));
        }
        send_soap_request(self.client, self.ip, self.service, self.action, &self.args).await
    }
}
