//! Retry logic for transient SOAP errors.
//!
//! Provides backoff for SOAP requests that fail with transient faults
//! (701, 714, 716) or timeouts.

use std::future::Future;
use std::time::Duration;

use crate::sonos::soap::SoapResult;

/// Retry delays for transient SOAP errors.
const RETRY_DELAYS_MS: [u64; 3] = [200, 500, 1000];

/// Executes a SOAP operation, retrying transient failures (200ms, 500ms, 1000ms).
///
/// Non-transient errors are returned immediately; after the last delay the
/// final transient error is returned.
pub(crate) async fn with_retry<T, F, Fut>(action: &str, mut operation: F) -> SoapResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SoapResult<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < RETRY_DELAYS_MS.len() => {
                let delay_ms = RETRY_DELAYS_MS[attempt];
                attempt += 1;
                log::warn!(
                    "[Sonos] {} transient error: {} (retry {}/{} in {}ms)",
                    action,
                    e,
                    attempt,
                    RETRY_DELAYS_MS.len(),
                    delay_ms
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            Err(e) => return Err(e),
        }
    }
}
