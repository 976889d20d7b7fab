//! Web page retrieval.

use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

const WEBPAGES_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::webpages");

const CONNECT_TIMEOUT_SECS: u64 = 10;
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Fetches `url` and returns its body when the server answers with a 2xx
/// status.
///
/// Transport failures, other statuses and undecodable bodies all yield
/// `None`; the reason is logged at debug level.
#[must_use]
pub fn get_page_html(url: &str) -> Option<String> {
    let client = Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .inspect_err(|error| debug!(target: WEBPAGES_TARGET, %error, "HTTP client unavailable"))
        .ok()?;

    let response = client
        .get(url)
        .send()
        .inspect_err(|error| debug!(target: WEBPAGES_TARGET, url, %error, "request failed"))
        .ok()?;

    let status = response.status();
    if !status.is_success() {
        debug!(target: WEBPAGES_TARGET, url, %status, "non-success status");
        return None;
    }
    response
        .text()
        .inspect_err(|error| debug!(target: WEBPAGES_TARGET, url, %error, "body unreadable"))
        .ok()
}
