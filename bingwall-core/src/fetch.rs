use log::{debug, warn};

use crate::network::DownloadPolicy;
use crate::services::{Connectivity, HttpTransport};

pub const BING_HOST: &str = "http://www.bing.com";
pub const DEFAULT_MARKET: &str = "en-US";

/// Homepage address for a market code such as `en-US`.
pub fn homepage_url(market: &str) -> String {
    format!("{}/hp?&MKT={}", BING_HOST, market)
}

/// Downloads the homepage markup for `market`.
///
/// The body is returned with its line breaks removed. An empty string means
/// nothing was fetched: either the policy forbids downloading right now (the
/// transport is not touched) or the request failed.
pub fn fetch_page_source(
    transport: &dyn HttpTransport,
    policy: DownloadPolicy,
    connectivity: &dyn Connectivity,
    market: &str,
) -> String {
    if !policy.permits(connectivity) {
        debug!("Skipping homepage download, WiFi-only policy active and WiFi is off");
        return String::new();
    }

    let url = homepage_url(market);
    match transport.get_text(&url) {
        Ok(body) => {
            let source: String = body.lines().collect();
            debug!("Fetched {} bytes of markup from {}", source.len(), url);
            source
        }
        Err(e) => {
            warn!("Failed to fetch homepage {}: {:#}", url, e);
            String::new()
        }
    }
}
