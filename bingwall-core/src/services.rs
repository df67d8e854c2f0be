// Service traits and default implementations for dependency injection
use anyhow::{bail, Context, Result};
use chrono::Datelike;
use std::fs;
use std::path::{Path, PathBuf};

/// Blocking HTTP access used by the fetcher and the loader.
pub trait HttpTransport {
    /// GET `url` and return the body decoded as text.
    fn get_text(&self, url: &str) -> Result<String>;

    /// GET `url` and return the raw body.
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// Answers whether a WiFi link is currently available.
pub trait Connectivity {
    fn is_wifi_enabled(&self) -> bool;
}

/// Source of the current calendar day.
pub trait Clock {
    /// Day of the month, 1-31.
    fn day_of_month(&self) -> u32;
}

/// Default transport backed by attohttpc.
#[derive(Debug, Default, Clone, Copy)]
pub struct AttoHttpTransport;

impl AttoHttpTransport {
    fn send(url: &str) -> Result<attohttpc::Response> {
        let response = attohttpc::get(url)
            .send()
            .with_context(|| format!("Request to {} failed", url))?;

        if !response.is_success() {
            bail!("Request to {} returned status {}", url, response.status());
        }

        Ok(response)
    }
}

impl HttpTransport for AttoHttpTransport {
    fn get_text(&self, url: &str) -> Result<String> {
        let response = Self::send(url)?;
        response.text().context("Failed to read response body as text")
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = Self::send(url)?;
        response.bytes().context("Failed to read response body")
    }
}

/// Reads link state from the kernel's network class directory.
///
/// An interface counts as WiFi when it exposes a `wireless` entry, and as
/// enabled when its `operstate` is `up`.
#[derive(Debug, Clone)]
pub struct SysfsConnectivity {
    root: PathBuf,
}

impl SysfsConnectivity {
    pub fn new() -> Self {
        Self::with_root("/sys/class/net")
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for SysfsConnectivity {
    fn default() -> Self {
        Self::new()
    }
}

impl Connectivity for SysfsConnectivity {
    fn is_wifi_enabled(&self) -> bool {
        #[cfg(target_os = "linux")]
        {
            match wireless_link_up(&self.root) {
                Ok(up) => up,
                Err(e) => {
                    log::debug!("Could not query WiFi state under {:?}: {}", self.root, e);
                    false
                }
            }
        }

        #[cfg(not(target_os = "linux"))]
        {
            log::debug!("WiFi state is not available on this platform, reporting disabled");
            false
        }
    }
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn wireless_link_up(root: &Path) -> Result<bool> {
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if !path.join("wireless").exists() {
            continue;
        }

        let state = fs::read_to_string(path.join("operstate")).unwrap_or_default();
        if state.trim() == "up" {
            return Ok(true);
        }
    }

    Ok(false)
}

/// Connectivity with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticConnectivity(pub bool);

impl Connectivity for StaticConnectivity {
    fn is_wifi_enabled(&self) -> bool {
        self.0
    }
}

/// Clock on the local time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn day_of_month(&self) -> u32 {
        chrono::Local::now().day()
    }
}
