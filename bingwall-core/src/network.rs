use crate::services::Connectivity;

/// Restriction on when downloads may happen.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DownloadPolicy {
    pub wifi_only: bool,
}

impl DownloadPolicy {
    pub fn new(wifi_only: bool) -> Self {
        Self { wifi_only }
    }

    /// Whether a download may start right now.
    pub fn permits(&self, connectivity: &dyn Connectivity) -> bool {
        !self.wifi_only || connectivity.is_wifi_enabled()
    }
}
