use anyhow::{Context, Result};
use image::DynamicImage;
use log::{debug, warn};

use crate::locate::ImageReference;
use crate::network::DownloadPolicy;
use crate::scale::{scale_to_height, ScaleMode};
use crate::services::{Connectivity, HttpTransport};

/// Downloads `reference` and fits it to `target_height`.
///
/// Returns `None` when the policy forbids downloading (the transport is not
/// touched), or when the download, the decode or the resize fails.
pub fn load_wallpaper_image(
    transport: &dyn HttpTransport,
    policy: DownloadPolicy,
    connectivity: &dyn Connectivity,
    reference: &ImageReference,
    target_height: u32,
    mode: ScaleMode,
) -> Option<DynamicImage> {
    if !policy.permits(connectivity) {
        debug!("Skipping image download, WiFi-only policy active and WiFi is off");
        return None;
    }

    match try_load(transport, reference, target_height, mode) {
        Ok(image) => Some(image),
        Err(e) => {
            warn!("Failed to load wallpaper {}: {:#}", reference, e);
            None
        }
    }
}

fn try_load(
    transport: &dyn HttpTransport,
    reference: &ImageReference,
    target_height: u32,
    mode: ScaleMode,
) -> Result<DynamicImage> {
    let bytes = transport.get_bytes(reference.as_str())?;
    let image = image::load_from_memory(&bytes)
        .with_context(|| format!("Failed to decode {} bytes as an image", bytes.len()))?;

    debug!(
        "Decoded {}x{} image, fitting to height {} ({})",
        image.width(),
        image.height(),
        target_height,
        mode
    );

    scale_to_height(&image, mode, target_height).with_context(|| {
        format!(
            "Cannot fit {}x{} image to height {}",
            image.width(),
            image.height(),
            target_height
        )
    })
}
