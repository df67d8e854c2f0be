use anyhow::{Context, Result};
use image::{imageops, DynamicImage, ImageFormat, Rgb, RgbImage};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::conf::Viewport;
use crate::desktop::{SystemWallpaperSetter, WallpaperSetter};
use crate::engine::{Renderer, Wallpaper};

/// Draws `image` onto a black viewport-sized canvas at `(x_offset, 0)`.
pub fn compose_frame(image: &DynamicImage, x_offset: i32, viewport: Viewport) -> RgbImage {
    let mut frame = RgbImage::from_pixel(viewport.width, viewport.height, Rgb([0, 0, 0]));
    imageops::overlay(&mut frame, &image.to_rgb8(), i64::from(x_offset), 0);
    frame
}

/// Renders by writing a frame to disk and making it the desktop background.
///
/// The desktop is only touched when the wallpaper, the offset or the
/// viewport differs from the previous frame. Each frame gets its own file
/// name next to `output`, since desktops ignore a setting whose path did
/// not change; the previous frame's file is removed once the new one is
/// applied.
pub struct DesktopRenderer<S: WallpaperSetter = SystemWallpaperSetter> {
    output: PathBuf,
    setter: S,
    last_frame: Option<(u64, i32, Viewport)>,
    last_path: Option<PathBuf>,
}

impl DesktopRenderer<SystemWallpaperSetter> {
    pub fn new(output: &Path) -> Self {
        Self::with_setter(output, SystemWallpaperSetter)
    }
}

impl<S: WallpaperSetter> DesktopRenderer<S> {
    pub fn with_setter(output: &Path, setter: S) -> Self {
        Self {
            output: output.to_path_buf(),
            setter,
            last_frame: None,
            last_path: None,
        }
    }

    /// `<stem>-<generation>-<offset>-<width>x<height>.<ext>` beside `output`.
    fn frame_path(&self, (generation, x_offset, viewport): (u64, i32, Viewport)) -> PathBuf {
        let stem = self
            .output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "wallpaper".to_string());
        let extension = self
            .output
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "jpg".to_string());

        self.output.with_file_name(format!(
            "{}-{}-{}-{}x{}.{}",
            stem, generation, x_offset, viewport.width, viewport.height, extension
        ))
    }

    fn write_frame(&self, frame: RgbImage, path: &Path) -> Result<()> {
        let staging = path.with_extension("partial");
        frame
            .save_with_format(&staging, ImageFormat::Jpeg)
            .with_context(|| format!("Failed to write {}", staging.display()))?;
        fs::rename(&staging, path).with_context(|| format!("Failed to move frame to {}", path.display()))?;
        Ok(())
    }
}

impl<S: WallpaperSetter> Renderer for DesktopRenderer<S> {
    fn render(&mut self, wallpaper: &Wallpaper, x_offset: i32, viewport: Viewport) -> Result<()> {
        let key = (wallpaper.generation, x_offset, viewport);
        if self.last_frame == Some(key) {
            return Ok(());
        }

        debug!(
            "Composing frame for wallpaper #{} at offset {} in {}x{}",
            wallpaper.generation, x_offset, viewport.width, viewport.height
        );
        let path = self.frame_path(key);
        self.write_frame(compose_frame(&wallpaper.image, x_offset, viewport), &path)?;

        if !self.setter.set_wallpaper(&path)? {
            warn!("Desktop did not accept {}", path.display());
        }

        if let Some(previous) = self.last_path.replace(path) {
            if let Err(e) = fs::remove_file(&previous) {
                debug!("Could not remove old frame {}: {}", previous.display(), e);
            }
        }
        self.last_frame = Some(key);
        Ok(())
    }
}
