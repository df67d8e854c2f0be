use image::imageops::FilterType;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a downloaded image is fitted to the viewport height.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    /// Width moves by the same number of pixels as height.
    ///
    /// Equivalent to growing or shrinking the image one row and one column
    /// at a time. The aspect ratio drifts when the source and target
    /// heights are far apart.
    #[default]
    Stepwise,
    /// Width scales by `target / height`, preserving the aspect ratio.
    Proportional,
}

impl fmt::Display for ScaleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaleMode::Stepwise => f.write_str("stepwise"),
            ScaleMode::Proportional => f.write_str("proportional"),
        }
    }
}

impl FromStr for ScaleMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stepwise" => Ok(ScaleMode::Stepwise),
            "proportional" => Ok(ScaleMode::Proportional),
            other => Err(format!(
                "unknown scale mode '{}', expected 'stepwise' or 'proportional'",
                other
            )),
        }
    }
}

/// Target size for an image of `width` x `height` fitted to `target` rows.
///
/// Returns `None` when the target or the source is empty, or when the
/// stepwise width would collapse to zero or below.
pub fn scaled_dimensions(mode: ScaleMode, width: u32, height: u32, target: u32) -> Option<(u32, u32)> {
    if target == 0 || width == 0 || height == 0 {
        return None;
    }

    let new_width = match mode {
        ScaleMode::Stepwise => i64::from(width) + i64::from(target) - i64::from(height),
        ScaleMode::Proportional => {
            (f64::from(width) * f64::from(target) / f64::from(height)).round() as i64
        }
    };

    if new_width <= 0 {
        return None;
    }

    u32::try_from(new_width).ok().map(|w| (w, target))
}

/// Resizes `image` so its height equals `target`.
pub fn scale_to_height(image: &DynamicImage, mode: ScaleMode, target: u32) -> Option<DynamicImage> {
    let (width, height) = scaled_dimensions(mode, image.width(), image.height(), target)?;

    if (width, height) == (image.width(), image.height()) {
        return Some(image.clone());
    }

    Some(image.resize_exact(width, height, FilterType::Triangle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn stepwise_applies_height_delta_to_width() {
        assert_eq!(scaled_dimensions(ScaleMode::Stepwise, 1920, 1080, 2340), Some((3180, 2340)));
        assert_eq!(scaled_dimensions(ScaleMode::Stepwise, 1920, 1080, 800), Some((1640, 800)));
        assert_eq!(scaled_dimensions(ScaleMode::Stepwise, 1920, 1080, 1080), Some((1920, 1080)));
    }

    #[test]
    fn stepwise_drifts_from_true_aspect_for_large_deltas() {
        let (w, h) = scaled_dimensions(ScaleMode::Stepwise, 400, 100, 1000).unwrap();
        assert_eq!((w, h), (1300, 1000));
        assert_ne!(w, 4000);
    }

    #[test]
    fn stepwise_collapse_is_rejected() {
        assert_eq!(scaled_dimensions(ScaleMode::Stepwise, 100, 1000, 50), None);
        assert_eq!(scaled_dimensions(ScaleMode::Stepwise, 100, 1000, 900), None);
    }

    #[test]
    fn proportional_keeps_aspect() {
        assert_eq!(scaled_dimensions(ScaleMode::Proportional, 1920, 1080, 2340), Some((4160, 2340)));
        assert_eq!(scaled_dimensions(ScaleMode::Proportional, 3, 2, 3), Some((5, 3)));
    }

    #[test]
    fn empty_inputs_are_rejected() {
        assert_eq!(scaled_dimensions(ScaleMode::Stepwise, 10, 10, 0), None);
        assert_eq!(scaled_dimensions(ScaleMode::Proportional, 0, 10, 5), None);
        assert_eq!(scaled_dimensions(ScaleMode::Proportional, 10, 0, 5), None);
    }

    #[test]
    fn scale_to_height_resizes_image() {
        let source = DynamicImage::ImageRgb8(RgbImage::new(64, 36));

        let scaled = scale_to_height(&source, ScaleMode::Stepwise, 100).unwrap();
        assert_eq!((scaled.width(), scaled.height()), (128, 100));

        let scaled = scale_to_height(&source, ScaleMode::Proportional, 72).unwrap();
        assert_eq!((scaled.width(), scaled.height()), (128, 72));
    }

    #[test]
    fn scale_mode_parses_and_prints() {
        assert_eq!("Proportional".parse::<ScaleMode>(), Ok(ScaleMode::Proportional));
        assert_eq!(" stepwise ".parse::<ScaleMode>(), Ok(ScaleMode::Stepwise));
        assert!("bicubic".parse::<ScaleMode>().is_err());
        assert_eq!(ScaleMode::Proportional.to_string(), "proportional");
    }
}
