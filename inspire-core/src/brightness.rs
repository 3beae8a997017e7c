//! Image brightness analysis for text overlay contrast.
//!
//! Each artifact is classified light or dark at build time so the page can
//! pick readable text colors without doing any pixel work in the browser.
//! Analysis failures degrade to the dark defaults with a warning; a broken
//! image never breaks a site build.

use serde::Serialize;
use std::path::Path;

/// Mean luminance threshold above which an image counts as light.
const LIGHT_THRESHOLD: f64 = 0.5;

/// Brightness classification plus the overlay colors it implies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrightnessAnalysis {
    /// Mean perceptual luminance in [0, 1], rounded to three decimals.
    pub brightness: f64,

    pub is_light: bool,
    pub text_color: String,
    pub background_color: String,
    pub accent_color: String,
}

impl BrightnessAnalysis {
    /// Classification and colors for a known mean luminance.
    pub fn from_brightness(brightness: f64) -> Self {
        let is_light = brightness > LIGHT_THRESHOLD;
        if is_light {
            Self {
                brightness,
                is_light,
                text_color: "#2c3e50".to_string(),
                background_color: "#f8f9fa".to_string(),
                accent_color: "#e74c3c".to_string(),
            }
        } else {
            Self {
                brightness,
                is_light,
                text_color: "#ecf0f1".to_string(),
                background_color: "#34495e".to_string(),
                accent_color: "#3498db".to_string(),
            }
        }
    }

    /// Defaults used when an image cannot be analyzed.
    pub fn dark_default() -> Self {
        Self::from_brightness(0.0)
    }
}

/// Analyze an image file, degrading to dark defaults on failure.
pub fn analyze(path: impl AsRef<Path>) -> BrightnessAnalysis {
    let path = path.as_ref();
    match try_analyze(path) {
        Ok(analysis) => analysis,
        Err(e) => {
            tracing::warn!("Could not analyze {}: {}", path.display(), e);
            BrightnessAnalysis::dark_default()
        }
    }
}

fn try_analyze(path: &Path) -> Result<BrightnessAnalysis, image::ImageError> {
    let rgb = image::open(path)?.to_rgb8();
    let pixel_count = (rgb.width() as u64 * rgb.height() as u64).max(1);

    // Rec. 601 luma weights.
    let total: f64 = rgb
        .pixels()
        .map(|p| 0.299 * f64::from(p[0]) + 0.587 * f64::from(p[1]) + 0.114 * f64::from(p[2]))
        .sum();
    let brightness = total / (pixel_count as f64 * 255.0);

    Ok(BrightnessAnalysis::from_brightness(
        (brightness * 1000.0).round() / 1000.0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use tempfile::TempDir;

    #[test]
    fn test_white_image_is_light() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("white.png");
        RgbImage::from_pixel(4, 4, image::Rgb([255, 255, 255]))
            .save(&path)
            .expect("save");

        let analysis = analyze(&path);
        assert!(analysis.is_light);
        assert!((analysis.brightness - 1.0).abs() < 1e-3);
        assert_eq!(analysis.text_color, "#2c3e50");
        assert_eq!(analysis.background_color, "#f8f9fa");
    }

    #[test]
    fn test_black_image_is_dark() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("black.png");
        RgbImage::from_pixel(4, 4, image::Rgb([0, 0, 0]))
            .save(&path)
            .expect("save");

        let analysis = analyze(&path);
        assert!(!analysis.is_light);
        assert!(analysis.brightness.abs() < 1e-3);
        assert_eq!(analysis.text_color, "#ecf0f1");
        assert_eq!(analysis.accent_color, "#3498db");
    }

    #[test]
    fn test_unreadable_image_degrades_to_dark_default() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").expect("write");

        assert_eq!(analyze(&path), BrightnessAnalysis::dark_default());
        assert_eq!(analyze(dir.path().join("absent.png")), BrightnessAnalysis::dark_default());
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let at = BrightnessAnalysis::from_brightness(0.5);
        assert!(!at.is_light);
        let above = BrightnessAnalysis::from_brightness(0.501);
        assert!(above.is_light);
    }
}
