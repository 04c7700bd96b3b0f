//! Best-effort header logo.
//!
//! Loading never fails a build: any read, timeout or decode problem becomes a
//! `LogoLoadFailure`, which is logged and collapsed into `LogoAsset::Absent`.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

pub const LOGO_MAX_WIDTH: f32 = 60.0;
pub const LOGO_MAX_HEIGHT: f32 = 60.0;

/// Upper bound on reading the logo file at startup.
pub const LOGO_LOAD_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum LogoLoadFailure {
    #[error("failed to read logo: {0}")]
    Read(#[from] std::io::Error),

    #[error("timed out after {0:?} reading logo")]
    Timeout(Duration),

    #[error("failed to decode logo: {0}")]
    Decode(#[from] image::ImageError),

    #[error("logo has zero width or height")]
    Empty,
}

/// Decoded logo pixels, ready to be embedded as an image XObject.
#[derive(Clone)]
pub struct LogoImage {
    pub width: u32,
    pub height: u32,
    /// Interleaved 8-bit RGB samples.
    pub rgb: Vec<u8>,
    /// 8-bit alpha samples, present only when the source had an alpha channel.
    pub alpha: Option<Vec<u8>>,
}

impl fmt::Debug for LogoImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogoImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("has_alpha", &self.alpha.is_some())
            .finish()
    }
}

impl LogoImage {
    /// Decodes PNG or JPEG bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, LogoLoadFailure> {
        let img = image::load_from_memory(bytes)?;
        let alpha = if img.color().has_alpha() {
            let rgba = img.to_rgba8();
            Some(rgba.pixels().map(|p| p.0[3]).collect())
        } else {
            None
        };
        let rgb = img.to_rgb8();
        let (width, height) = (rgb.width(), rgb.height());
        if width == 0 || height == 0 {
            return Err(LogoLoadFailure::Empty);
        }
        Ok(Self {
            width,
            height,
            rgb: rgb.into_raw(),
            alpha,
        })
    }

    /// Draw size in points: scaled down to fit the logo box, never scaled up.
    pub fn fitted_size(&self) -> (f32, f32) {
        let (w, h) = (self.width as f32, self.height as f32);
        let scale = (LOGO_MAX_WIDTH / w).min(LOGO_MAX_HEIGHT / h).min(1.0);
        (w * scale, h * scale)
    }
}

/// Whether the header has a logo to draw.
#[derive(Debug, Clone, Default)]
pub enum LogoAsset {
    Present(Arc<LogoImage>),
    #[default]
    Absent,
}

impl LogoAsset {
    /// Collapses a load result into an asset, logging the failure if there was one.
    pub fn from_load(source: &str, result: Result<LogoImage, LogoLoadFailure>) -> Self {
        match result {
            Ok(image) => {
                info!(
                    path = source,
                    width = image.width,
                    height = image.height,
                    "Logo loaded"
                );
                LogoAsset::Present(Arc::new(image))
            }
            Err(e) => {
                warn!(path = source, error = %e, "Logo unavailable; headers will omit it");
                LogoAsset::Absent
            }
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, LogoAsset::Present(_))
    }
}

/// Reads and decodes the logo at `path`, bounded by `timeout`.
pub async fn load_logo(path: Option<&Path>, timeout: Duration) -> LogoAsset {
    let Some(path) = path else {
        return LogoAsset::Absent;
    };
    let result = match tokio::time::timeout(timeout, tokio::fs::read(path)).await {
        Ok(Ok(bytes)) => LogoImage::decode(&bytes),
        Ok(Err(e)) => Err(LogoLoadFailure::Read(e)),
        Err(_) => Err(LogoLoadFailure::Timeout(timeout)),
    };
    LogoAsset::from_load(&path.display().to_string(), result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32, alpha: bool) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        if alpha {
            RgbaImage::from_pixel(width, height, Rgba([113, 38, 116, 128]))
                .write_to(&mut out, ImageFormat::Png)
                .unwrap();
        } else {
            RgbImage::from_pixel(width, height, Rgb([113, 38, 116]))
                .write_to(&mut out, ImageFormat::Png)
                .unwrap();
        }
        out.into_inner()
    }

    #[test]
    fn test_decode_rgb_png() {
        let logo = LogoImage::decode(&png_bytes(4, 2, false)).unwrap();
        assert_eq!((logo.width, logo.height), (4, 2));
        assert_eq!(logo.rgb.len(), 4 * 2 * 3);
        assert!(logo.alpha.is_none());
    }

    #[test]
    fn test_decode_keeps_alpha_channel() {
        let logo = LogoImage::decode(&png_bytes(3, 3, true)).unwrap();
        assert_eq!(logo.alpha.as_ref().map(Vec::len), Some(9));
        assert!(logo.alpha.unwrap().iter().all(|&a| a == 128));
    }

    #[test]
    fn test_decode_garbage_is_failure() {
        assert!(matches!(
            LogoImage::decode(b"definitely not an image"),
            Err(LogoLoadFailure::Decode(_))
        ));
    }

    #[test]
    fn test_fitted_size_scales_down_preserving_aspect() {
        let logo = LogoImage::decode(&png_bytes(240, 120, false)).unwrap();
        let (w, h) = logo.fitted_size();
        assert!((w - 60.0).abs() < 1e-4);
        assert!((h - 30.0).abs() < 1e-4);
    }

    #[test]
    fn test_fitted_size_never_scales_up() {
        let logo = LogoImage::decode(&png_bytes(20, 10, false)).unwrap();
        assert_eq!(logo.fitted_size(), (20.0, 10.0));
    }

    #[tokio::test]
    async fn test_load_logo_missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let asset = load_logo(Some(&dir.path().join("nope.png")), LOGO_LOAD_TIMEOUT).await;
        assert!(!asset.is_present());
    }

    #[tokio::test]
    async fn test_load_logo_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        std::fs::write(&path, png_bytes(8, 8, false)).unwrap();
        let asset = load_logo(Some(&path), LOGO_LOAD_TIMEOUT).await;
        assert!(asset.is_present());
    }

    #[tokio::test]
    async fn test_load_logo_without_path_is_absent() {
        assert!(!load_logo(None, LOGO_LOAD_TIMEOUT).await.is_present());
    }
}
