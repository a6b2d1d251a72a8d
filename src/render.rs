//! QR symbol rendering and image file naming.

use std::path::Path;

use chrono::NaiveDateTime;
use image::{GrayImage, Luma};
use qrcode::{QrCode, types::QrError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures while turning payload text into a PNG.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Payload does not fit any symbol version at this error correction level.
    #[error("payload of {len} bytes exceeds QR capacity at {level:?} error correction")]
    CapacityExceeded {
        /// Payload length in bytes.
        len: usize,
        /// Requested error correction level.
        level: EcLevel,
    },
    /// Any other encoder rejection.
    #[error("qr encoding failed: {0}")]
    Encode(String),
    /// Writing the image file failed.
    #[error("failed to write qr image: {0}")]
    Image(#[from] image::ImageError),
}

/// Error correction strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EcLevel {
    /// ~7% recovery.
    Low,
    /// ~15% recovery.
    #[default]
    Medium,
    /// ~25% recovery.
    Quartile,
    /// ~30% recovery.
    High,
}

impl From<EcLevel> for qrcode::EcLevel {
    fn from(value: EcLevel) -> Self {
        match value {
            EcLevel::Low => Self::L,
            EcLevel::Medium => Self::M,
            EcLevel::Quartile => Self::Q,
            EcLevel::High => Self::H,
        }
    }
}

/// Symbol rendering parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSettings {
    /// Error correction level.
    pub ec_level: EcLevel,
    /// Edge length of one module in pixels.
    pub module_px: u32,
    /// Surround the symbol with the standard 4-module quiet zone.
    pub quiet_zone: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            ec_level: EcLevel::Medium,
            module_px: 10,
            quiet_zone: true,
        }
    }
}

/// Encodes `payload` and rasterizes it black on white.
pub fn render(payload: &str, settings: &RenderSettings) -> Result<GrayImage, RenderError> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), settings.ec_level.into())
        .map_err(|err| match err {
            QrError::DataTooLong => RenderError::CapacityExceeded {
                len: payload.len(),
                level: settings.ec_level,
            },
            other => RenderError::Encode(other.to_string()),
        })?;

    let px = settings.module_px.max(1);
    Ok(code
        .render::<Luma<u8>>()
        .quiet_zone(settings.quiet_zone)
        .module_dimensions(px, px)
        .build())
}

/// Writes `image` as PNG, creating the parent directory when missing.
pub fn save_png(image: &GrayImage, path: &Path) -> Result<(), RenderError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(image::ImageError::IoError)?;
    }
    image.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

/// Image file name for one generation.
///
/// The serial is reduced to ASCII alphanumerics, `_` and `-` so user input
/// can never name a path outside the image directory.
pub fn image_file_name(serial: &str, at: NaiveDateTime) -> String {
    let mut safe: String = serial
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if safe.is_empty() {
        safe.push_str("unnamed");
    }
    format!("qr_code_{safe}_{}.png", at.format("%Y%m%d_%H%M%S_%6f"))
}
