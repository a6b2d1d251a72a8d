//! Application configuration.
//!
//! Layered as: serde defaults, then an optional config file (path from
//! `QRLOG_CONFIG`, default `qrlog`, extension picks the format), then
//! `QRLOG__SECTION__KEY` environment overrides.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{
    devuid::DevUidConfig,
    export::SpreadsheetExporter,
    payload::QrFormat,
    render::{EcLevel, RenderSettings},
};

/// Record database and image locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file. Default: "qr_codes.db".
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Directory for rendered QR images. Default: "qr_codes".
    #[serde(default = "default_qr_dir")]
    pub qr_dir: PathBuf,
}

fn default_db_path() -> PathBuf {
    "qr_codes.db".into()
}
fn default_qr_dir() -> PathBuf {
    "qr_codes".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            qr_dir: default_qr_dir(),
        }
    }
}

/// Payload format plus symbol rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrConfig {
    /// Payload format used when a request names none. Default: olarm.
    #[serde(default)]
    pub format: QrFormat,
    /// Error correction level. Default: medium.
    #[serde(default)]
    pub ec_level: EcLevel,
    /// Pixels per module. Default: 10.
    #[serde(default = "default_module_px")]
    pub module_px: u32,
    /// Draw the 4-module quiet zone. Default: true.
    #[serde(default = "default_quiet_zone")]
    pub quiet_zone: bool,
}

fn default_module_px() -> u32 {
    RenderSettings::default().module_px
}
fn default_quiet_zone() -> bool {
    RenderSettings::default().quiet_zone
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            format: QrFormat::default(),
            ec_level: EcLevel::default(),
            module_px: default_module_px(),
            quiet_zone: default_quiet_zone(),
        }
    }
}

impl QrConfig {
    /// Renderer parameters from this section.
    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            ec_level: self.ec_level,
            module_px: self.module_px,
            quiet_zone: self.quiet_zone,
        }
    }
}

/// Spreadsheet mirror settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Refresh the spreadsheet after every create and delete. Default: true.
    #[serde(default = "default_export_enabled")]
    pub enabled: bool,
    /// Output file. Default: "qr_records.xlsx".
    #[serde(default = "default_export_path")]
    pub path: PathBuf,
    /// Embedded image edge in pixels. Default: 100.
    #[serde(default = "default_image_px")]
    pub image_px: u32,
}

fn default_export_enabled() -> bool {
    true
}
fn default_export_path() -> PathBuf {
    "qr_records.xlsx".into()
}
fn default_image_px() -> u32 {
    100
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: default_export_enabled(),
            path: default_export_path(),
            image_px: default_image_px(),
        }
    }
}

impl ExportConfig {
    /// Exporter writing to [`ExportConfig::path`].
    pub fn exporter(&self) -> SpreadsheetExporter {
        SpreadsheetExporter::new(self.path.clone(), self.image_px)
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Maximum tracing level. Default: "info".
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// `[store]` section.
    #[serde(default)]
    pub store: StoreConfig,
    /// `[qr]` section.
    #[serde(default)]
    pub qr: QrConfig,
    /// `[export]` section.
    #[serde(default)]
    pub export: ExportConfig,
    /// `[devuid]` section.
    #[serde(default)]
    pub devuid: DevUidConfig,
    /// `[log]` section.
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    /// Loads from `QRLOG_CONFIG` (default `qrlog`) plus the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("QRLOG_CONFIG").unwrap_or_else(|_| "qrlog".to_string());
        Self::load_from(&config_path)
    }

    /// Loads from an explicit file name plus the environment.
    ///
    /// A missing file is not an error.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let name = path.as_ref().to_string_lossy().into_owned();
        let s = Config::builder()
            .add_source(File::with_name(&name).required(false))
            .add_source(Environment::with_prefix("QRLOG").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Level for the fmt subscriber, falling back to INFO.
    pub fn log_level(&self) -> tracing::Level {
        self.log.level.parse().unwrap_or(tracing::Level::INFO)
    }
}
