//! Spreadsheet mirror of the record table.

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Image, Workbook, XlsxError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::QrRecord;

const SHEET_NAME: &str = "QR Records";
const HEADERS: [&str; 7] = [
    "ID",
    "Serial Number",
    "Verification Code",
    "DevUID",
    "Device Name",
    "QR Code",
    "Created At",
];
const QR_COLUMN: u16 = 5;

/// Spreadsheet export failures.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The workbook could not be built or saved.
    #[error("spreadsheet write failed: {0}")]
    Xlsx(#[from] XlsxError),
    /// The output directory could not be created.
    #[error("spreadsheet I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes the full record list to one `.xlsx` file, overwriting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadsheetExporter {
    /// Output `.xlsx` file.
    pub path: PathBuf,
    /// Rendered edge length of each embedded QR image.
    pub image_px: u32,
}

impl SpreadsheetExporter {
    /// Exporter writing to `path` with images scaled to `image_px`.
    pub fn new(path: impl Into<PathBuf>, image_px: u32) -> Self {
        Self {
            path: path.into(),
            image_px,
        }
    }

    /// Writes one row per record, in the given order, and returns the row count.
    ///
    /// Records whose image cannot be loaded keep an empty QR cell.
    pub fn write(&self, records: &[QrRecord]) -> Result<usize, ExportError> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;

        let bold = Format::new().set_bold();
        for (col, header) in HEADERS.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *header, &bold)?;
        }
        sheet.set_column_width(1, 20)?;
        sheet.set_column_width(2, 18)?;
        sheet.set_column_width(3, 20)?;
        sheet.set_column_width(4, 20)?;
        // Column width is in characters, roughly 7px each.
        sheet.set_column_width(QR_COLUMN, f64::from(self.image_px) / 7.0)?;
        sheet.set_column_width(6, 20)?;

        for (idx, rec) in records.iter().enumerate() {
            let row = idx as u32 + 1;
            sheet.set_row_height(row, f64::from(self.image_px) * 0.75)?;
            sheet.write_number(row, 0, rec.id as f64)?;
            sheet.write_string(row, 1, &rec.serial_number)?;
            sheet.write_string(row, 2, &rec.verification_code)?;
            sheet.write_string(row, 3, &rec.device_uid)?;
            sheet.write_string(row, 4, rec.device_name.as_deref().unwrap_or(""))?;
            sheet.write_string(row, 6, rec.created_at.format("%Y-%m-%d %H:%M:%S").to_string())?;

            match Image::new(Path::new(&rec.qr_filename)) {
                Ok(image) => {
                    sheet.embed_image(row, QR_COLUMN, &image)?;
                }
                Err(err) => {
                    tracing::warn!(
                        id = rec.id,
                        path = %rec.qr_filename,
                        error = %err,
                        "qr image unavailable, leaving cell empty"
                    );
                }
            }
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        workbook.save(&self.path)?;

        tracing::info!(path = %self.path.display(), rows = records.len(), "spreadsheet written");
        Ok(records.len())
    }
}
