//! Generation record, draft input, and validation.

use chrono::{NaiveDateTime, SubsecRound, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::RecordId;

/// A required draft field was empty or whitespace only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("required field `{field}` is empty")]
pub struct ValidationError {
    /// Column name of the offending field.
    pub field: &'static str,
}

/// Fully materialized record of one QR generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrRecord {
    /// Store-assigned identifier.
    pub id: RecordId,
    /// Device serial number.
    pub serial_number: String,
    /// Device verification code.
    pub verification_code: String,
    /// Hardware UID of the device.
    pub device_uid: String,
    /// Optional human-facing device name.
    pub device_name: Option<String>,
    /// Path of the rendered QR image.
    pub qr_filename: String,
    /// Insertion time, UTC.
    pub created_at: NaiveDateTime,
}

/// Caller-supplied fields for a new [`QrRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordDraft {
    /// Device serial number.
    pub serial_number: String,
    /// Device verification code.
    pub verification_code: String,
    /// Hardware UID of the device.
    pub device_uid: String,
    /// Optional human-facing device name.
    pub device_name: Option<String>,
}

impl RecordDraft {
    /// Builds a draft without a device name.
    pub fn new(
        serial_number: impl Into<String>,
        verification_code: impl Into<String>,
        device_uid: impl Into<String>,
    ) -> Self {
        Self {
            serial_number: serial_number.into(),
            verification_code: verification_code.into(),
            device_uid: device_uid.into(),
            device_name: None,
        }
    }

    /// Sets the optional device name.
    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    /// Checks that every required field is non-blank.
    ///
    /// Fields are checked in column order and the first blank one is reported.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("serial_number", &self.serial_number),
            ("verification_code", &self.verification_code),
            ("dev_uid", &self.device_uid),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError { field });
            }
        }
        Ok(())
    }

    /// Device name with blank values collapsed to `None`.
    pub fn normalized_device_name(&self) -> Option<&str> {
        self.device_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    pub(crate) fn into_record(
        self,
        id: RecordId,
        qr_filename: String,
        created_at: NaiveDateTime,
    ) -> QrRecord {
        let device_name = self.normalized_device_name().map(str::to_string);
        QrRecord {
            id,
            serial_number: self.serial_number,
            verification_code: self.verification_code,
            device_uid: self.device_uid,
            device_name,
            qr_filename,
            created_at,
        }
    }
}

/// Produces a valid draft filled with random bench/test values.
pub fn sample_draft<R: Rng + ?Sized>(rng: &mut R) -> RecordDraft {
    let serial: u64 = rng.random_range(0..1_000_000_000_000);
    let code: u32 = rng.random_range(0..1_000_000);
    let uid: u64 = rng.random();
    RecordDraft::new(
        format!("TEST{serial:012}"),
        format!("{code:06}"),
        format!("{uid:016X}"),
    )
}

/// Current UTC time at the microsecond precision the store persists.
pub(crate) fn now_utc() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(6)
}
