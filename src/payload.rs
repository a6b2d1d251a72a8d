//! QR payload formats.
//!
//! Every format is a pure, total mapping from the three device fields to the
//! text placed inside the QR symbol. Output is byte-stable: scanners in the
//! field parse these exact templates, `olarm` above all.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::RecordDraft;

/// Payload layout selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum QrFormat {
    /// `https://olarm.com/o/flxr?a={serial},{uid},{code}`.
    #[default]
    Olarm,
    /// Compact JSON object with `sn`, `vc` and `uid` keys.
    Json,
    /// `{serial},{code},{uid}`.
    Csv,
    /// `{serial}|{code}|{uid}`.
    Pipe,
    /// `{serial}:{code}:{uid}`.
    Compact,
    /// One `Label: value` line per field.
    Labeled,
    /// Validation endpoint query string.
    Url,
}

#[derive(Serialize)]
struct JsonPayload<'a> {
    sn: &'a str,
    vc: &'a str,
    uid: &'a str,
}

impl QrFormat {
    /// Every format, default first.
    pub const ALL: [Self; 7] = [
        Self::Olarm,
        Self::Json,
        Self::Csv,
        Self::Pipe,
        Self::Compact,
        Self::Labeled,
        Self::Url,
    ];

    /// Resolves a format name, falling back to [`QrFormat::Olarm`].
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(name))
            .unwrap_or_default()
    }

    /// Lowercase selector name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Olarm => "olarm",
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Pipe => "pipe",
            Self::Compact => "compact",
            Self::Labeled => "labeled",
            Self::Url => "url",
        }
    }

    /// One-line help text for format pickers.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Olarm => "Olarm onboarding link (default)",
            Self::Json => "JSON object: {\"sn\",\"vc\",\"uid\"}",
            Self::Csv => "Comma separated: serial,code,uid",
            Self::Pipe => "Pipe separated: serial|code|uid",
            Self::Compact => "Colon separated: serial:code:uid",
            Self::Labeled => "Human readable, one field per line",
            Self::Url => "Validation URL with sn, vc and uid parameters",
        }
    }

    /// Renders the payload text for one device.
    pub fn encode(self, serial: &str, verification_code: &str, device_uid: &str) -> String {
        match self {
            Self::Olarm => {
                format!("https://olarm.com/o/flxr?a={serial},{device_uid},{verification_code}")
            }
            Self::Json => {
                let body = JsonPayload {
                    sn: serial,
                    vc: verification_code,
                    uid: device_uid,
                };
                // Plain string fields always serialize.
                serde_json::to_string(&body).unwrap_or_default()
            }
            Self::Csv => format!("{serial},{verification_code},{device_uid}"),
            Self::Pipe => format!("{serial}|{verification_code}|{device_uid}"),
            Self::Compact => format!("{serial}:{verification_code}:{device_uid}"),
            Self::Labeled => format!(
                "Serial Number: {serial}\nVerification Code: {verification_code}\nDevUID: {device_uid}"
            ),
            Self::Url => format!(
                "https://validate.example.com?sn={serial}&vc={verification_code}&uid={device_uid}"
            ),
        }
    }

    /// Renders the payload text for a draft.
    pub fn encode_draft(self, draft: &RecordDraft) -> String {
        self.encode(
            &draft.serial_number,
            &draft.verification_code,
            &draft.device_uid,
        )
    }
}

impl From<&str> for QrFormat {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for QrFormat {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl fmt::Display for QrFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
