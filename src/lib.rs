//! QR code generation log for device onboarding labels.
//!
//! Each generation encodes a device's serial number, verification code and
//! hardware UID into a QR payload, renders it to PNG, and keeps a record in
//! SQLite under the lowest free id. A spreadsheet mirror and an OpenOCD UID
//! reader sit alongside.
//!
//! # Examples
//!
//! In-memory usage with [`core::store::MemoryRecordStore`]:
//! ```
//! use qrlog::{
//!     core::store::MemoryRecordStore,
//!     payload::QrFormat,
//!     persist::RecordStore,
//!     record::RecordDraft,
//! };
//!
//! let draft = RecordDraft::new("SN001", "123456", "4D91EC53E5DDA7D7");
//! assert_eq!(
//!     QrFormat::Pipe.encode_draft(&draft),
//!     "SN001|123456|4D91EC53E5DDA7D7"
//! );
//!
//! let mut store = MemoryRecordStore::new();
//! let rec = store.create(draft, "qr_codes/SN001.png").expect("create");
//! assert_eq!(rec.id, 1);
//! ```
//!
//! Runtime usage with SQLite:
//! ```no_run
//! use qrlog::{
//!     persist::sqlite::SqliteRecordStore,
//!     record::RecordDraft,
//!     runtime::handle::{spawn_qrlog, GenerateRequest, RuntimeConfig},
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = SqliteRecordStore::open("qr_codes.db").expect("open sqlite");
//! let handle = spawn_qrlog(Box::new(store), RuntimeConfig::default());
//! let generated = handle
//!     .generate(GenerateRequest::new(RecordDraft::new(
//!         "SN001",
//!         "123456",
//!         "4D91EC53E5DDA7D7",
//!     )))
//!     .await
//!     .expect("generate");
//! println!("{}", generated.image_path.display());
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```
#![deny(missing_docs)]

/// Layered application configuration.
pub mod config;
/// In-memory store and id allocation.
pub mod core;
/// Device UID extraction through OpenOCD.
pub mod devuid;
/// Spreadsheet export.
pub mod export;
/// QR payload formats.
pub mod payload;
/// Persistence abstraction, SQLite implementation and schema migration.
pub mod persist;
/// Generation records and validation.
pub mod record;
/// QR rendering and image naming.
pub mod render;
/// Single-writer runtime handle and events.
pub mod runtime;
/// Shared primitive types.
pub mod types;
