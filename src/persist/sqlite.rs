//! SQLite-backed record store.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime};
use rusqlite::{
    Connection, OptionalExtension, Row, TransactionBehavior, params,
    types::{Type, ValueRef},
};

use crate::{
    core::slots::lowest_free_slot,
    record::{QrRecord, RecordDraft, now_utc},
    types::{RecordId, SortOrder},
};

use super::{
    DeletedRecord, RecordStore, StoreError, StoreResult, migrate, remove_image_best_effort,
};

const RECORD_COLUMNS: &str =
    "id, serial_number, verification_code, dev_uid, device_name, qr_filename, created_at";

/// SQLite implementation of [`crate::persist::RecordStore`].
pub struct SqliteRecordStore {
    conn: Connection,
}

impl SqliteRecordStore {
    /// Opens or creates the record database at `path`.
    ///
    /// Creates missing parent directories, enables WAL mode, sets
    /// `synchronous=NORMAL`, and migrates legacy auto-increment tables.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens an in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(mut conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        // A failed migration leaves the legacy table in place and usable.
        if let Err(err) = migrate::run(&mut conn) {
            tracing::error!(error = %err, "continuing with unmigrated qr_records table");
        }
        migrate::ensure_device_name(&conn)?;
        Ok(Self { conn })
    }

    /// Closes the underlying connection.
    pub fn close(self) -> StoreResult<()> {
        self.conn.close().map_err(|(_, err)| StoreError::Sqlite(err))
    }
}

impl RecordStore for SqliteRecordStore {
    fn create(&mut self, draft: RecordDraft, qr_filename: &str) -> StoreResult<QrRecord> {
        draft.validate()?;

        // Immediate: the id scan and the insert share one write lock.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let id = {
            let mut stmt = tx.prepare("SELECT id FROM qr_records ORDER BY id ASC")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, RecordId>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            lowest_free_slot(ids)
        };

        let rec = draft.into_record(id, qr_filename.to_string(), now_utc());
        tx.execute(
            "INSERT INTO qr_records
                (id, serial_number, verification_code, dev_uid, device_name, qr_filename, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                rec.id,
                rec.serial_number,
                rec.verification_code,
                rec.device_uid,
                rec.device_name,
                rec.qr_filename,
                format_timestamp(rec.created_at),
            ],
        )?;
        tx.commit()?;

        tracing::debug!(id = rec.id, serial = %rec.serial_number, "record created");
        Ok(rec)
    }

    fn list(&self, order: SortOrder, limit: Option<usize>) -> StoreResult<Vec<QrRecord>> {
        let dir = order.sql_direction();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM qr_records ORDER BY created_at {dir}, id {dir} LIMIT ?1"
        ))?;
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
        let rows = stmt.query_map(params![limit], record_from_row)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn get(&self, id: RecordId) -> StoreResult<Option<QrRecord>> {
        let rec = self
            .conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM qr_records WHERE id = ?1"),
                params![id],
                record_from_row,
            )
            .optional()?;
        Ok(rec)
    }

    fn delete(&mut self, id: RecordId) -> StoreResult<DeletedRecord> {
        let record = self.get(id)?.ok_or(StoreError::NotFound(id))?;
        let image_removed = remove_image_best_effort(&record.qr_filename);

        let removed = self
            .conn
            .execute("DELETE FROM qr_records WHERE id = ?1", params![id])?;
        if removed == 0 {
            return Err(StoreError::NotFound(id));
        }

        tracing::debug!(id, image_removed, "record deleted");
        Ok(DeletedRecord {
            record,
            image_removed,
        })
    }

    fn count(&self) -> StoreResult<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM qr_records", [], |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or(0))
    }

    fn close(self: Box<Self>) -> StoreResult<()> {
        SqliteRecordStore::close(*self)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<QrRecord> {
    Ok(QrRecord {
        id: row.get(0)?,
        serial_number: row.get(1)?,
        verification_code: row.get(2)?,
        device_uid: row.get(3)?,
        device_name: row.get(4)?,
        qr_filename: row.get(5)?,
        created_at: created_at_from_row(row, 6)?,
    })
}

fn created_at_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let conversion = |err: Box<dyn std::error::Error + Send + Sync>| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err)
    };
    match row.get_ref(idx)? {
        ValueRef::Text(bytes) => {
            let text = std::str::from_utf8(bytes).map_err(|err| conversion(Box::new(err)))?;
            parse_created_at(text).map_err(|err| conversion(Box::new(err)))
        }
        other => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "created_at".to_string(),
            other.data_type(),
        )),
    }
}

/// Reads every timestamp shape found in `qr_records`, as UTC.
///
/// Offset-qualified ISO 8601 values (`2025-06-01T12:00:00.123456+02:00`) are
/// shifted to UTC; `CURRENT_TIMESTAMP` text and our own format are taken as is.
fn parse_created_at(text: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let text = text.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Ok(at.naive_utc());
    }
    if let Ok(at) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(at.naive_utc());
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
}

/// Fixed-width text form, so lexical order matches time order.
fn format_timestamp(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}
