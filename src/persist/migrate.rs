//! One-time move from auto-increment ids to store-assigned ids.
//!
//! Legacy tables were declared `INTEGER PRIMARY KEY AUTOINCREMENT`, which
//! never reuses ids. Migration renumbers every row `1..=n` in `created_at`
//! order and recreates the table from `schema.sql`.
//!
//! Tables written before `device_name` existed lack that column; both the
//! migration and [`ensure_device_name`] cope with that.

use rusqlite::{Connection, OptionalExtension, Transaction, params, types::Value};

use super::StoreResult;

const HOLDING_TABLE: &str = "qr_records_legacy";

/// Result of [`run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// No auto-increment marker; nothing was touched.
    AlreadyCurrent,
    /// Rows were renumbered.
    Migrated {
        /// Rows carried over.
        rows: usize,
    },
}

/// True when `qr_records` still uses the auto-increment id policy.
pub fn needs_migration(conn: &Connection) -> StoreResult<bool> {
    let sql: Option<String> = conn
        .query_row(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = 'qr_records'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(sql.is_some_and(|sql| sql.to_ascii_uppercase().contains("AUTOINCREMENT")))
}

/// Column names of `table`, in declaration order.
pub fn table_columns(conn: &Connection, table: &str) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Adds the nullable `device_name` column to a `qr_records` table that
/// predates it. Returns true when the column was added.
pub fn ensure_device_name(conn: &Connection) -> StoreResult<bool> {
    let columns = table_columns(conn, "qr_records")?;
    if columns.is_empty() || columns.iter().any(|c| c == "device_name") {
        return Ok(false);
    }
    conn.execute_batch("ALTER TABLE qr_records ADD COLUMN device_name TEXT;")?;
    tracing::info!("added device_name column to qr_records");
    Ok(true)
}

/// Migrates a legacy table in a single transaction.
///
/// On failure the transaction is rolled back, which restores the legacy
/// table; a failing rollback is logged and the migration error returned.
pub fn run(conn: &mut Connection) -> StoreResult<MigrationOutcome> {
    if !needs_migration(conn)? {
        return Ok(MigrationOutcome::AlreadyCurrent);
    }

    let tx = conn.transaction()?;
    match rebuild(&tx) {
        Ok(rows) => {
            tx.commit()?;
            tracing::info!(rows, "migrated qr_records to store-assigned ids");
            Ok(MigrationOutcome::Migrated { rows })
        }
        Err(err) => {
            tracing::error!(error = %err, "qr_records migration failed, restoring legacy table");
            if let Err(restore_err) = tx.rollback() {
                tracing::error!(error = %restore_err, "failed to restore qr_records");
            }
            Err(err)
        }
    }
}

struct LegacyRow {
    serial_number: String,
    verification_code: String,
    dev_uid: String,
    device_name: Option<String>,
    qr_filename: String,
    created_at: Value,
}

fn rebuild(tx: &Transaction<'_>) -> StoreResult<usize> {
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {HOLDING_TABLE};
         CREATE TABLE {HOLDING_TABLE} AS SELECT * FROM qr_records;
         DROP TABLE qr_records;"
    ))?;
    tx.execute_batch(include_str!("schema.sql"))?;

    let device_name = if table_columns(tx, HOLDING_TABLE)?
        .iter()
        .any(|c| c == "device_name")
    {
        "device_name"
    } else {
        "NULL AS device_name"
    };

    let rows = {
        let mut stmt = tx.prepare(&format!(
            "SELECT serial_number, verification_code, dev_uid, {device_name}, qr_filename, created_at
             FROM {HOLDING_TABLE} ORDER BY created_at ASC, id ASC"
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok(LegacyRow {
                serial_number: row.get(0)?,
                verification_code: row.get(1)?,
                dev_uid: row.get(2)?,
                device_name: row.get(3)?,
                qr_filename: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>()?
    };

    {
        let mut insert = tx.prepare(
            "INSERT INTO qr_records
                (id, serial_number, verification_code, dev_uid, device_name, qr_filename, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for (idx, row) in rows.iter().enumerate() {
            insert.execute(params![
                idx as i64 + 1,
                row.serial_number,
                row.verification_code,
                row.dev_uid,
                row.device_name,
                row.qr_filename,
                row.created_at,
            ])?;
        }
    }

    tx.execute_batch(&format!("DROP TABLE {HOLDING_TABLE};"))?;
    Ok(rows.len())
}
