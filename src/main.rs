//! `qrlog` command line: generate, list, delete and export QR records.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use qrlog::{
    config::AppConfig,
    devuid::DevUidReader,
    payload::QrFormat,
    persist::{StoreError, sqlite::SqliteRecordStore},
    record::{RecordDraft, sample_draft},
    runtime::handle::{GenerateRequest, QrLogHandle, RuntimeConfig, RuntimeError, spawn_qrlog},
    types::{RecordId, SortOrder},
};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "qrlog", about = "Generate and track device QR codes", version)]
struct Cli {
    /// Config file; the extension selects the format.
    #[arg(long, value_name = "path", env = "QRLOG_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render a QR code and store its record.
    Generate {
        #[arg(long)]
        serial: Option<String>,
        #[arg(long = "vcode")]
        verification_code: Option<String>,
        #[arg(long = "devuid")]
        device_uid: Option<String>,
        #[arg(long)]
        name: Option<String>,
        /// Payload format; unknown names fall back to olarm.
        #[arg(long)]
        format: Option<String>,
        /// Read the device UID through OpenOCD instead of --devuid.
        #[arg(long)]
        read_uid: bool,
        /// Fill missing fields with random test values.
        #[arg(long)]
        test_data: bool,
    },
    /// Show stored records, newest first.
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        oldest_first: bool,
    },
    /// Delete a record and its image.
    Delete { id: RecordId },
    /// Rewrite the spreadsheet from the database.
    Export,
    /// Read and print the attached device's UID.
    Devuid,
    /// List payload formats.
    Formats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
    .context("Failed to load config")?;

    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(config.log_level())
        .init();

    match cli.command {
        Command::Formats => {
            for format in QrFormat::ALL {
                println!("{:<8} {}", format.name(), format.describe());
            }
            Ok(())
        }
        Command::Devuid => {
            let uid = DevUidReader::new(config.devuid.clone())
                .read()
                .await
                .context("Failed to read device UID")?;
            println!("{uid}");
            Ok(())
        }
        command => {
            let store = SqliteRecordStore::open(&config.store.db_path).with_context(|| {
                format!("Failed to open database {}", config.store.db_path.display())
            })?;
            info!(db = %config.store.db_path.display(), "record store opened");

            let handle = spawn_qrlog(Box::new(store), RuntimeConfig::from(&config));
            let result = run(&handle, &config, command).await;
            if let Err(err) = handle.shutdown().await {
                warn!(error = %err, "shutdown did not complete cleanly");
            }
            result
        }
    }
}

async fn run(handle: &QrLogHandle, config: &AppConfig, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Generate {
            serial,
            verification_code,
            device_uid,
            name,
            format,
            read_uid,
            test_data,
        } => {
            let mut draft = RecordDraft {
                serial_number: serial.unwrap_or_default(),
                verification_code: verification_code.unwrap_or_default(),
                device_uid: device_uid.unwrap_or_default(),
                device_name: name,
            };
            if read_uid {
                draft.device_uid = DevUidReader::new(config.devuid.clone())
                    .read()
                    .await
                    .context("Failed to read device UID")?;
            }
            if test_data {
                fill_missing(&mut draft);
            }

            let mut request = GenerateRequest::new(draft);
            if let Some(raw) = format {
                let parsed = QrFormat::parse(&raw);
                if !parsed.name().eq_ignore_ascii_case(raw.trim()) {
                    warn!(requested = %raw, using = %parsed, "unknown payload format");
                }
                request = request.with_format(parsed);
            }

            let generated = handle
                .generate(request)
                .await
                .context("Failed to generate QR code")?;
            println!("id:      {}", generated.record.id);
            println!("image:   {}", generated.image_path.display());
            println!("payload: {}", generated.payload);
            Ok(())
        }
        Command::List {
            limit,
            oldest_first,
        } => {
            let order = if oldest_first {
                SortOrder::OldestFirst
            } else {
                SortOrder::NewestFirst
            };
            let records = handle
                .list(order, Some(limit))
                .await
                .context("Failed to list records")?;
            for rec in records {
                println!(
                    "{:>5}  {}  {}  {}  {}  {}",
                    rec.id,
                    rec.created_at.format("%Y-%m-%d %H:%M:%S"),
                    rec.serial_number,
                    rec.verification_code,
                    rec.device_uid,
                    rec.device_name.as_deref().unwrap_or("-"),
                );
            }
            Ok(())
        }
        Command::Delete { id } => match handle.delete(id).await {
            Ok(deleted) => {
                println!("deleted record {id}");
                if !deleted.image_removed {
                    println!("image {} was not removed", deleted.record.qr_filename);
                }
                Ok(())
            }
            Err(RuntimeError::Store(StoreError::NotFound(id))) => {
                println!("no record with id {id}");
                Ok(())
            }
            Err(err) => Err(err).context("Failed to delete record"),
        },
        Command::Export => {
            let rows = handle.export().await.context("Failed to export records")?;
            println!("wrote {rows} rows to {}", config.export.path.display());
            Ok(())
        }
        Command::Devuid | Command::Formats => Ok(()),
    }
}

fn fill_missing(draft: &mut RecordDraft) {
    let sample = sample_draft(&mut rand::rng());
    if draft.serial_number.trim().is_empty() {
        draft.serial_number = sample.serial_number;
    }
    if draft.verification_code.trim().is_empty() {
        draft.verification_code = sample.verification_code;
    }
    if draft.device_uid.trim().is_empty() {
        draft.device_uid = sample.device_uid;
    }
}
