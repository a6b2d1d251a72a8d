use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::{
    config::AppConfig,
    export::{ExportError, SpreadsheetExporter},
    payload::QrFormat,
    persist::{DeletedRecord, RecordStore, StoreError, remove_image_best_effort},
    record::{QrRecord, RecordDraft, now_utc},
    render::{self, RenderError, RenderSettings},
    types::{RecordId, SortOrder},
};

use super::events::QrEvent;

/// Failures returned through [`QrLogHandle`].
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Validation or storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The payload could not be rendered or saved.
    #[error(transparent)]
    Render(#[from] RenderError),
    /// An explicit export failed.
    #[error(transparent)]
    Export(#[from] ExportError),
    /// `export` was requested with no exporter configured.
    #[error("spreadsheet export is not configured")]
    ExportDisabled,
    /// The runtime task has stopped.
    #[error("runtime channel closed")]
    ChannelClosed,
}

/// Settings owned by the runtime task.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Directory receiving rendered PNGs.
    pub qr_dir: PathBuf,
    /// Symbol rendering parameters.
    pub render: RenderSettings,
    /// Format used when a request does not name one.
    pub default_format: QrFormat,
    /// Spreadsheet target; `None` disables every export.
    pub exporter: Option<SpreadsheetExporter>,
    /// Rewrite the spreadsheet after every generate and delete.
    pub auto_export: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            qr_dir: PathBuf::from("qr_codes"),
            render: RenderSettings::default(),
            default_format: QrFormat::default(),
            exporter: None,
            auto_export: false,
        }
    }
}

impl From<&AppConfig> for RuntimeConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            qr_dir: cfg.store.qr_dir.clone(),
            render: cfg.qr.render_settings(),
            default_format: cfg.qr.format,
            exporter: Some(cfg.export.exporter()),
            auto_export: cfg.export.enabled,
        }
    }
}

/// Input of one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    /// Device fields to encode and store.
    pub draft: RecordDraft,
    /// `None` uses [`RuntimeConfig::default_format`].
    pub format: Option<QrFormat>,
}

impl GenerateRequest {
    /// Request using the configured default format.
    pub fn new(draft: RecordDraft) -> Self {
        Self {
            draft,
            format: None,
        }
    }

    /// Overrides the payload format.
    pub fn with_format(mut self, format: QrFormat) -> Self {
        self.format = Some(format);
        self
    }
}

/// Outcome of a successful generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedQr {
    /// Stored record.
    pub record: QrRecord,
    /// Text encoded in the symbol.
    pub payload: String,
    /// Written PNG.
    pub image_path: PathBuf,
}

/// Cloneable front end to the runtime task.
pub struct QrLogHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<QrEvent>,
}

impl Clone for QrLogHandle {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
            events_tx: self.events_tx.clone(),
        }
    }
}

enum Command {
    Generate {
        request: GenerateRequest,
        resp: oneshot::Sender<Result<GeneratedQr, RuntimeError>>,
    },
    List {
        order: SortOrder,
        limit: Option<usize>,
        resp: oneshot::Sender<Result<Vec<QrRecord>, RuntimeError>>,
    },
    Get {
        id: RecordId,
        resp: oneshot::Sender<Result<Option<QrRecord>, RuntimeError>>,
    },
    Delete {
        id: RecordId,
        resp: oneshot::Sender<Result<DeletedRecord, RuntimeError>>,
    },
    Export {
        resp: oneshot::Sender<Result<usize, RuntimeError>>,
    },
    Shutdown {
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
}

/// Spawns the task that owns `store`; every operation runs there in order.
pub fn spawn_qrlog(store: Box<dyn RecordStore>, config: RuntimeConfig) -> QrLogHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(256);
    let (events_tx, _) = broadcast::channel::<QrEvent>(1024);

    let mut worker = Worker {
        store,
        config,
        events_tx: events_tx.clone(),
    };

    tokio::spawn(async move {
        let mut shutdown_resp = None;
        while let Some(cmd) = cmd_rx.recv().await {
            if let Command::Shutdown { resp } = cmd {
                shutdown_resp = Some(resp);
                break;
            }
            worker.handle_command(cmd);
        }

        let closed = worker.store.close().map_err(RuntimeError::from);
        if let Err(err) = &closed {
            tracing::warn!(error = %err, "record store did not close cleanly");
        }
        if let Some(resp) = shutdown_resp {
            let _ = resp.send(closed);
        }
    });

    QrLogHandle { cmd_tx, events_tx }
}

impl QrLogHandle {
    /// New receiver for runtime events.
    pub fn subscribe(&self) -> broadcast::Receiver<QrEvent> {
        self.events_tx.subscribe()
    }

    /// Validates, encodes, renders and stores one QR code.
    pub async fn generate(&self, request: GenerateRequest) -> Result<GeneratedQr, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Generate { request, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Records in `order`, at most `limit` of them.
    pub async fn list(
        &self,
        order: SortOrder,
        limit: Option<usize>,
    ) -> Result<Vec<QrRecord>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::List {
                order,
                limit,
                resp: tx,
            })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Record with `id`, if live.
    pub async fn get(&self, id: RecordId) -> Result<Option<QrRecord>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Get { id, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Deletes a record and its image.
    pub async fn delete(&self, id: RecordId) -> Result<DeletedRecord, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Delete { id, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Rewrites the spreadsheet now, returning the row count.
    pub async fn export(&self) -> Result<usize, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Export { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Stops the loop and closes the store.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Shutdown { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }
}

struct Worker {
    store: Box<dyn RecordStore>,
    config: RuntimeConfig,
    events_tx: broadcast::Sender<QrEvent>,
}

impl Worker {
    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Generate { request, resp } => {
                let _ = resp.send(self.generate(request));
            }
            Command::List { order, limit, resp } => {
                let _ = resp.send(self.store.list(order, limit).map_err(RuntimeError::from));
            }
            Command::Get { id, resp } => {
                let _ = resp.send(self.store.get(id).map_err(RuntimeError::from));
            }
            Command::Delete { id, resp } => {
                let _ = resp.send(self.delete(id));
            }
            Command::Export { resp } => {
                let _ = resp.send(self.export());
            }
            Command::Shutdown { resp } => {
                // Intercepted by the loop before dispatch.
                let _ = resp.send(Ok(()));
            }
        }
    }

    fn generate(&mut self, request: GenerateRequest) -> Result<GeneratedQr, RuntimeError> {
        let GenerateRequest { draft, format } = request;
        draft.validate().map_err(StoreError::from)?;

        let format = format.unwrap_or(self.config.default_format);
        let payload = format.encode_draft(&draft);
        let image = render::render(&payload, &self.config.render)?;

        let file_name = render::image_file_name(&draft.serial_number, now_utc());
        let image_path = self.config.qr_dir.join(file_name);
        render::save_png(&image, &image_path)?;

        let qr_filename = image_path.to_string_lossy().into_owned();
        let record = match self.store.create(draft, &qr_filename) {
            Ok(record) => record,
            Err(err) => {
                remove_image_best_effort(&qr_filename);
                return Err(err.into());
            }
        };

        tracing::info!(
            id = record.id,
            serial = %record.serial_number,
            format = %format,
            image = %image_path.display(),
            "qr code generated"
        );
        let _ = self.events_tx.send(QrEvent::Generated { id: record.id });
        self.refresh_spreadsheet();

        Ok(GeneratedQr {
            record,
            payload,
            image_path,
        })
    }

    fn delete(&mut self, id: RecordId) -> Result<DeletedRecord, RuntimeError> {
        let deleted = self.store.delete(id)?;
        tracing::info!(id, image_removed = deleted.image_removed, "record deleted");
        let _ = self.events_tx.send(QrEvent::Deleted { id });
        self.refresh_spreadsheet();
        Ok(deleted)
    }

    fn export(&self) -> Result<usize, RuntimeError> {
        let exporter = self
            .config
            .exporter
            .as_ref()
            .ok_or(RuntimeError::ExportDisabled)?;
        let records = self.store.list(SortOrder::OldestFirst, None)?;
        let rows = exporter.write(&records)?;
        let _ = self.events_tx.send(QrEvent::Exported {
            path: exporter.path.clone(),
            rows,
        });
        Ok(rows)
    }

    /// Follow-up export after a mutation; failures are logged only.
    fn refresh_spreadsheet(&self) {
        if !self.config.auto_export || self.config.exporter.is_none() {
            return;
        }
        if let Err(err) = self.export() {
            tracing::warn!(error = %err, "spreadsheet refresh failed");
        }
    }
}
