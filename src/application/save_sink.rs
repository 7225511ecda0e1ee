use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::domain::{AppError, SaveOutcome, SavedFile};
use crate::utils::sanitize_filename;

/// Destination for downloaded payloads.
///
/// `trigger_save` only starts the save; it does not wait for the user or the
/// disk. The file is moved in, so the payload is released as soon as the save
/// has run. The returned [`PendingSave`] reports how it ended.
pub trait MediaSink: Send + Sync {
    fn trigger_save(&self, file: SavedFile) -> PendingSave;
}

/// Outcome of a save that is still running.
#[derive(Debug)]
pub struct PendingSave {
    rx: oneshot::Receiver<SaveOutcome>,
}

impl PendingSave {
    /// Runs `save` in the background and hands back its outcome.
    pub fn spawn<F>(save: F) -> Self
    where
        F: std::future::Future<Output = SaveOutcome> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            // Nobody listening is fine: the save still happened.
            let _ = tx.send(save.await);
        });
        Self { rx }
    }

    pub fn completed(outcome: SaveOutcome) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(outcome);
        Self { rx }
    }

    pub async fn outcome(self) -> SaveOutcome {
        self.rx
            .await
            .unwrap_or_else(|_| Err(AppError::Save("save task stopped unexpectedly".into())))
    }
}

/// Asks the user where to put the file with the native save dialog.
#[derive(Debug, Clone, Default)]
pub struct DialogSink;

impl MediaSink for DialogSink {
    fn trigger_save(&self, file: SavedFile) -> PendingSave {
        PendingSave::spawn(async move {
            let suggested_filename = sanitize_filename(&file.filename);
            let Some(handle) = rfd::AsyncFileDialog::new()
                .set_file_name(&suggested_filename)
                .save_file()
                .await
            else {
                info!("Save of {} cancelled", suggested_filename);
                return Ok(None);
            };

            let path = handle.path().to_path_buf();
            match tokio::fs::write(&path, &file.payload).await {
                Ok(()) => {
                    info!("Saved {} ({} bytes)", path.display(), file.payload.len());
                    Ok(Some(path))
                }
                Err(e) => {
                    warn!("Failed to write {}: {}", path.display(), e);
                    discard(&path).await;
                    Err(AppError::Save(format!("{}: {}", path.display(), e)))
                }
            }
        })
    }
}

/// Writes files into a fixed directory without prompting.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl MediaSink for DirectorySink {
    fn trigger_save(&self, file: SavedFile) -> PendingSave {
        let dir = self.dir.clone();
        PendingSave::spawn(async move {
            match save_into(&dir, &file).await {
                Ok(path) => {
                    info!("Saved {} ({} bytes)", path.display(), file.payload.len());
                    Ok(Some(path))
                }
                Err(e) => {
                    warn!("Failed to save {} into {}: {}", file.filename, dir.display(), e);
                    Err(AppError::Save(format!("{}: {}", dir.display(), e)))
                }
            }
        })
    }
}

/// Writes `file` into `dir` under a sanitized name, appending ` (n)` to the
/// stem instead of overwriting an existing file.
pub async fn save_into(dir: &Path, file: &SavedFile) -> io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    let filename = sanitize_filename(&file.filename);
    let (stem, extension) = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), Some(ext.to_string())),
        _ => (filename.clone(), None),
    };

    let mut attempt = 0u32;
    loop {
        let candidate = match (attempt, &extension) {
            (0, _) => filename.clone(),
            (n, Some(ext)) => format!("{} ({}).{}", stem, n, ext),
            (n, None) => format!("{} ({})", stem, n),
        };
        let path = dir.join(candidate);

        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(mut out) => {
                let written = write_payload(&mut out, &file.payload).await;
                drop(out);
                return discard_on_error(&path, written).await.map(|()| path);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}

async fn write_payload(out: &mut tokio::fs::File, payload: &[u8]) -> io::Result<()> {
    out.write_all(payload).await?;
    out.sync_all().await
}

/// Removes a partially written file when the write failed.
async fn discard_on_error(path: &Path, written: io::Result<()>) -> io::Result<()> {
    if written.is_err() {
        discard(path).await;
    }
    written
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Failed to remove partial file {}: {}", path.display(), e);
        }
    }
}
