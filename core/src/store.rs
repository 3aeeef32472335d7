//! Expiring on-disk store for generated audio.
//!
//! Files live flat under one output directory, named `<uuid>.mp3`; presence
//! in the directory is the only record of existence. The single lifecycle
//! policy is a one-shot deferred delete armed after a successful delivery.
//! There is no other eviction: no LRU, no size cap, no sweep of orphans.

use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{ParrotError, Result};

#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Flat directory holding generated audio
    pub root: PathBuf,
    /// Delay between a delivery and the file's deletion
    pub cleanup_delay: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: std::env::var("OUTPUT_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("output")),
            cleanup_delay: Duration::from_secs(
                std::env::var("CLEANUP_DELAY_SECS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(5),
            ),
        }
    }
}

/// A generated audio artifact, owned by the store until deleted
#[derive(Clone, Debug)]
pub struct GeneratedAudio {
    pub id: String,
    pub path: PathBuf,
    pub media_type: &'static str,
    pub created_at: DateTime<Utc>,
}

pub struct AudioStore {
    cfg: StoreConfig,
    shutdown_tx: watch::Sender<bool>,
}

impl AudioStore {
    /// Open the store, creating the output directory if needed.
    pub fn open(cfg: StoreConfig) -> Result<Self> {
        fs::create_dir_all(&cfg.root)
            .map_err(|e| ParrotError::Storage(format!("Failed to create output directory: {e}")))?;
        let (shutdown_tx, _) = watch::channel(false);
        info!(target: "store", root = ?cfg.root, "Audio store initialized");
        Ok(Self { cfg, shutdown_tx })
    }

    /// Persist audio bytes under a fresh random identifier.
    pub fn put(&self, bytes: &[u8]) -> Result<GeneratedAudio> {
        let id = Uuid::new_v4().to_string();
        let path = self.cfg.root.join(format!("{id}.mp3"));
        fs::write(&path, bytes)
            .map_err(|e| ParrotError::Storage(format!("Failed to write audio file: {e}")))?;
        debug!(target: "store", id = %id, bytes = bytes.len(), "Wrote audio file");
        Ok(GeneratedAudio {
            id,
            path,
            media_type: "audio/mpeg",
            created_at: Utc::now(),
        })
    }

    /// Resolve an identifier to its on-disk path. Existence check only; the
    /// content is not re-validated.
    ///
    /// Identifiers must parse as uuids before touching the filesystem, so a
    /// request-supplied id can never name a path outside the store root.
    pub fn get(&self, id: &str) -> Result<PathBuf> {
        let parsed = Uuid::parse_str(id).map_err(|_| ParrotError::NotFound(id.to_string()))?;
        let path = self.cfg.root.join(format!("{parsed}.mp3"));
        if !path.exists() {
            return Err(ParrotError::NotFound(id.to_string()));
        }
        Ok(path)
    }

    /// Delete a file immediately. Best-effort; failures are logged only.
    pub fn remove(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path) {
            warn!(target: "store", path = ?path, error = %e, "Failed to remove audio file");
        }
    }

    /// Arm a one-shot deferred delete for `path`.
    ///
    /// Fire and forget: the caller never awaits the outcome and deletion
    /// failures are swallowed. Pending tasks cancel cleanly when `shutdown`
    /// is called instead of lingering as detached timers.
    pub fn schedule_delete(&self, path: PathBuf) {
        let delay = self.cfg.cleanup_delay;
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    match fs::remove_file(&path) {
                        Ok(()) => debug!(target: "store", path = ?path, "Expired audio file removed"),
                        Err(e) => debug!(target: "store", path = ?path, error = %e, "Cleanup skipped"),
                    }
                }
                _ = shutdown_rx.changed() => {
                    debug!(target: "store", path = ?path, "Cleanup cancelled on shutdown");
                }
            }
        });
    }

    /// Cancel all pending deferred deletes.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
