use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info};

use crate::constants::alerts::{HISTORY_FILE, REGIME_FILE};
use crate::error::StoreError;
use crate::events::AlertHistoryEntry;
use crate::types::RegimeState;

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence handle for the monitor's shared state: the last seen regime
/// and the bounded alert history (oldest first).
#[async_trait]
pub trait AlertStore: Send + Sync {
    fn name(&self) -> &'static str;

    async fn load_regime(&self) -> StoreResult<Option<RegimeState>>;
    async fn save_regime(&self, state: RegimeState) -> StoreResult<()>;

    async fn list(&self) -> StoreResult<Vec<AlertHistoryEntry>>;

    /// Append `entries`, drop the oldest until at most `max` remain and, when
    /// given, replace the stored regime. Either all of it lands or none of it
    /// does. Returns how many entries were evicted.
    async fn commit(
        &self,
        entries: &[AlertHistoryEntry],
        regime: Option<RegimeState>,
        max: usize,
    ) -> StoreResult<usize>;
}

#[derive(Default)]
struct MemoryState {
    regime: Option<RegimeState>,
    history: VecDeque<AlertHistoryEntry>,
}

/// In-process store; history never grows past `limit`, whatever `max` a commit asks for.
#[derive(Clone)]
pub struct MemoryAlertStore {
    state: Arc<Mutex<MemoryState>>,
    pub limit: usize,
}

impl MemoryAlertStore {
    pub fn new(limit: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            limit,
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Corrupt("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load_regime(&self) -> StoreResult<Option<RegimeState>> {
        Ok(self.lock()?.regime)
    }

    async fn save_regime(&self, state: RegimeState) -> StoreResult<()> {
        self.lock()?.regime = Some(state);
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<AlertHistoryEntry>> {
        Ok(self.lock()?.history.iter().cloned().collect())
    }

    async fn commit(
        &self,
        entries: &[AlertHistoryEntry],
        regime: Option<RegimeState>,
        max: usize,
    ) -> StoreResult<usize> {
        let mut state = self.lock()?;
        state.history.extend(entries.iter().cloned());
        let excess = state.history.len().saturating_sub(max.min(self.limit));
        state.history.drain(..excess);
        if let Some(regime) = regime {
            state.regime = Some(regime);
        }
        Ok(excess)
    }
}

/// JSON files under one directory: `last_regime.json` and `alert_history.json`.
/// Writes go through a temp file and a rename so a failed write leaves the
/// previous file intact.
#[derive(Clone)]
pub struct FileAlertStore {
    dir: PathBuf,
    io: Arc<AsyncMutex<()>>,
}

impl FileAlertStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            io: Arc::new(AsyncMutex::new(())),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn regime_path(&self) -> PathBuf {
        self.dir.join(REGIME_FILE)
    }

    fn history_path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }

    async fn read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(path, e)),
        }
    }

    /// Serialize `value` next to `path` and return the temp file; nothing is visible yet.
    async fn stage_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> StoreResult<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, e))?;

        let bytes = serde_json::to_vec_pretty(value)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await.map_err(|e| io_error(&tmp, e))?;
        debug!("[STORE] staged {} ({} bytes)", tmp.display(), bytes.len());
        Ok(tmp)
    }

    async fn publish(tmp: &Path, path: &Path) -> StoreResult<()> {
        if let Err(e) = tokio::fs::rename(tmp, path).await {
            tokio::fs::remove_file(tmp).await.ok();
            return Err(io_error(path, e));
        }
        Ok(())
    }

    async fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> StoreResult<()> {
        let tmp = self.stage_json(path, value).await?;
        Self::publish(&tmp, path).await
    }

    async fn read_history(&self) -> StoreResult<Vec<AlertHistoryEntry>> {
        Ok(Self::read_json(&self.history_path()).await?.unwrap_or_default())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl AlertStore for FileAlertStore {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn load_regime(&self) -> StoreResult<Option<RegimeState>> {
        let _guard = self.io.lock().await;
        Self::read_json(&self.regime_path()).await
    }

    async fn save_regime(&self, state: RegimeState) -> StoreResult<()> {
        let _guard = self.io.lock().await;
        self.write_json(&self.regime_path(), &state).await?;
        info!("💾 [STORE] Saved regime {} to {}", state.regime, self.dir.display());
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<AlertHistoryEntry>> {
        let _guard = self.io.lock().await;
        self.read_history().await
    }

    /// Both files are staged before either is renamed into place. If the
    /// regime rename fails after the history landed, the prior history is
    /// written back.
    async fn commit(
        &self,
        entries: &[AlertHistoryEntry],
        regime: Option<RegimeState>,
        max: usize,
    ) -> StoreResult<usize> {
        if entries.is_empty() && regime.is_none() {
            return Ok(0);
        }
        let _guard = self.io.lock().await;
        let history_path = self.history_path();
        let regime_path = self.regime_path();

        let prior = self.read_history().await?;
        let mut history = Vec::with_capacity(prior.len() + entries.len());
        history.extend_from_slice(&prior);
        history.extend_from_slice(entries);
        let excess = history.len().saturating_sub(max);
        history.drain(..excess);

        let history_tmp = if entries.is_empty() {
            None
        } else {
            Some(self.stage_json(&history_path, &history).await?)
        };
        let regime_tmp = match regime {
            Some(state) => match self.stage_json(&regime_path, &state).await {
                Ok(tmp) => Some(tmp),
                Err(e) => {
                    if let Some(tmp) = &history_tmp {
                        tokio::fs::remove_file(tmp).await.ok();
                    }
                    return Err(e);
                }
            },
            None => None,
        };

        if let Some(tmp) = &history_tmp {
            if let Err(e) = Self::publish(tmp, &history_path).await {
                if let Some(tmp) = &regime_tmp {
                    tokio::fs::remove_file(tmp).await.ok();
                }
                return Err(e);
            }
        }
        if let Some(tmp) = &regime_tmp {
            if let Err(e) = Self::publish(tmp, &regime_path).await {
                if history_tmp.is_some() {
                    if let Err(restore) = self.write_json(&history_path, &prior).await {
                        error!("❌ [STORE] Failed to restore alert history: {}", restore);
                    }
                }
                return Err(e);
            }
            if let Some(state) = regime {
                info!("💾 [STORE] Saved regime {} to {}", state.regime, self.dir.display());
            }
        }
        Ok(excess)
    }
}
