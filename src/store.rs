//! Persistence of the ranked maxima across restarts.

use crate::error::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

pub const STATE_VERSION: u32 = 1;

/// On-disk form of a tracker's ranking.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PersistedState {
    pub version: u32,
    pub source_sensor: String,
    pub max_values: Vec<f64>,
    /// End of the last hour offered to the ranking. Backfill skips hours up to it.
    #[serde(default)]
    pub last_finalized: Option<DateTime<Utc>>,
    pub saved_at: DateTime<Utc>,
}

impl PersistedState {
    pub fn new(source_sensor: impl Into<String>, max_values: &[f64], saved_at: DateTime<Utc>) -> Self {
        Self {
            version: STATE_VERSION,
            source_sensor: source_sensor.into(),
            max_values: max_values.to_vec(),
            last_finalized: None,
            saved_at,
        }
    }

    pub fn with_last_finalized(mut self, last_finalized: Option<DateTime<Utc>>) -> Self {
        self.last_finalized = last_finalized;
        self
    }
}

/// What a restart picks up from the stored state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Restored {
    pub max_values: Vec<f64>,
    pub last_finalized: Option<DateTime<Utc>>,
}

/// Storage for [`PersistedState`].
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the stored state, `None` when nothing was saved yet.
    async fn load(&self) -> Result<Option<PersistedState>, StorageError>;

    /// Replaces the stored state.
    async fn save(&self, state: &PersistedState) -> Result<(), StorageError>;
}

/// JSON file store with atomic replace-on-write.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Result<Option<PersistedState>, StorageError> {
        let body = match tokio::fs::read_to_string(&self.path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };

        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| StorageError::corrupt(&self.path, e))
    }

    async fn save(&self, state: &PersistedState) -> Result<(), StorageError> {
        let body =
            serde_json::to_vec_pretty(state).map_err(|e| StorageError::corrupt(&self.path, e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(parent, e))?;
        }

        let tmp = self.tmp_path();
        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|e| StorageError::io(&tmp, e))?;
        file.write_all(&body)
            .await
            .map_err(|e| StorageError::io(&tmp, e))?;
        file.sync_all().await.map_err(|e| StorageError::io(&tmp, e))?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StorageError::io(&self.path, e))
    }
}

/// Loads the state saved for `source_sensor`.
///
/// Never fails: a missing, unreadable, corrupt or foreign state yields an
/// empty ranking.
pub async fn load_restored(store: &dyn StateStore, source_sensor: &str) -> Restored {
    match store.load().await {
        Ok(Some(state)) if state.version != STATE_VERSION => {
            tracing::warn!(
                source = %source_sensor,
                version = state.version,
                "Unsupported state version, starting with empty max values"
            );
            Restored::default()
        }
        Ok(Some(state)) if state.source_sensor != source_sensor => {
            tracing::warn!(
                source = %source_sensor,
                stored_source = %state.source_sensor,
                "Stored max values belong to another sensor, ignoring them"
            );
            Restored::default()
        }
        Ok(Some(state)) => {
            tracing::info!(
                source = %source_sensor,
                saved_at = %state.saved_at,
                last_finalized = ?state.last_finalized,
                "Restored max values: {:?}",
                state.max_values
            );
            Restored {
                max_values: state.max_values,
                last_finalized: state.last_finalized,
            }
        }
        Ok(None) => {
            tracing::info!(source = %source_sensor, "No stored max values, starting empty");
            Restored::default()
        }
        Err(e) => {
            tracing::warn!(
                source = %source_sensor,
                error = %e,
                "Failed to load stored max values, starting empty"
            );
            Restored::default()
        }
    }
}
