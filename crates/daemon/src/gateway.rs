//! File-backed snapshot gateway (PRD-08).
//!
//! The smallest useful [`PersistenceGateway`]: one JSON document on disk,
//! written atomically via a temp-file rename. Coalescing of rapid saves is
//! already handled by the engine's save scheduler, so this adapter stays
//! dumb on purpose.

use std::path::PathBuf;

use async_trait::async_trait;

use chorewheel_core::error::CoreError;
use chorewheel_engine::{ChoreSnapshot, PersistenceGateway};

/// JSON-file snapshot storage.
pub struct FileGateway {
    path: PathBuf,
}

impl FileGateway {
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
impl PersistenceGateway for FileGateway {
    async fn load_snapshot(&self) -> Result<Option<ChoreSnapshot>, CoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(CoreError::Persistence(format!(
                    "read {}: {err}",
                    self.path.display()
                )))
            }
        };
        let snapshot = serde_json::from_slice(&bytes).map_err(|err| {
            CoreError::Persistence(format!("parse {}: {err}", self.path.display()))
        })?;
        Ok(Some(snapshot))
    }

    async fn save_snapshot(&self, snapshot: &ChoreSnapshot) -> Result<(), CoreError> {
        let bytes = serde_json::to_vec_pretty(snapshot)
            .map_err(|err| CoreError::Persistence(format!("encode snapshot: {err}")))?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, &bytes).await.map_err(|err| {
            CoreError::Persistence(format!("write {}: {err}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|err| {
            CoreError::Persistence(format!("rename {}: {err}", self.path.display()))
        })?;
        Ok(())
    }
}
