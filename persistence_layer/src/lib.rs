//! Durable stage-boundary staging files.
//!
//! Each pipeline stage commits its full record set as a JSON array before
//! the next stage reads it; there is no streaming between stages. The
//! files double as the audit trail, so writes go through a temp file and
//! an atomic rename - a crashed stage leaves either the previous complete
//! file or none at all, never a truncated one.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("staging input missing: {0}")]
    MissingInput(PathBuf),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed staging file {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Reads and writes the per-stage staging files under one directory
#[derive(Debug, Clone)]
pub struct StagingStore {
    base_dir: PathBuf,
}

impl StagingStore {
    pub fn new<P: Into<PathBuf>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.base_dir.join(file_name)
    }

    fn io_error(path: &Path, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Persist a complete stage output, replacing any previous run's file
    pub async fn write_records<T: Serialize>(
        &self,
        file_name: &str,
        records: &[T],
    ) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| Self::io_error(&self.base_dir, e))?;

        let path = self.path(file_name);
        let tmp_path = self.base_dir.join(format!("{}.tmp", file_name));

        let json = serde_json::to_vec_pretty(records).map_err(|e| PersistenceError::Malformed {
            path: path.clone(),
            source: e,
        })?;

        tokio::fs::write(&tmp_path, &json)
            .await
            .map_err(|e| Self::io_error(&tmp_path, e))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| Self::io_error(&path, e))?;

        info!(
            "💾 Committed {} records to staging file {}",
            records.len(),
            path.display()
        );
        Ok(path)
    }

    /// Load a stage's input. Missing or unparsable input is fatal for the
    /// stage - it must not proceed with partial or fabricated data.
    pub async fn read_records<T: DeserializeOwned>(&self, file_name: &str) -> Result<Vec<T>> {
        let path = self.path(file_name);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PersistenceError::MissingInput(path));
            }
            Err(e) => return Err(Self::io_error(&path, e)),
        };

        let records: Vec<T> =
            serde_json::from_slice(&bytes).map_err(|e| PersistenceError::Malformed {
                path: path.clone(),
                source: e,
            })?;

        debug!(
            "Loaded {} records from staging file {}",
            records.len(),
            path.display()
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        wallet_address: String,
        pnl: Option<f64>,
    }

    fn temp_store() -> StagingStore {
        let dir = std::env::temp_dir().join(format!("staging-{}", uuid::Uuid::new_v4()));
        StagingStore::new(dir)
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let store = temp_store();
        let records = vec![
            Sample {
                wallet_address: "w1".to_string(),
                pnl: Some(12.5),
            },
            Sample {
                wallet_address: "w2".to_string(),
                pnl: None,
            },
        ];

        store.write_records("traders.json", &records).await.unwrap();
        let loaded: Vec<Sample> = store.read_records("traders.json").await.unwrap();
        assert_eq!(loaded, records);
    }

    #[tokio::test]
    async fn rewriting_replaces_the_previous_run() {
        let store = temp_store();
        let first = vec![Sample {
            wallet_address: "w1".to_string(),
            pnl: Some(1.0),
        }];
        let second = vec![Sample {
            wallet_address: "w2".to_string(),
            pnl: Some(2.0),
        }];

        store.write_records("tokens.json", &first).await.unwrap();
        store.write_records("tokens.json", &second).await.unwrap();

        let loaded: Vec<Sample> = store.read_records("tokens.json").await.unwrap();
        assert_eq!(loaded, second);
    }

    #[tokio::test]
    async fn missing_input_is_a_distinct_fatal_error() {
        let store = temp_store();
        let result: Result<Vec<Sample>> = store.read_records("absent.json").await;
        assert!(matches!(result, Err(PersistenceError::MissingInput(_))));
    }

    #[tokio::test]
    async fn malformed_input_is_a_distinct_fatal_error() {
        let store = temp_store();
        tokio::fs::create_dir_all(store.path("broken.json").parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(store.path("broken.json"), b"{not json")
            .await
            .unwrap();

        let result: Result<Vec<Sample>> = store.read_records("broken.json").await;
        assert!(matches!(result, Err(PersistenceError::Malformed { .. })));
    }
}
