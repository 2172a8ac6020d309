//! Durable storage for the winning picture of each sol. The pipeline only
//! checks for existence and upserts; lookups come from the API.
use crate::config::ResultStoreType;
use crate::types::{Picture, Sol};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("picture not found")]
    NotFound,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn exists(&self, sol: Sol) -> Result<bool, StoreError>;
    /// Inserts the picture, overwriting any existing row for the same sol.
    async fn upsert(&self, picture: &Picture) -> Result<(), StoreError>;
    async fn find_by_sol(&self, sol: Sol) -> Result<Picture, StoreError>;
}

pub async fn get_store(store_type: ResultStoreType) -> Result<Arc<dyn ResultStore>, StoreError> {
    match store_type {
        ResultStoreType::Memory => {
            tracing::warn!("Using the in-memory result store, results are lost on restart");
            Ok(Arc::new(MemoryResultStore::new()))
        }
        ResultStoreType::Filesystem { base_dir } => {
            Ok(Arc::new(FilesystemResultStore::open(base_dir).await?))
        }
    }
}

#[derive(Default)]
pub struct MemoryResultStore {
    pictures: RwLock<HashMap<Sol, Picture>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn exists(&self, sol: Sol) -> Result<bool, StoreError> {
        Ok(self.pictures.read().contains_key(&sol))
    }

    async fn upsert(&self, picture: &Picture) -> Result<(), StoreError> {
        self.pictures.write().insert(picture.sol, picture.clone());
        Ok(())
    }

    async fn find_by_sol(&self, sol: Sol) -> Result<Picture, StoreError> {
        self.pictures
            .read()
            .get(&sol)
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}

/// Stores one JSON document per sol under `base_dir`.
pub struct FilesystemResultStore {
    base_dir: PathBuf,
    // Distinguishes temp files of concurrent writers for the same sol
    write_seq: AtomicU64,
}

impl FilesystemResultStore {
    pub async fn open(base_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&base_dir).await?;
        Ok(FilesystemResultStore {
            base_dir,
            write_seq: AtomicU64::new(0),
        })
    }

    fn path_for(&self, sol: Sol) -> PathBuf {
        self.base_dir.join(format!("{sol}.json"))
    }
}

#[async_trait]
impl ResultStore for FilesystemResultStore {
    async fn exists(&self, sol: Sol) -> Result<bool, StoreError> {
        Ok(tokio::fs::try_exists(self.path_for(sol)).await?)
    }

    async fn upsert(&self, picture: &Picture) -> Result<(), StoreError> {
        let target = self.path_for(picture.sol);
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .base_dir
            .join(format!(".{}.{}.{seq}.tmp", picture.sol, std::process::id()));

        let body = serde_json::to_vec(picture)?;
        tokio::fs::write(&tmp, &body).await?;
        // rename replaces the target atomically, readers see the old or the new row
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::debug!(sol = %picture.sol, path = ?target, bytes = body.len(), "Stored picture");
        Ok(())
    }

    async fn find_by_sol(&self, sol: Sol) -> Result<Picture, StoreError> {
        let body = match tokio::fs::read(self.path_for(sol)).await {
            Ok(body) => body,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(StoreError::NotFound),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&body)?)
    }
}
