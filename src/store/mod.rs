//! Durable per-user wallet storage.
//!
//! This module provides:
//! - One pretty-printed JSON record per user under the wallets directory
//! - Atomic replacement on save (temp file in the same directory, then rename)
//! - Dust pruning before every write
//! - A per-user lock registry for load-mutate-save critical sections

pub mod locks;

pub use locks::UserLocks;

use crate::domain::{UserId, Wallet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("wallet storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed wallet record at {path}: {source}")]
    Serde {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("wallet storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// File-backed wallet store.
#[derive(Debug, Clone)]
pub struct WalletStore {
    dir: PathBuf,
}

impl WalletStore {
    /// Create a store rooted at `dir`, creating the directory if absent.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `user`.
    pub fn wallet_path(&self, user: UserId) -> PathBuf {
        self.dir.join(format!("wallet_{}.json", user))
    }

    /// Load the wallet for `user`, creating and persisting an empty one on
    /// first access.
    pub fn load(&self, user: UserId) -> Result<Wallet, StoreError> {
        let path = self.wallet_path(user);
        match fs::read(&path) {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|source| StoreError::Serde { path, source })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Creating wallet for user={}", user);
                let wallet = Wallet::new();
                self.write_atomic(&path, &wallet)?;
                Ok(wallet)
            }
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    /// Persist `wallet` for `user`, replacing the previous record.
    ///
    /// Positions below the storage dust threshold are pruned from `wallet`
    /// before writing, so the caller's snapshot matches what was stored.
    pub fn save(&self, user: UserId, wallet: &mut Wallet) -> Result<(), StoreError> {
        let pruned = wallet.prune_dust();
        if pruned > 0 {
            debug!("Pruned {} dust position(s) for user={}", pruned, user);
        }
        let path = self.wallet_path(user);
        self.write_atomic(&path, wallet)?;
        debug!("Saved wallet for user={}", user);
        Ok(())
    }

    fn write_atomic(&self, path: &Path, wallet: &Wallet) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;

        let json = serde_json::to_vec_pretty(wallet).map_err(|source| StoreError::Serde {
            path: path.to_path_buf(),
            source,
        })?;

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        tmp.write_all(&json)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.persist(path)
            .map_err(|e| StoreError::io(path, e.error))?;
        Ok(())
    }
}
