//! Training-set archival.
//!
//! This module provides:
//! - [`FsBlobStore`]: filesystem implementation of the [`BlobStore`] trait
//! - [`Archiver`]: durable archival with key de-duplication and bounded
//!   retries
//!
//! Archival is the cycle's audit trail: the serialized training set must
//! be durably written before any provider call, independent of the
//! fine-tune outcome. If the write retries exhaust, the cycle aborts
//! without contacting the provider.

#![allow(clippy::missing_errors_doc)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ArchiveError;
use crate::traits::BlobStore;

/// Content type attached to archived training sets.
pub const JSONL_CONTENT_TYPE: &str = "application/jsonl";

/// Uniquifier probes before giving up on a key.
const MAX_KEY_PROBES: u32 = 100;

/// Archive key for a cycle started at the given time.
///
/// Second-resolution ISO-8601 basic format; collisions are resolved by
/// [`Archiver::archive`] with a numeric uniquifier.
#[must_use]
pub fn archive_key(started_at: DateTime<Utc>) -> String {
    format!("{}.jsonl", started_at.format("%Y%m%dT%H%M%SZ"))
}

/// Filesystem blob store rooted at a directory.
///
/// Keys map to file paths under the root. Writes go through a temp file
/// and rename so a crashed write never leaves a truncated blob behind.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Create a store rooted at the given directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<(), ArchiveError> {
        let path = self.path_for(key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ArchiveError::WriteFailed {
                    key: key.to_string(),
                    message: format!("Failed to create archive directory: {e}"),
                })?;
        }

        let tmp_path = path.with_extension("tmp");
        tokio::fs::write(&tmp_path, bytes)
            .await
            .map_err(|e| ArchiveError::WriteFailed {
                key: key.to_string(),
                message: format!("Failed to write blob: {e}"),
            })?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| ArchiveError::WriteFailed {
                key: key.to_string(),
                message: format!("Failed to finalize blob: {e}"),
            })?;

        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, ArchiveError> {
        Ok(tokio::fs::try_exists(self.path_for(key))
            .await
            .unwrap_or(false))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ArchiveError> {
        tokio::fs::read(self.path_for(key))
            .await
            .map_err(|e| ArchiveError::WriteFailed {
                key: key.to_string(),
                message: format!("Failed to read blob: {e}"),
            })
    }
}

/// Durable training-set archiver.
///
/// Resolves a unique key for the cycle start time, then writes the blob
/// with bounded retries and exponential backoff.
#[derive(Clone)]
pub struct Archiver {
    store: Arc<dyn BlobStore>,
    max_retries: u32,
    retry_delay_ms: u64,
}

impl std::fmt::Debug for Archiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archiver")
            .field("max_retries", &self.max_retries)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .finish_non_exhaustive()
    }
}

impl Archiver {
    /// Create an archiver over the given blob store.
    #[must_use]
    pub fn new(store: Arc<dyn BlobStore>, max_retries: u32, retry_delay_ms: u64) -> Self {
        Self {
            store,
            max_retries,
            retry_delay_ms,
        }
    }

    /// The underlying blob store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    /// Durably write the serialized training set, returning the key it
    /// was stored under.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::RetriesExhausted`] when the write keeps
    /// failing past the retry ceiling.
    pub async fn archive(
        &self,
        started_at: DateTime<Utc>,
        bytes: &[u8],
    ) -> Result<String, ArchiveError> {
        let key = self.unique_key(started_at).await?;

        let mut delay = self.retry_delay_ms;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tracing::warn!(key = %key, attempt, delay_ms = delay, "Retrying archive write");
                tokio::time::sleep(Duration::from_millis(delay)).await;
                delay = delay.saturating_mul(2);
            }

            match self.store.put(&key, bytes, JSONL_CONTENT_TYPE).await {
                Ok(()) => {
                    tracing::info!(key = %key, bytes = bytes.len(), "Training set archived");
                    return Ok(key);
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!(key = %key, error = %e, attempt, "Archive write failed");
                }
                Err(e) => return Err(e),
            }
        }

        Err(ArchiveError::RetriesExhausted {
            key,
            attempts: self.max_retries + 1,
        })
    }

    /// Resolve a key not already present in the store, appending a
    /// numeric uniquifier on collision.
    async fn unique_key(&self, started_at: DateTime<Utc>) -> Result<String, ArchiveError> {
        let base = archive_key(started_at);
        if !self.store.exists(&base).await? {
            return Ok(base);
        }

        let stem = base.trim_end_matches(".jsonl");
        for n in 1..=MAX_KEY_PROBES {
            let candidate = format!("{stem}-{n}.jsonl");
            if !self.store.exists(&candidate).await? {
                return Ok(candidate);
            }
        }

        Err(ArchiveError::WriteFailed {
            key: base,
            message: format!("No free archive key after {MAX_KEY_PROBES} probes"),
        })
    }
}
