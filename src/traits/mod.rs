//! Trait definitions for mockable dependencies.
//!
//! This module defines traits for:
//! - [`ProviderClient`]: fine-tuning provider API abstraction
//! - [`BlobStore`]: durable archival storage abstraction
//!
//! # Mocking
//!
//! Both traits are annotated with `#[cfg_attr(test, mockall::automock)]`
//! which generates mock implementations automatically for unit testing.
//! Integration tests use the real implementations against a wiremock
//! server and a temporary directory.

use async_trait::async_trait;

use crate::error::{ArchiveError, ProviderError};
use crate::provider::{FileHandle, FineTuneJob};

/// Fine-tuning provider client trait.
///
/// Abstracts the provider API so the pipeline and services can be
/// constructed with fakes in tests and are never coupled to a hidden
/// shared client.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Upload serialized training data, receiving a file handle.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the upload fails after retries.
    async fn upload_training_file(
        &self,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<FileHandle, ProviderError>;

    /// Request a fine-tune job for an uploaded file.
    ///
    /// Job acceptance, not completion, is the unit of success; the
    /// returned descriptor may not yet carry a final model identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the request fails after retries.
    async fn create_fine_tune_job(
        &self,
        base_model: &str,
        training_file_id: &str,
    ) -> Result<FineTuneJob, ProviderError>;

    /// Fetch the current state of a fine-tune job.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the request fails after retries.
    async fn get_fine_tune_job(&self, job_id: &str) -> Result<FineTuneJob, ProviderError>;

    /// Generate text from a chat-style prompt pair.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the request fails after retries.
    async fn chat_completion(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ProviderError>;
}

/// Durable blob store trait for training-set archival.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write a blob under the given key.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if the write fails.
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), ArchiveError>;

    /// Check whether a blob already exists under the given key.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if the check fails.
    async fn exists(&self, key: &str) -> Result<bool, ArchiveError>;

    /// Read back a blob written under the given key.
    ///
    /// Used when resuming an interrupted cycle from its archived
    /// training set, so the resubmitted bytes are exactly the archived
    /// ones.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if the blob is missing or unreadable.
    async fn get(&self, key: &str) -> Result<Vec<u8>, ArchiveError>;
}
