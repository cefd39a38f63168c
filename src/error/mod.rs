//! Error types for the report tuner.
//!
//! This module defines a hierarchical error system:
//! - [`AppError`]: Top-level application errors
//! - [`ProviderError`]: Fine-tuning provider API errors
//! - [`StorageError`]: Database operation errors
//! - [`ArchiveError`]: Training-set archival errors
//! - [`CycleError`]: Retraining-cycle pipeline errors
//! - [`IngestError`]: Feedback ingestion validation errors
//! - [`ConfigError`]: Configuration errors
//!
//! All errors implement `Send + Sync` for async compatibility.

use thiserror::Error;

/// Top-level application error.
///
/// This is the main error type returned by public API functions.
/// It wraps all subsystem errors for unified error handling.
#[derive(Debug, Error)]
pub enum AppError {
    /// Provider API error.
    #[error("Provider API error: {0}")]
    Provider(#[from] ProviderError),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Archival error.
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Retraining cycle error.
    #[error("Cycle error: {0}")]
    Cycle(#[from] CycleError),

    /// Feedback ingestion error.
    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Fine-tuning provider API errors.
///
/// These errors represent failures when communicating with the external
/// provider (file uploads, fine-tune jobs, completions).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Authentication failed due to invalid API key.
    #[error("Authentication failed: invalid API key")]
    AuthenticationFailed,

    /// Request was rate limited.
    #[error("Rate limited: retry after {retry_after_seconds}s")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_seconds: u64,
    },

    /// The provider rejected the request (invalid payload, quota, policy).
    ///
    /// Not retryable: the same request would be rejected again.
    #[error("Request rejected: {message}")]
    Rejected {
        /// Provider-supplied rejection detail.
        message: String,
    },

    /// The provider returned a server-side error status.
    #[error("Provider server error: status {status}")]
    ServerError {
        /// HTTP status code.
        status: u16,
    },

    /// Request timed out.
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// Network communication error.
    #[error("Network error: {message}")]
    Network {
        /// Description of the network error.
        message: String,
    },

    /// Unexpected response from the API.
    #[error("Unexpected response: {message}")]
    UnexpectedResponse {
        /// Description of what was unexpected.
        message: String,
    },
}

impl ProviderError {
    /// Returns true if this error is retryable.
    ///
    /// Rate limiting, timeouts, network failures, and server-side errors
    /// are retryable. Authentication failures and request rejections are
    /// not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::ServerError { .. }
                | Self::Timeout { .. }
                | Self::Network { .. }
        )
    }
}

/// Storage errors.
///
/// These errors represent failures in database operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Failed to connect to the database.
    #[error("Database connection failed: {message}")]
    ConnectionFailed {
        /// Description of the connection failure.
        message: String,
    },

    /// A database query failed.
    #[error("Query failed: {query} - {message}")]
    QueryFailed {
        /// The query that failed (may be truncated).
        query: String,
        /// Description of the failure.
        message: String,
    },

    /// Cycle record not found.
    #[error("Cycle not found: {cycle_id}")]
    CycleNotFound {
        /// The cycle ID that was not found.
        cycle_id: String,
    },

    /// Database migration failed.
    #[error("Migration failed: {version} - {message}")]
    MigrationFailed {
        /// The migration version that failed.
        version: String,
        /// Description of the failure.
        message: String,
    },

    /// Internal storage error.
    #[error("Internal storage error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

/// Training-set archival errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArchiveError {
    /// Failed to serialize the training batch.
    ///
    /// Not retryable: serialization is deterministic.
    #[error("Serialization failed: {message}")]
    Serialize {
        /// Description of the serialization failure.
        message: String,
    },

    /// A blob write failed.
    #[error("Blob write failed for {key}: {message}")]
    WriteFailed {
        /// The blob key being written.
        key: String,
        /// Description of the write failure.
        message: String,
    },

    /// Write retries were exhausted without success.
    #[error("Archive retries exhausted for {key} after {attempts} attempts")]
    RetriesExhausted {
        /// The blob key being written.
        key: String,
        /// Number of attempts made.
        attempts: u32,
    },
}

impl ArchiveError {
    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::WriteFailed { .. })
    }
}

/// Retraining-cycle pipeline errors.
///
/// Cycle failures are internal-only: they are logged and recorded in
/// metrics but never propagate to the ingestion path.
#[derive(Debug, Error)]
pub enum CycleError {
    /// Another cycle holds the lease; this invocation skipped as a no-op.
    #[error("Another retraining cycle is already running")]
    ConcurrencyConflict,

    /// Storage failure during the cycle.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Archival failure during the cycle.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Provider failure during the cycle.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Feedback ingestion validation errors.
///
/// Malformed submissions are rejected at the boundary and never persisted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// A required field is blank or missing.
    #[error("Missing or blank field: {field}")]
    BlankField {
        /// The offending field name.
        field: String,
    },

    /// The rating is outside the accepted 1-7 range.
    #[error("Rating out of range: {rating} (expected 1-7)")]
    RatingOutOfRange {
        /// The rejected rating value.
        rating: i64,
    },

    /// A field exceeds its maximum length.
    #[error("Field too long: {field} exceeds {max_len} characters")]
    FieldTooLong {
        /// The offending field name.
        field: String,
        /// Maximum accepted length.
        max_len: usize,
    },

    /// Storage failure while persisting the record.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Configuration errors.
///
/// These errors represent failures in configuration loading and validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required configuration is missing.
    #[error("Missing required: {var}")]
    MissingRequired {
        /// The missing variable name.
        var: String,
    },

    /// Configuration value is invalid.
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue {
        /// The variable name.
        var: String,
        /// Why the value is invalid.
        reason: String,
    },
}
