//! Storage data types.
//!
//! Defines the persistent records owned by the storage layer:
//! - [`FeedbackRecord`]: one rated report section
//! - [`ModelRegistryEntry`]: the single current-model pointer
//! - [`CycleRecord`]: the write-ahead journal row for one retraining cycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registry key under which the current-model pointer is stored.
pub const REGISTRY_KEY: &str = "latest_model";

/// A rated report section.
///
/// `processed` transitions false to true exactly once, when a retraining
/// cycle that captured this record completes its marking step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Unique record identifier (UUID v4).
    pub id: String,
    /// Report section tag (e.g. "Background", "Conclusions").
    pub section: String,
    /// The generated section text the rating applies to.
    pub content: String,
    /// User rating, 1-7.
    pub rating: i64,
    /// Optional free-text comment.
    pub comment: Option<String>,
    /// Whether a retraining cycle has consumed this record.
    pub processed: bool,
    /// Server-side creation time.
    pub created_at: DateTime<Utc>,
}

impl FeedbackRecord {
    /// Create a new unprocessed feedback record timestamped now.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        section: impl Into<String>,
        content: impl Into<String>,
        rating: i64,
    ) -> Self {
        Self {
            id: id.into(),
            section: section.into(),
            content: content.into(),
            rating,
            comment: None,
            processed: false,
            created_at: Utc::now(),
        }
    }

    /// Attach a comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Override the creation timestamp.
    #[must_use]
    pub const fn with_timestamp(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Whether the record carries the fields a training example needs.
    ///
    /// Records with a blank section or content cannot be turned into a
    /// training example and are excluded from batches.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.section.trim().is_empty() && !self.content.trim().is_empty()
    }
}

/// The single current-model pointer, keyed [`REGISTRY_KEY`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRegistryEntry {
    /// Current model identifier.
    pub model_id: String,
    /// When the model was last fine-tuned.
    pub last_fine_tuned: DateTime<Utc>,
    /// Number of training examples in the last fine-tune.
    pub training_size: i64,
}

impl ModelRegistryEntry {
    /// Create a registry entry fine-tuned now.
    #[must_use]
    pub fn new(model_id: impl Into<String>, training_size: i64) -> Self {
        Self {
            model_id: model_id.into(),
            last_fine_tuned: Utc::now(),
            training_size,
        }
    }

    /// Override the fine-tune timestamp.
    #[must_use]
    pub const fn with_timestamp(mut self, last_fine_tuned: DateTime<Utc>) -> Self {
        self.last_fine_tuned = last_fine_tuned;
        self
    }
}

/// Status of a retraining cycle in the write-ahead journal.
///
/// Advances `Pending` → `Archived` → `Submitted` → `Registered` →
/// `Marked`. `Aborted` is terminal for cycles that failed before their
/// feedback was marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    /// Journaled, no external call made yet.
    Pending,
    /// Training set durably archived.
    Archived,
    /// Fine-tune job accepted by the provider.
    Submitted,
    /// Model registry upserted.
    Registered,
    /// Contributing feedback marked processed (terminal).
    Marked,
    /// Cycle failed before marking (terminal).
    Aborted,
}

impl CycleStatus {
    /// Stable string form for storage and logging.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Archived => "archived",
            Self::Submitted => "submitted",
            Self::Registered => "registered",
            Self::Marked => "marked",
            Self::Aborted => "aborted",
        }
    }

    /// Parse the stable string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "archived" => Some(Self::Archived),
            "submitted" => Some(Self::Submitted),
            "registered" => Some(Self::Registered),
            "marked" => Some(Self::Marked),
            "aborted" => Some(Self::Aborted),
            _ => None,
        }
    }

    /// Whether the cycle has reached a terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Marked | Self::Aborted)
    }
}

/// Write-ahead journal row for one retraining cycle.
///
/// Persisted before any external call so an interrupted cycle can resume
/// from its last completed step instead of re-deriving work from the
/// `processed` flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleRecord {
    /// Unique cycle identifier (UUID v4).
    pub id: String,
    /// Current pipeline status.
    pub status: CycleStatus,
    /// Ids of the feedback records captured at batch-build time.
    pub feedback_ids: Vec<String>,
    /// Number of training examples in the batch.
    pub training_size: i64,
    /// Archive blob key, once archived.
    pub archive_key: Option<String>,
    /// Provider job id, once submitted.
    pub job_id: Option<String>,
    /// Last observed provider job status.
    pub job_status: Option<String>,
    /// Model id registered for this cycle (provisional until the job
    /// succeeds and reconciliation records the final identifier).
    pub model_id: Option<String>,
    /// When the cycle was journaled.
    pub created_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

impl CycleRecord {
    /// Journal a new pending cycle over the given feedback ids.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        feedback_ids: Vec<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let training_size = i64::try_from(feedback_ids.len()).unwrap_or(i64::MAX);
        Self {
            id: id.into(),
            status: CycleStatus::Pending,
            feedback_ids,
            training_size,
            archive_key: None,
            job_id: None,
            job_status: None,
            model_id: None,
            created_at: started_at,
            updated_at: started_at,
        }
    }
}
