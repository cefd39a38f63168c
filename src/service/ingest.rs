//! Feedback ingestion.
//!
//! Submissions are validated at the boundary: malformed shapes are
//! rejected with a typed error and never persisted. Accepted feedback
//! is appended with `processed = false` and a server-side timestamp,
//! then trigger evaluation is scheduled on a detached task so the
//! append path never waits on, or fails because of, a retraining cycle.

use std::sync::Arc;

use serde::Deserialize;

use crate::error::IngestError;
use crate::storage::{FeedbackRecord, SqliteStorage};
use crate::training::RetrainPipeline;

/// Maximum accepted section name length.
pub const MAX_SECTION_LEN: usize = 200;
/// Maximum accepted content length.
pub const MAX_CONTENT_LEN: usize = 50_000;
/// Maximum accepted comment length.
pub const MAX_COMMENT_LEN: usize = 2_000;

/// A user feedback submission, before validation.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FeedbackSubmission {
    /// Report section the rating applies to.
    pub section: String,
    /// The generated section text being rated.
    pub content: String,
    /// User rating, 1-7.
    pub rating: i64,
    /// Optional free-text comment.
    #[serde(default)]
    pub comment: Option<String>,
}

impl FeedbackSubmission {
    /// Validate the submission shape.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] for blank required fields, out-of-range
    /// ratings, or over-long fields.
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.section.trim().is_empty() {
            return Err(IngestError::BlankField {
                field: "section".to_string(),
            });
        }
        if self.content.trim().is_empty() {
            return Err(IngestError::BlankField {
                field: "content".to_string(),
            });
        }
        if !(1..=7).contains(&self.rating) {
            return Err(IngestError::RatingOutOfRange {
                rating: self.rating,
            });
        }
        if self.section.len() > MAX_SECTION_LEN {
            return Err(IngestError::FieldTooLong {
                field: "section".to_string(),
                max_len: MAX_SECTION_LEN,
            });
        }
        if self.content.len() > MAX_CONTENT_LEN {
            return Err(IngestError::FieldTooLong {
                field: "content".to_string(),
                max_len: MAX_CONTENT_LEN,
            });
        }
        if let Some(comment) = &self.comment {
            if comment.len() > MAX_COMMENT_LEN {
                return Err(IngestError::FieldTooLong {
                    field: "comment".to_string(),
                    max_len: MAX_COMMENT_LEN,
                });
            }
        }
        Ok(())
    }
}

/// Validated feedback ingestion service.
#[derive(Debug, Clone)]
pub struct IngestService {
    storage: SqliteStorage,
    pipeline: Arc<RetrainPipeline>,
}

impl IngestService {
    /// Create an ingestion service over the given storage and pipeline.
    #[must_use]
    pub fn new(storage: SqliteStorage, pipeline: Arc<RetrainPipeline>) -> Self {
        Self { storage, pipeline }
    }

    /// Validate and persist a feedback submission.
    ///
    /// Returns the stored record. Trigger evaluation runs on a detached
    /// task; its outcome never affects the ingestion result.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] for malformed submissions or storage
    /// failures. The user-facing rendering of these errors should stay
    /// generic; full detail is logged here.
    pub async fn ingest(
        &self,
        submission: FeedbackSubmission,
    ) -> Result<FeedbackRecord, IngestError> {
        submission.validate().inspect_err(|e| {
            tracing::warn!(error = %e, "Rejected malformed feedback submission");
        })?;

        let mut record = FeedbackRecord::new(
            SqliteStorage::generate_id(),
            submission.section.trim(),
            submission.content,
            submission.rating,
        );
        if let Some(comment) = submission.comment {
            record = record.with_comment(comment);
        }

        self.storage.insert_feedback(&record).await.inspect_err(|e| {
            tracing::error!(error = %e, "Failed to persist feedback");
        })?;

        tracing::info!(
            id = %record.id,
            section = %record.section,
            rating = record.rating,
            "Feedback stored"
        );

        self.schedule_trigger();
        Ok(record)
    }

    /// Schedule trigger evaluation without blocking the append path.
    fn schedule_trigger(&self) {
        let pipeline = Arc::clone(&self.pipeline);
        tokio::spawn(async move {
            if let Err(e) = pipeline.evaluate_and_run().await {
                tracing::error!(error = %e, "Scheduled retraining cycle failed");
            }
        });
    }
}
