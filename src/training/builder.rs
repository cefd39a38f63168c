//! Training set assembly.
//!
//! Converts the qualifying feedback captured at trigger time into
//! provider-format labeled examples: one JSONL chat line per record,
//! pairing the fixed section instruction with the rated content as the
//! assistant turn. Malformed records (blank section or content) are
//! logged and excluded; the rest of the batch proceeds.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ArchiveError;
use crate::provider::ChatMessage;
use crate::storage::FeedbackRecord;

/// System instruction attached to every training example.
pub const SYSTEM_INSTRUCTION: &str = "You are an expert forensic engineer generating professional \
     report sections. Use formal technical language and provide detailed analysis.";

/// User prompt for a section, matching the generation-side template.
#[must_use]
pub fn section_prompt(section: &str) -> String {
    format!("Generate the \"{section}\" section for a forensic engineering report.")
}

/// One labeled example in provider chat fine-tune format.
///
/// Ephemeral: examples exist only inside a [`TrainingBatch`] and are
/// never persisted individually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrainingExample {
    /// The system/user/assistant message triple.
    pub messages: Vec<ChatMessage>,
}

impl TrainingExample {
    /// Build an example from a well-formed feedback record.
    fn from_record(record: &FeedbackRecord) -> Self {
        Self {
            messages: vec![
                ChatMessage::system(SYSTEM_INSTRUCTION),
                ChatMessage::user(section_prompt(&record.section)),
                ChatMessage::assistant(record.content.clone()),
            ],
        }
    }
}

/// An immutable, timestamp-keyed training set.
///
/// Carries the ids of the records that contributed, captured at build
/// time; the Consumption Marker flips exactly these ids and never
/// re-queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingBatch {
    /// When the owning cycle started; keys the archival blob.
    pub started_at: DateTime<Utc>,
    /// The labeled examples, in feedback creation order.
    pub examples: Vec<TrainingExample>,
    /// Ids of the records the examples were derived from.
    pub feedback_ids: Vec<String>,
}

impl TrainingBatch {
    /// Build a batch from the qualifying records captured at trigger time.
    ///
    /// Deterministic given fixed input. Records missing a section or
    /// content are logged and skipped; a single bad record never aborts
    /// the cycle.
    #[must_use]
    pub fn build(records: &[FeedbackRecord], started_at: DateTime<Utc>) -> Self {
        let mut examples = Vec::with_capacity(records.len());
        let mut feedback_ids = Vec::with_capacity(records.len());

        for record in records {
            if !record.is_well_formed() {
                tracing::warn!(
                    id = %record.id,
                    section = %record.section,
                    "Excluding malformed feedback record from training batch"
                );
                continue;
            }
            examples.push(TrainingExample::from_record(record));
            feedback_ids.push(record.id.clone());
        }

        Self {
            started_at,
            examples,
            feedback_ids,
        }
    }

    /// Number of examples in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    /// Whether the batch contains no examples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Serialize the batch to a line-delimited JSONL blob.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Serialize`] if an example fails to
    /// serialize.
    pub fn to_jsonl(&self) -> Result<Vec<u8>, ArchiveError> {
        let mut out = Vec::new();
        for example in &self.examples {
            let line = serde_json::to_vec(example).map_err(|e| ArchiveError::Serialize {
                message: format!("Failed to serialize training example: {e}"),
            })?;
            out.extend_from_slice(&line);
            out.push(b'\n');
        }
        Ok(out)
    }
}
