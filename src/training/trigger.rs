//! Retraining threshold trigger.

use crate::error::StorageError;
use crate::storage::SqliteStorage;

/// Decides whether accumulated qualifying feedback warrants a cycle.
///
/// A record qualifies when it is unprocessed and rated at or above
/// `min_rating`; the trigger fires once `batch_size` such records have
/// accumulated. Double-counting across overlapping invocations is
/// prevented by the cycle lease, not by this component.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdTrigger {
    min_rating: i64,
    batch_size: i64,
}

impl ThresholdTrigger {
    /// Create a trigger with the given rating and batch thresholds.
    #[must_use]
    pub const fn new(min_rating: i64, batch_size: i64) -> Self {
        Self {
            min_rating,
            batch_size,
        }
    }

    /// Minimum rating for a record to qualify.
    #[must_use]
    pub const fn min_rating(&self) -> i64 {
        self.min_rating
    }

    /// Qualifying count that fires a cycle.
    #[must_use]
    pub const fn batch_size(&self) -> i64 {
        self.batch_size
    }

    /// Count qualifying feedback and decide whether to fire.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the count query fails.
    pub async fn evaluate(&self, storage: &SqliteStorage) -> Result<TriggerDecision, StorageError> {
        let qualifying = storage.count_qualifying(self.min_rating).await?;
        let fire = qualifying >= self.batch_size;

        tracing::debug!(
            qualifying,
            batch_size = self.batch_size,
            fire,
            "Evaluated retraining threshold"
        );

        Ok(TriggerDecision { qualifying, fire })
    }
}

/// Outcome of one threshold evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerDecision {
    /// Number of qualifying records at evaluation time.
    pub qualifying: i64,
    /// Whether a cycle should run.
    pub fire: bool,
}
