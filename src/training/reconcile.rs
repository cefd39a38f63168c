//! Provider job reconciliation.
//!
//! Fine-tune jobs complete asynchronously on the provider side; the
//! final model identifier is usually absent when the job is accepted.
//! The reconciler polls submitted jobs and, once one reports succeeded
//! with a fine-tuned model id, upserts the registry with the final
//! identifier. Failed jobs are logged and left alone: their feedback
//! stays consumed and the registry keeps whatever it had.

use std::sync::Arc;

use crate::error::CycleError;
use crate::provider::JobStatus;
use crate::storage::{ModelRegistryEntry, SqliteStorage};
use crate::traits::ProviderClient;

/// Polls provider jobs for completed cycles and finalizes the registry.
#[derive(Clone)]
pub struct Reconciler {
    storage: SqliteStorage,
    provider: Arc<dyn ProviderClient>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Create a reconciler over the given storage and provider.
    #[must_use]
    pub fn new(storage: SqliteStorage, provider: Arc<dyn ProviderClient>) -> Self {
        Self { storage, provider }
    }

    /// Poll every unreconciled cycle once.
    ///
    /// Returns the number of cycles whose job reached a terminal status
    /// this poll. Per-cycle provider failures are logged and skipped so
    /// one unreachable job never starves the rest.
    ///
    /// # Errors
    ///
    /// Returns [`CycleError`] if the journal scan fails.
    pub async fn poll_once(&self) -> Result<u32, CycleError> {
        let candidates = self.storage.unreconciled_cycles().await?;
        let mut settled = 0;

        for cycle in candidates {
            let Some(job_id) = cycle.job_id.as_deref() else {
                continue;
            };

            let job = match self.provider.get_fine_tune_job(job_id).await {
                Ok(job) => job,
                Err(e) => {
                    tracing::warn!(
                        cycle_id = %cycle.id,
                        job_id,
                        error = %e,
                        "Failed to poll fine-tune job"
                    );
                    continue;
                }
            };

            self.storage
                .update_cycle_job(&cycle.id, job.status.as_str(), job.fine_tuned_model.as_deref())
                .await?;

            match job.status {
                JobStatus::Succeeded => {
                    if let Some(final_model) = job.fine_tuned_model {
                        let entry = ModelRegistryEntry::new(final_model.clone(), cycle.training_size);
                        self.storage.upsert_registry(&entry).await?;
                        tracing::info!(
                            cycle_id = %cycle.id,
                            job_id,
                            model_id = %final_model,
                            "Fine-tune succeeded, registry finalized"
                        );
                    } else {
                        tracing::warn!(
                            cycle_id = %cycle.id,
                            job_id,
                            "Job succeeded without a fine-tuned model id"
                        );
                    }
                    settled += 1;
                }
                JobStatus::Failed => {
                    tracing::warn!(
                        cycle_id = %cycle.id,
                        job_id,
                        "Fine-tune job failed, keeping current registry"
                    );
                    settled += 1;
                }
                JobStatus::Queued | JobStatus::Running | JobStatus::Unknown => {
                    tracing::debug!(
                        cycle_id = %cycle.id,
                        job_id,
                        status = job.status.as_str(),
                        "Fine-tune job still pending"
                    );
                }
            }
        }

        Ok(settled)
    }
}
