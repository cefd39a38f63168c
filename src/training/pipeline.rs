//! The retraining cycle pipeline.
//!
//! One cycle runs as a sequential pipeline of awaited operations:
//! capture qualifying feedback, journal a [`CycleRecord`], build the
//! training batch, archive it durably, submit the fine-tune job, upsert
//! the model registry, and mark the consumed feedback. The journal row
//! advances after every completed step so an interrupted cycle resumes
//! from where it stopped instead of resubmitting.
//!
//! Failures before job submission abort the cycle and leave every
//! `processed` flag untouched. Failures after submission leave the
//! journal row at its last completed status for startup resume.

use std::sync::Arc;

use chrono::Utc;

use crate::archive::Archiver;
use crate::error::CycleError;
use crate::metrics::{CycleEvent, CycleMetrics, CycleOutcome, Timer};
use crate::storage::{CycleRecord, CycleStatus, ModelRegistryEntry, SqliteStorage};
use crate::traits::ProviderClient;

use super::builder::TrainingBatch;
use super::lease::CycleLease;
use super::trigger::ThresholdTrigger;

/// Filename under which training data is uploaded to the provider.
const UPLOAD_FILENAME: &str = "training.jsonl";

/// Outcome of a completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Journal id of the cycle.
    pub cycle_id: String,
    /// Number of training examples submitted.
    pub batch_size: i64,
    /// Provider job id.
    pub job_id: String,
    /// Model id registered (provisional until reconciliation).
    pub model_id: String,
}

/// The retraining orchestration pipeline.
///
/// Constructed over injected collaborators so tests can substitute a
/// mock provider and blob store.
#[derive(Clone)]
pub struct RetrainPipeline {
    storage: SqliteStorage,
    provider: Arc<dyn ProviderClient>,
    archiver: Archiver,
    lease: CycleLease,
    trigger: ThresholdTrigger,
    base_model: String,
    metrics: Arc<CycleMetrics>,
}

impl std::fmt::Debug for RetrainPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrainPipeline")
            .field("trigger", &self.trigger)
            .field("base_model", &self.base_model)
            .finish_non_exhaustive()
    }
}

impl RetrainPipeline {
    /// Create a pipeline over the given collaborators.
    #[must_use]
    pub fn new(
        storage: SqliteStorage,
        provider: Arc<dyn ProviderClient>,
        archiver: Archiver,
        trigger: ThresholdTrigger,
        base_model: impl Into<String>,
        metrics: Arc<CycleMetrics>,
    ) -> Self {
        Self {
            storage,
            provider,
            archiver,
            lease: CycleLease::new(),
            trigger,
            base_model: base_model.into(),
            metrics,
        }
    }

    /// The pipeline's metrics collector.
    #[must_use]
    pub fn metrics(&self) -> &Arc<CycleMetrics> {
        &self.metrics
    }

    /// Evaluate the threshold and run a cycle when it fires.
    ///
    /// A held lease or an unmet threshold skips as a no-op and returns
    /// `Ok(None)`. Returns the report of the completed cycle otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`CycleError`] when a started cycle fails. The error is
    /// intended for logs and metrics only and must never propagate to
    /// the ingestion path.
    pub async fn evaluate_and_run(&self) -> Result<Option<CycleReport>, CycleError> {
        let timer = Timer::start();

        let Ok(_guard) = self.lease.try_acquire() else {
            tracing::debug!("Retraining cycle already running, skipping");
            self.metrics
                .record(CycleEvent::new(CycleOutcome::Skipped, timer.elapsed_ms()));
            return Ok(None);
        };

        let decision = self.trigger.evaluate(&self.storage).await?;
        if !decision.fire {
            self.metrics
                .record(CycleEvent::new(CycleOutcome::Skipped, timer.elapsed_ms()));
            return Ok(None);
        }

        tracing::info!(
            qualifying = decision.qualifying,
            batch_size = self.trigger.batch_size(),
            "Retraining threshold reached, starting cycle"
        );

        match self.run_cycle(&timer).await {
            Ok(report) => Ok(report),
            Err(e) => {
                tracing::error!(error = %e, "Retraining cycle failed");
                Err(e)
            }
        }
    }

    /// Run one cycle against the qualifying feedback captured now.
    async fn run_cycle(&self, timer: &Timer) -> Result<Option<CycleReport>, CycleError> {
        let started_at = Utc::now();

        // Capture the qualifying set once; everything downstream works
        // on exactly these records.
        let records = self
            .storage
            .qualifying_feedback(self.trigger.min_rating())
            .await?;
        let batch = TrainingBatch::build(&records, started_at);

        if batch.is_empty() {
            tracing::warn!(
                captured = records.len(),
                "No well-formed records in qualifying set, skipping cycle"
            );
            self.metrics
                .record(CycleEvent::new(CycleOutcome::Skipped, timer.elapsed_ms()));
            return Ok(None);
        }

        let cycle = CycleRecord::new(
            SqliteStorage::generate_id(),
            batch.feedback_ids.clone(),
            started_at,
        );
        self.storage.insert_cycle(&cycle).await?;

        let bytes = match batch.to_jsonl() {
            Ok(bytes) => bytes,
            Err(e) => {
                self.abort_cycle(&cycle.id, timer, batch.len()).await;
                return Err(e.into());
            }
        };

        // Archival is the audit trail: it must succeed before any
        // provider contact.
        let archive_key = match self.archiver.archive(started_at, &bytes).await {
            Ok(key) => key,
            Err(e) => {
                self.abort_cycle(&cycle.id, timer, batch.len()).await;
                return Err(e.into());
            }
        };
        self.storage
            .record_cycle_archived(&cycle.id, &archive_key)
            .await?;

        let report = match self.submit(&cycle.id, bytes, cycle.training_size).await {
            Ok(report) => report,
            Err(e) => {
                self.abort_cycle(&cycle.id, timer, batch.len()).await;
                return Err(e);
            }
        };

        // From here on the job is accepted; a failure leaves the journal
        // row at its last completed status for startup resume instead of
        // aborting.
        self.register(&cycle.id, &report.model_id, cycle.training_size)
            .await?;
        self.mark(&cycle.id, &batch.feedback_ids).await?;

        self.metrics.record(
            CycleEvent::new(CycleOutcome::Completed, timer.elapsed_ms())
                .with_cycle_id(&cycle.id)
                .with_batch_size(cycle.training_size),
        );
        tracing::info!(
            cycle_id = %cycle.id,
            job_id = %report.job_id,
            batch_size = cycle.training_size,
            "Retraining cycle completed"
        );

        Ok(Some(report))
    }

    /// Resume incomplete cycles from the journal.
    ///
    /// Called at startup. Cycles interrupted after job submission finish
    /// their remaining steps; cycles interrupted after archival resubmit
    /// the archived bytes; cycles that never completed a step are
    /// aborted and their feedback re-derives naturally via the trigger.
    ///
    /// # Errors
    ///
    /// Returns [`CycleError`] if the journal scan fails. Per-cycle
    /// resume failures are logged and do not stop the scan.
    pub async fn resume_incomplete(&self) -> Result<u32, CycleError> {
        let Ok(_guard) = self.lease.try_acquire() else {
            return Err(CycleError::ConcurrencyConflict);
        };

        let incomplete = self.storage.incomplete_cycles().await?;
        let mut resumed = 0;

        for cycle in incomplete {
            tracing::info!(
                cycle_id = %cycle.id,
                status = cycle.status.as_str(),
                "Resuming incomplete retraining cycle"
            );
            match self.resume_one(&cycle).await {
                Ok(()) => resumed += 1,
                Err(e) => {
                    tracing::error!(cycle_id = %cycle.id, error = %e, "Cycle resume failed");
                }
            }
        }

        Ok(resumed)
    }

    /// Resume a single cycle from its last completed status.
    async fn resume_one(&self, cycle: &CycleRecord) -> Result<(), CycleError> {
        match cycle.status {
            CycleStatus::Pending => {
                // No step completed; the trigger will re-derive this work
                // from the still-unprocessed feedback.
                self.storage
                    .advance_cycle_status(&cycle.id, CycleStatus::Aborted)
                    .await?;
                Ok(())
            }
            CycleStatus::Archived => {
                let key = cycle.archive_key.as_deref().ok_or_else(|| {
                    CycleError::Storage(crate::error::StorageError::Internal {
                        message: format!("Archived cycle {} has no archive key", cycle.id),
                    })
                })?;
                // Resubmit exactly the archived bytes.
                let bytes = self.archiver.store().get(key).await?;
                let report = self.submit(&cycle.id, bytes, cycle.training_size).await?;
                self.register(&cycle.id, &report.model_id, cycle.training_size)
                    .await?;
                self.mark(&cycle.id, &cycle.feedback_ids).await
            }
            CycleStatus::Submitted => {
                let model_id = cycle
                    .model_id
                    .clone()
                    .unwrap_or_else(|| self.base_model.clone());
                self.register(&cycle.id, &model_id, cycle.training_size)
                    .await?;
                self.mark(&cycle.id, &cycle.feedback_ids).await
            }
            CycleStatus::Registered => self.mark(&cycle.id, &cycle.feedback_ids).await,
            CycleStatus::Marked | CycleStatus::Aborted => Ok(()),
        }
    }

    /// Upload the training data and request a fine-tune job.
    async fn submit(
        &self,
        cycle_id: &str,
        bytes: Vec<u8>,
        training_size: i64,
    ) -> Result<CycleReport, CycleError> {
        let handle = self
            .provider
            .upload_training_file(bytes, UPLOAD_FILENAME)
            .await?;
        tracing::debug!(cycle_id = %cycle_id, file_id = %handle.id, "Training file uploaded");

        let job = self
            .provider
            .create_fine_tune_job(&self.base_model, &handle.id)
            .await?;

        // The final fine-tuned identifier is usually absent at acceptance
        // time; register the best pointer available and let
        // reconciliation replace it once the job succeeds.
        let model_id = job
            .fine_tuned_model
            .clone()
            .unwrap_or_else(|| job.model.clone());

        self.storage
            .record_cycle_submitted(cycle_id, &job.id, job.status.as_str(), &model_id)
            .await?;
        tracing::info!(
            cycle_id = %cycle_id,
            job_id = %job.id,
            status = job.status.as_str(),
            "Fine-tune job accepted"
        );

        Ok(CycleReport {
            cycle_id: cycle_id.to_string(),
            batch_size: training_size,
            job_id: job.id,
            model_id,
        })
    }

    /// Upsert the model registry and advance the journal.
    async fn register(
        &self,
        cycle_id: &str,
        model_id: &str,
        training_size: i64,
    ) -> Result<(), CycleError> {
        let entry = ModelRegistryEntry::new(model_id, training_size);
        self.storage.upsert_registry(&entry).await?;
        self.storage
            .advance_cycle_status(cycle_id, CycleStatus::Registered)
            .await?;
        Ok(())
    }

    /// Mark the captured feedback as processed and finish the cycle.
    async fn mark(&self, cycle_id: &str, feedback_ids: &[String]) -> Result<(), CycleError> {
        let marked = self.storage.mark_processed(feedback_ids).await?;
        self.storage
            .advance_cycle_status(cycle_id, CycleStatus::Marked)
            .await?;
        tracing::info!(cycle_id = %cycle_id, marked, "Consumed feedback marked processed");
        Ok(())
    }

    /// Move a failed cycle to aborted; feedback stays unprocessed.
    async fn abort_cycle(&self, cycle_id: &str, timer: &Timer, batch_size: usize) {
        self.metrics.record(
            CycleEvent::new(CycleOutcome::Aborted, timer.elapsed_ms())
                .with_cycle_id(cycle_id)
                .with_batch_size(i64::try_from(batch_size).unwrap_or(i64::MAX)),
        );
        if let Err(e) = self
            .storage
            .advance_cycle_status(cycle_id, CycleStatus::Aborted)
            .await
        {
            tracing::error!(cycle_id = %cycle_id, error = %e, "Failed to record cycle abort");
        }
    }
}
