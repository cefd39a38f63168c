//! Retraining cycle journal operations.
//!
//! Each cycle writes a [`CycleRecord`] before its first external call and
//! advances the row's status after every completed step. On startup the
//! journal is scanned for incomplete cycles so an interrupted pipeline
//! resumes from its last completed step instead of resubmitting.

#![allow(clippy::missing_errors_doc)]

use chrono::Utc;
use sqlx::Row;

use crate::error::StorageError;

use super::core::SqliteStorage;
use super::types::{CycleRecord, CycleStatus};

impl SqliteStorage {
    /// Journal a new cycle.
    pub async fn insert_cycle(&self, cycle: &CycleRecord) -> Result<(), StorageError> {
        let feedback_ids_json =
            serde_json::to_string(&cycle.feedback_ids).map_err(|e| StorageError::Internal {
                message: format!("Failed to serialize feedback ids: {e}"),
            })?;
        let created_at_str = cycle.created_at.to_rfc3339();
        let updated_at_str = cycle.updated_at.to_rfc3339();

        sqlx::query(
            "INSERT INTO cycles (id, status, feedback_ids, training_size, archive_key,
                                 job_id, job_status, model_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&cycle.id)
        .bind(cycle.status.as_str())
        .bind(&feedback_ids_json)
        .bind(cycle.training_size)
        .bind(&cycle.archive_key)
        .bind(&cycle.job_id)
        .bind(&cycle.job_status)
        .bind(&cycle.model_id)
        .bind(&created_at_str)
        .bind(&updated_at_str)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::query_error("INSERT cycles", format!("{e}")))?;

        Ok(())
    }

    /// Get a cycle by ID.
    pub async fn get_cycle(&self, id: &str) -> Result<Option<CycleRecord>, StorageError> {
        let row = sqlx::query(
            "SELECT id, status, feedback_ids, training_size, archive_key,
                    job_id, job_status, model_id, created_at, updated_at
             FROM cycles WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Self::query_error("SELECT cycles", format!("{e}")))?;

        match row {
            Some(row) => {
                let cycle = Self::row_to_cycle(&row)?;
                Ok(Some(cycle))
            }
            None => Ok(None),
        }
    }

    /// Advance a cycle's status.
    pub async fn advance_cycle_status(
        &self,
        id: &str,
        status: CycleStatus,
    ) -> Result<(), StorageError> {
        let updated_at_str = Utc::now().to_rfc3339();

        let result = sqlx::query("UPDATE cycles SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(&updated_at_str)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::query_error("UPDATE cycles", format!("{e}")))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::CycleNotFound {
                cycle_id: id.to_string(),
            });
        }

        Ok(())
    }

    /// Record that the cycle's training set was durably archived.
    pub async fn record_cycle_archived(
        &self,
        id: &str,
        archive_key: &str,
    ) -> Result<(), StorageError> {
        let updated_at_str = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "UPDATE cycles SET status = ?, archive_key = ?, updated_at = ? WHERE id = ?",
        )
        .bind(CycleStatus::Archived.as_str())
        .bind(archive_key)
        .bind(&updated_at_str)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::query_error("UPDATE cycles", format!("{e}")))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::CycleNotFound {
                cycle_id: id.to_string(),
            });
        }

        Ok(())
    }

    /// Record that the provider accepted the cycle's fine-tune job.
    pub async fn record_cycle_submitted(
        &self,
        id: &str,
        job_id: &str,
        job_status: &str,
        model_id: &str,
    ) -> Result<(), StorageError> {
        let updated_at_str = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "UPDATE cycles SET status = ?, job_id = ?, job_status = ?, model_id = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(CycleStatus::Submitted.as_str())
        .bind(job_id)
        .bind(job_status)
        .bind(model_id)
        .bind(&updated_at_str)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::query_error("UPDATE cycles", format!("{e}")))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::CycleNotFound {
                cycle_id: id.to_string(),
            });
        }

        Ok(())
    }

    /// Update the observed provider job state for a cycle.
    ///
    /// Used by reconciliation; does not change the pipeline status.
    pub async fn update_cycle_job(
        &self,
        id: &str,
        job_status: &str,
        model_id: Option<&str>,
    ) -> Result<(), StorageError> {
        let updated_at_str = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "UPDATE cycles
             SET job_status = ?, model_id = COALESCE(?, model_id), updated_at = ?
             WHERE id = ?",
        )
        .bind(job_status)
        .bind(model_id)
        .bind(&updated_at_str)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::query_error("UPDATE cycles", format!("{e}")))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::CycleNotFound {
                cycle_id: id.to_string(),
            });
        }

        Ok(())
    }

    /// Fetch cycles that have not reached a terminal status, oldest first.
    pub async fn incomplete_cycles(&self) -> Result<Vec<CycleRecord>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, status, feedback_ids, training_size, archive_key,
                    job_id, job_status, model_id, created_at, updated_at
             FROM cycles
             WHERE status IN ('pending', 'archived', 'submitted', 'registered')
             ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Self::query_error("SELECT cycles", format!("{e}")))?;

        let mut cycles = Vec::with_capacity(rows.len());
        for row in &rows {
            cycles.push(Self::row_to_cycle(row)?);
        }

        Ok(cycles)
    }

    /// Fetch marked cycles whose provider job has not reached a terminal
    /// status, oldest first. These are the reconciliation candidates.
    pub async fn unreconciled_cycles(&self) -> Result<Vec<CycleRecord>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, status, feedback_ids, training_size, archive_key,
                    job_id, job_status, model_id, created_at, updated_at
             FROM cycles
             WHERE status = 'marked'
               AND job_id IS NOT NULL
               AND (job_status IS NULL OR job_status NOT IN ('succeeded', 'failed'))
             ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Self::query_error("SELECT cycles", format!("{e}")))?;

        let mut cycles = Vec::with_capacity(rows.len());
        for row in &rows {
            cycles.push(Self::row_to_cycle(row)?);
        }

        Ok(cycles)
    }

    /// Convert a database row to a [`CycleRecord`].
    fn row_to_cycle(row: &sqlx::sqlite::SqliteRow) -> Result<CycleRecord, StorageError> {
        let id: String = row.get("id");
        let status_str: String = row.get("status");
        let feedback_ids_json: String = row.get("feedback_ids");
        let training_size: i64 = row.get("training_size");
        let archive_key: Option<String> = row.get("archive_key");
        let job_id: Option<String> = row.get("job_id");
        let job_status: Option<String> = row.get("job_status");
        let model_id: Option<String> = row.get("model_id");
        let created_at_str: String = row.get("created_at");
        let updated_at_str: String = row.get("updated_at");

        let status = CycleStatus::parse(&status_str).ok_or_else(|| StorageError::Internal {
            message: format!("Unknown cycle status '{status_str}'"),
        })?;
        let feedback_ids: Vec<String> =
            serde_json::from_str(&feedback_ids_json).map_err(|e| StorageError::Internal {
                message: format!("Failed to parse feedback ids: {e}"),
            })?;
        let created_at = Self::parse_datetime(&created_at_str)?;
        let updated_at = Self::parse_datetime(&updated_at_str)?;

        Ok(CycleRecord {
            id,
            status,
            feedback_ids,
            training_size,
            archive_key,
            job_id,
            job_status,
            model_id,
            created_at,
            updated_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::storage::core::tests::test_storage;
    use serial_test::serial;

    fn new_cycle(id: &str) -> CycleRecord {
        CycleRecord::new(id, vec!["f-1".to_string(), "f-2".to_string()], Utc::now())
    }

    #[tokio::test]
    #[serial]
    async fn test_insert_and_get_cycle() {
        let storage = test_storage().await;

        let cycle = new_cycle("c-1");
        storage.insert_cycle(&cycle).await.expect("insert");

        let fetched = storage
            .get_cycle("c-1")
            .await
            .expect("fetch")
            .expect("cycle exists");
        assert_eq!(fetched.id, "c-1");
        assert_eq!(fetched.status, CycleStatus::Pending);
        assert_eq!(fetched.feedback_ids, vec!["f-1", "f-2"]);
        assert_eq!(fetched.training_size, 2);
    }

    #[tokio::test]
    #[serial]
    async fn test_get_cycle_not_found() {
        let storage = test_storage().await;
        let result = storage.get_cycle("nonexistent").await.expect("query");
        assert!(result.is_none());
    }

    #[tokio::test]
    #[serial]
    async fn test_advance_cycle_status() {
        let storage = test_storage().await;
        storage.insert_cycle(&new_cycle("c-1")).await.expect("insert");

        storage
            .advance_cycle_status("c-1", CycleStatus::Marked)
            .await
            .expect("advance");

        let fetched = storage.get_cycle("c-1").await.unwrap().unwrap();
        assert_eq!(fetched.status, CycleStatus::Marked);
    }

    #[tokio::test]
    #[serial]
    async fn test_advance_missing_cycle_fails() {
        let storage = test_storage().await;
        let result = storage
            .advance_cycle_status("nonexistent", CycleStatus::Aborted)
            .await;
        assert!(matches!(
            result.unwrap_err(),
            StorageError::CycleNotFound { cycle_id } if cycle_id == "nonexistent"
        ));
    }

    #[tokio::test]
    #[serial]
    async fn test_record_cycle_archived() {
        let storage = test_storage().await;
        storage.insert_cycle(&new_cycle("c-1")).await.expect("insert");

        storage
            .record_cycle_archived("c-1", "20260805T120000Z.jsonl")
            .await
            .expect("archive");

        let fetched = storage.get_cycle("c-1").await.unwrap().unwrap();
        assert_eq!(fetched.status, CycleStatus::Archived);
        assert_eq!(fetched.archive_key.as_deref(), Some("20260805T120000Z.jsonl"));
    }

    #[tokio::test]
    #[serial]
    async fn test_record_cycle_submitted() {
        let storage = test_storage().await;
        storage.insert_cycle(&new_cycle("c-1")).await.expect("insert");

        storage
            .record_cycle_submitted("c-1", "ftjob-1", "queued", "gpt-3.5-turbo")
            .await
            .expect("submit");

        let fetched = storage.get_cycle("c-1").await.unwrap().unwrap();
        assert_eq!(fetched.status, CycleStatus::Submitted);
        assert_eq!(fetched.job_id.as_deref(), Some("ftjob-1"));
        assert_eq!(fetched.job_status.as_deref(), Some("queued"));
        assert_eq!(fetched.model_id.as_deref(), Some("gpt-3.5-turbo"));
    }

    #[tokio::test]
    #[serial]
    async fn test_update_cycle_job_keeps_model_when_none() {
        let storage = test_storage().await;
        storage.insert_cycle(&new_cycle("c-1")).await.expect("insert");
        storage
            .record_cycle_submitted("c-1", "ftjob-1", "queued", "gpt-3.5-turbo")
            .await
            .expect("submit");

        storage
            .update_cycle_job("c-1", "running", None)
            .await
            .expect("update");

        let fetched = storage.get_cycle("c-1").await.unwrap().unwrap();
        assert_eq!(fetched.status, CycleStatus::Submitted);
        assert_eq!(fetched.job_status.as_deref(), Some("running"));
        assert_eq!(fetched.model_id.as_deref(), Some("gpt-3.5-turbo"));
    }

    #[tokio::test]
    #[serial]
    async fn test_update_cycle_job_sets_final_model() {
        let storage = test_storage().await;
        storage.insert_cycle(&new_cycle("c-1")).await.expect("insert");
        storage
            .record_cycle_submitted("c-1", "ftjob-1", "queued", "gpt-3.5-turbo")
            .await
            .expect("submit");

        storage
            .update_cycle_job("c-1", "succeeded", Some("ft:gpt-3.5-turbo:acme::abc"))
            .await
            .expect("update");

        let fetched = storage.get_cycle("c-1").await.unwrap().unwrap();
        assert_eq!(fetched.job_status.as_deref(), Some("succeeded"));
        assert_eq!(
            fetched.model_id.as_deref(),
            Some("ft:gpt-3.5-turbo:acme::abc")
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_incomplete_cycles_excludes_terminal() {
        let storage = test_storage().await;

        storage.insert_cycle(&new_cycle("c-1")).await.expect("insert");
        storage.insert_cycle(&new_cycle("c-2")).await.expect("insert");
        storage.insert_cycle(&new_cycle("c-3")).await.expect("insert");

        storage
            .advance_cycle_status("c-2", CycleStatus::Marked)
            .await
            .expect("mark");
        storage
            .advance_cycle_status("c-3", CycleStatus::Aborted)
            .await
            .expect("abort");

        let incomplete = storage.incomplete_cycles().await.expect("scan");
        let ids: Vec<&str> = incomplete.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c-1"]);
    }

    #[tokio::test]
    #[serial]
    async fn test_unreconciled_cycles() {
        let storage = test_storage().await;

        // Marked with a pending job: reconciliation candidate
        storage.insert_cycle(&new_cycle("c-1")).await.expect("insert");
        storage
            .record_cycle_submitted("c-1", "ftjob-1", "queued", "gpt-3.5-turbo")
            .await
            .expect("submit");
        storage
            .advance_cycle_status("c-1", CycleStatus::Marked)
            .await
            .expect("mark");

        // Marked with a succeeded job: already reconciled
        storage.insert_cycle(&new_cycle("c-2")).await.expect("insert");
        storage
            .record_cycle_submitted("c-2", "ftjob-2", "queued", "gpt-3.5-turbo")
            .await
            .expect("submit");
        storage
            .update_cycle_job("c-2", "succeeded", Some("ft:x"))
            .await
            .expect("update");
        storage
            .advance_cycle_status("c-2", CycleStatus::Marked)
            .await
            .expect("mark");

        // Still submitted: not a reconciliation candidate yet
        storage.insert_cycle(&new_cycle("c-3")).await.expect("insert");
        storage
            .record_cycle_submitted("c-3", "ftjob-3", "queued", "gpt-3.5-turbo")
            .await
            .expect("submit");

        let candidates = storage.unreconciled_cycles().await.expect("scan");
        let ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c-1"]);
    }
}
