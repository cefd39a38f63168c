//! Feedback store operations.
//!
//! The feedback table is an append log: ingestion inserts rows with
//! `processed = 0`, and the only mutation is the bulk marking performed
//! by a completing retraining cycle.

#![allow(clippy::missing_errors_doc)]

use crate::error::StorageError;
use sqlx::Row;

use super::core::SqliteStorage;
use super::types::FeedbackRecord;

impl SqliteStorage {
    /// Insert a feedback record.
    pub async fn insert_feedback(&self, record: &FeedbackRecord) -> Result<(), StorageError> {
        let created_at_str = record.created_at.to_rfc3339();

        sqlx::query(
            "INSERT INTO feedback (id, section, content, rating, comment, processed, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(&record.section)
        .bind(&record.content)
        .bind(record.rating)
        .bind(&record.comment)
        .bind(record.processed)
        .bind(&created_at_str)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::query_error("INSERT feedback", format!("{e}")))?;

        Ok(())
    }

    /// Get a feedback record by ID.
    pub async fn get_feedback(&self, id: &str) -> Result<Option<FeedbackRecord>, StorageError> {
        let row = sqlx::query(
            "SELECT id, section, content, rating, comment, processed, created_at
             FROM feedback WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Self::query_error("SELECT feedback", format!("{e}")))?;

        match row {
            Some(row) => {
                let record = Self::row_to_feedback(&row)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Count unprocessed records whose rating meets the minimum.
    pub async fn count_qualifying(&self, min_rating: i64) -> Result<i64, StorageError> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM feedback WHERE processed = 0 AND rating >= ?",
        )
        .bind(min_rating)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::query_error("COUNT feedback", format!("{e}")))?;

        Ok(row.get("count"))
    }

    /// Fetch the unprocessed records whose rating meets the minimum.
    ///
    /// Ordered by creation time so a batch built from this set is
    /// deterministic for a fixed store state.
    pub async fn qualifying_feedback(
        &self,
        min_rating: i64,
    ) -> Result<Vec<FeedbackRecord>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, section, content, rating, comment, processed, created_at
             FROM feedback WHERE processed = 0 AND rating >= ?
             ORDER BY created_at ASC, id ASC",
        )
        .bind(min_rating)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Self::query_error("SELECT feedback", format!("{e}")))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(Self::row_to_feedback(row)?);
        }

        Ok(records)
    }

    /// Mark exactly the given record ids as processed.
    ///
    /// A single statement, so marking is all-or-nothing. Returns the
    /// number of rows updated.
    pub async fn mark_processed(&self, ids: &[String]) -> Result<u64, StorageError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("UPDATE feedback SET processed = 1 WHERE id IN ({placeholders})");

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }

        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| Self::query_error("UPDATE feedback", format!("{e}")))?;

        Ok(result.rows_affected())
    }

    /// Convert a database row to a [`FeedbackRecord`].
    fn row_to_feedback(row: &sqlx::sqlite::SqliteRow) -> Result<FeedbackRecord, StorageError> {
        let id: String = row.get("id");
        let section: String = row.get("section");
        let content: String = row.get("content");
        let rating: i64 = row.get("rating");
        let comment: Option<String> = row.get("comment");
        let processed: bool = row.get("processed");
        let created_at_str: String = row.get("created_at");

        let created_at = Self::parse_datetime(&created_at_str)?;

        let mut record =
            FeedbackRecord::new(&id, &section, &content, rating).with_timestamp(created_at);
        record.processed = processed;
        if let Some(c) = comment {
            record = record.with_comment(c);
        }

        Ok(record)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::storage::core::tests::test_storage;
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn test_insert_and_get_feedback() {
        let storage = test_storage().await;

        let record = FeedbackRecord::new("f-1", "Background", "Generated text.", 7)
            .with_comment("Excellent detail");
        storage.insert_feedback(&record).await.expect("insert");

        let fetched = storage
            .get_feedback("f-1")
            .await
            .expect("fetch")
            .expect("record exists");
        assert_eq!(fetched.id, "f-1");
        assert_eq!(fetched.section, "Background");
        assert_eq!(fetched.content, "Generated text.");
        assert_eq!(fetched.rating, 7);
        assert_eq!(fetched.comment.as_deref(), Some("Excellent detail"));
        assert!(!fetched.processed);
    }

    #[tokio::test]
    #[serial]
    async fn test_get_feedback_not_found() {
        let storage = test_storage().await;
        let result = storage.get_feedback("nonexistent").await;

        assert!(result.is_ok());
        assert!(result.expect("result").is_none());
    }

    #[tokio::test]
    #[serial]
    async fn test_count_qualifying_excludes_low_ratings() {
        let storage = test_storage().await;

        for (id, rating) in [("f-1", 7), ("f-2", 6), ("f-3", 3)] {
            let record = FeedbackRecord::new(id, "Observations", "Text", rating);
            storage.insert_feedback(&record).await.expect("insert");
        }

        let count = storage.count_qualifying(6).await.expect("count");
        assert_eq!(count, 2);
    }

    #[tokio::test]
    #[serial]
    async fn test_count_qualifying_excludes_processed() {
        let storage = test_storage().await;

        let record = FeedbackRecord::new("f-1", "Background", "Text", 7);
        storage.insert_feedback(&record).await.expect("insert");
        storage
            .mark_processed(&["f-1".to_string()])
            .await
            .expect("mark");

        let count = storage.count_qualifying(6).await.expect("count");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    #[serial]
    async fn test_qualifying_feedback_ordered() {
        let storage = test_storage().await;

        let base = chrono::Utc::now();
        for (id, offset_secs) in [("f-2", 20), ("f-1", 10), ("f-3", 30)] {
            let record = FeedbackRecord::new(id, "Background", "Text", 7)
                .with_timestamp(base + chrono::Duration::seconds(offset_secs));
            storage.insert_feedback(&record).await.expect("insert");
        }

        let records = storage.qualifying_feedback(6).await.expect("query");
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["f-1", "f-2", "f-3"]);
    }

    #[tokio::test]
    #[serial]
    async fn test_mark_processed_exact_ids() {
        let storage = test_storage().await;

        for id in ["f-1", "f-2", "f-3"] {
            let record = FeedbackRecord::new(id, "Background", "Text", 7);
            storage.insert_feedback(&record).await.expect("insert");
        }

        let updated = storage
            .mark_processed(&["f-1".to_string(), "f-3".to_string()])
            .await
            .expect("mark");
        assert_eq!(updated, 2);

        let f1 = storage.get_feedback("f-1").await.unwrap().unwrap();
        let f2 = storage.get_feedback("f-2").await.unwrap().unwrap();
        let f3 = storage.get_feedback("f-3").await.unwrap().unwrap();
        assert!(f1.processed);
        assert!(!f2.processed);
        assert!(f3.processed);
    }

    #[tokio::test]
    #[serial]
    async fn test_mark_processed_empty_is_noop() {
        let storage = test_storage().await;
        let updated = storage.mark_processed(&[]).await.expect("mark");
        assert_eq!(updated, 0);
    }

    #[tokio::test]
    #[serial]
    async fn test_marked_records_leave_qualifying_set() {
        let storage = test_storage().await;

        for id in ["f-1", "f-2"] {
            let record = FeedbackRecord::new(id, "Conclusions", "Text", 7);
            storage.insert_feedback(&record).await.expect("insert");
        }
        storage
            .mark_processed(&["f-1".to_string()])
            .await
            .expect("mark");

        let remaining = storage.qualifying_feedback(6).await.expect("query");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "f-2");
    }
}
