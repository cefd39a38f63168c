//! Model registry operations.
//!
//! The registry is a single row keyed [`REGISTRY_KEY`], overwritten
//! wholesale by each successful retraining cycle. The read path always
//! degrades to a caller-supplied default so generation never fails on a
//! missing or unreachable registry.

#![allow(clippy::missing_errors_doc)]

use crate::error::StorageError;
use sqlx::Row;

use super::core::SqliteStorage;
use super::types::{ModelRegistryEntry, REGISTRY_KEY};

impl SqliteStorage {
    /// Upsert the current-model pointer.
    pub async fn upsert_registry(&self, entry: &ModelRegistryEntry) -> Result<(), StorageError> {
        let last_fine_tuned_str = entry.last_fine_tuned.to_rfc3339();

        sqlx::query(
            "INSERT INTO model_registry (key, model_id, last_fine_tuned, training_size)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
                 model_id = excluded.model_id,
                 last_fine_tuned = excluded.last_fine_tuned,
                 training_size = excluded.training_size",
        )
        .bind(REGISTRY_KEY)
        .bind(&entry.model_id)
        .bind(&last_fine_tuned_str)
        .bind(entry.training_size)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::query_error("UPSERT model_registry", format!("{e}")))?;

        Ok(())
    }

    /// Read the current-model pointer, if one has been registered.
    pub async fn find_registry(&self) -> Result<Option<ModelRegistryEntry>, StorageError> {
        let row = sqlx::query(
            "SELECT model_id, last_fine_tuned, training_size
             FROM model_registry WHERE key = ?",
        )
        .bind(REGISTRY_KEY)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Self::query_error("SELECT model_registry", format!("{e}")))?;

        match row {
            Some(row) => {
                let model_id: String = row.get("model_id");
                let last_fine_tuned_str: String = row.get("last_fine_tuned");
                let training_size: i64 = row.get("training_size");

                let last_fine_tuned = Self::parse_datetime(&last_fine_tuned_str)?;

                Ok(Some(
                    ModelRegistryEntry::new(model_id, training_size)
                        .with_timestamp(last_fine_tuned),
                ))
            }
            None => Ok(None),
        }
    }

    /// Resolve the current model, falling back to `default` when no entry
    /// exists or the registry read fails.
    pub async fn current_model_or(&self, default: &str) -> String {
        match self.find_registry().await {
            Ok(Some(entry)) => entry.model_id,
            Ok(None) => default.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Registry read failed, using default base model");
                default.to_string()
            }
        }
    }
}
