//! Storage backend.
//!
//! This module provides:
//! - `SQLite` database implementation
//! - Feedback record operations (append, qualify, mark)
//! - Model registry operations (single-key upsert and read-with-default)
//! - Retraining cycle journal operations
//!
//! # Architecture
//!
//! The storage layer uses `SQLite` with the `sqlx` crate for async
//! operations. Feedback ingestion is a plain append; the only mutation of
//! feedback rows is the all-or-nothing bulk marking a completing cycle
//! performs.
//!
//! The implementation is split across submodules for maintainability:
//! - `core`: Pool management, migrations, and helper functions
//! - `feedback`: Feedback record operations
//! - `registry`: Model registry operations
//! - `cycle`: Cycle journal operations
//!
//! # Example
//!
//! ```ignore
//! use report_tuner::storage::SqliteStorage;
//!
//! let storage = SqliteStorage::new("./data/report-tuner.db").await?;
//! let qualifying = storage.count_qualifying(6).await?;
//! ```

mod core;
mod cycle;
mod feedback;
mod registry;
mod types;

pub use self::core::SqliteStorage;
pub use types::{CycleRecord, CycleStatus, FeedbackRecord, ModelRegistryEntry, REGISTRY_KEY};
