//! Application services.
//!
//! This module provides:
//! - [`IngestService`]: validated feedback ingestion with detached
//!   trigger scheduling
//! - [`GenerateService`]: report-section generation against the current
//!   registered model
//!
//! These are the library-level behaviors behind the (out of scope) HTTP
//! endpoints: ingestion is always available and never blocks behind a
//! running retraining cycle; generation never fails because of registry
//! unavailability.

mod generate;
mod ingest;

pub use generate::{GeneratedSection, GenerateService};
pub use ingest::{FeedbackSubmission, IngestService, MAX_COMMENT_LEN, MAX_CONTENT_LEN, MAX_SECTION_LEN};
