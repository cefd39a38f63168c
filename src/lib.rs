//! Report Tuner
//!
//! A feedback-driven fine-tuning orchestration service for generated
//! report sections.
//!
//! # Features
//!
//! - Durable feedback store for rated report sections (`SQLite`)
//! - Threshold-triggered retraining cycles with single-flight leasing
//! - JSONL training-set assembly and durable archival
//! - Fine-tune job submission against an OpenAI-style provider API
//! - Current-model registry with a safe default fallback
//! - Write-ahead cycle journal for idempotent crash recovery
//! - Reconciliation poller for asynchronous job completion
//!
//! # Quick Start
//!
//! ```bash
//! PROVIDER_API_KEY=sk-xxx ./report-tuner
//! ```
//!
//! # Architecture
//!
//! ```text
//! feedback ──▶ threshold trigger ──▶ training-set builder
//!                                          │
//!                                          ▼
//!                 archival sink ──▶ fine-tune submitter ──▶ provider API
//!                                          │
//!                                          ▼
//!                  model registry ──▶ consumption marker
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod archive;
pub mod config;
pub mod error;
pub mod metrics;
pub mod provider;
pub mod service;
pub mod storage;
pub mod training;
pub mod traits;
