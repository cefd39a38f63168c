//! Retraining orchestration.
//!
//! This module provides:
//! - [`ThresholdTrigger`]: decides when accumulated feedback warrants a cycle
//! - [`TrainingBatch`]/[`TrainingExample`]: training-set assembly
//! - [`CycleLease`]: single-flight guard over the pipeline
//! - [`RetrainPipeline`]: the sequential cycle pipeline with journal resume
//! - [`Reconciler`]: asynchronous provider job completion polling
//!
//! # Architecture
//!
//! One cycle flows capture → journal → build → archive → submit →
//! register → mark. The write-ahead cycle journal makes interrupted
//! cycles resumable from their last completed step; the reconciler
//! finalizes the registry once the provider reports a finished job.

mod builder;
mod lease;
mod pipeline;
mod reconcile;
mod trigger;

pub use builder::{section_prompt, TrainingBatch, TrainingExample, SYSTEM_INSTRUCTION};
pub use lease::{CycleLease, LeaseGuard};
pub use pipeline::{CycleReport, RetrainPipeline};
pub use reconcile::Reconciler;
pub use trigger::{ThresholdTrigger, TriggerDecision};
