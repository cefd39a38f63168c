//! Cycle metrics collection.
//!
//! This module provides:
//! - Per-cycle outcome tracking (completed, skipped, aborted)
//! - Latency measurements
//! - Query interfaces for cycle metrics data
//!
//! Retraining failures never propagate to the ingestion path; this
//! collector is how they stay observable.
//!
//! # Example
//!
//! ```
//! use report_tuner::metrics::{CycleEvent, CycleMetrics, CycleOutcome};
//!
//! let metrics = CycleMetrics::new();
//! metrics.record(CycleEvent::new(CycleOutcome::Completed, 1200).with_batch_size(12));
//! metrics.record(CycleEvent::new(CycleOutcome::Skipped, 3));
//!
//! let summary = metrics.summary();
//! assert_eq!(summary.total_cycles, 2);
//! assert_eq!(summary.completed, 1);
//! assert_eq!(summary.skipped, 1);
//! ```

// Allow intentional numeric casts for metrics calculations
#![allow(clippy::cast_lossless, clippy::cast_precision_loss)]

use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use std::time::Instant;

/// Outcome of one retraining cycle invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Cycle ran to completion: feedback marked, registry updated.
    Completed,
    /// Threshold not met or lease held; nothing was done.
    Skipped,
    /// Cycle started but failed before marking.
    Aborted,
}

/// A single cycle metric event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleEvent {
    /// How the cycle ended.
    pub outcome: CycleOutcome,
    /// Cycle id, when one was journaled.
    pub cycle_id: Option<String>,
    /// Training examples in the batch, when one was built.
    pub batch_size: Option<i64>,
    /// Latency in milliseconds.
    pub latency_ms: u64,
    /// Timestamp of the event (Unix epoch seconds).
    pub timestamp: u64,
}

impl CycleEvent {
    /// Create a new cycle event.
    #[must_use]
    pub fn new(outcome: CycleOutcome, latency_ms: u64) -> Self {
        Self {
            outcome,
            cycle_id: None,
            batch_size: None,
            latency_ms,
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }

    /// Attach the journaled cycle id.
    #[must_use]
    pub fn with_cycle_id(mut self, cycle_id: impl Into<String>) -> Self {
        self.cycle_id = Some(cycle_id.into());
        self
    }

    /// Attach the batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = Some(batch_size);
        self
    }
}

/// Summary of recorded cycle outcomes.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CycleSummary {
    /// Total cycle invocations recorded.
    pub total_cycles: u64,
    /// Cycles that ran to completion.
    pub completed: u64,
    /// Invocations skipped (threshold not met or lease held).
    pub skipped: u64,
    /// Cycles that started but aborted.
    pub aborted: u64,
    /// Training examples consumed across completed cycles.
    pub examples_trained: i64,
    /// Average latency of completed cycles in milliseconds.
    pub avg_completed_latency_ms: f64,
}

/// Thread-safe cycle metrics collector.
#[derive(Debug, Default)]
pub struct CycleMetrics {
    events: RwLock<Vec<CycleEvent>>,
}

impl CycleMetrics {
    /// Create a new metrics collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cycle event.
    pub fn record(&self, event: CycleEvent) {
        match self.events.write() {
            Ok(mut events) => {
                events.push(event);
            }
            Err(poison_error) => {
                tracing::error!(
                    outcome = ?event.outcome,
                    error = %poison_error,
                    "Failed to record cycle event: RwLock poisoned"
                );
            }
        }
    }

    /// Get summary statistics.
    #[must_use]
    pub fn summary(&self) -> CycleSummary {
        let events = match self.events.read() {
            Ok(e) => e.clone(),
            Err(poison_error) => {
                tracing::warn!(
                    error = %poison_error,
                    "Reading cycle events from poisoned lock, using recovered data"
                );
                poison_error.into_inner().clone()
            }
        };

        let total_cycles = events.len() as u64;
        let completed_events: Vec<&CycleEvent> = events
            .iter()
            .filter(|e| e.outcome == CycleOutcome::Completed)
            .collect();
        let completed = completed_events.len() as u64;
        let skipped = events
            .iter()
            .filter(|e| e.outcome == CycleOutcome::Skipped)
            .count() as u64;
        let aborted = events
            .iter()
            .filter(|e| e.outcome == CycleOutcome::Aborted)
            .count() as u64;

        let examples_trained = completed_events
            .iter()
            .filter_map(|e| e.batch_size)
            .sum::<i64>();
        let avg_completed_latency_ms = if completed_events.is_empty() {
            0.0
        } else {
            completed_events.iter().map(|e| e.latency_ms).sum::<u64>() as f64
                / completed_events.len() as f64
        };

        CycleSummary {
            total_cycles,
            completed,
            skipped,
            aborted,
            examples_trained,
            avg_completed_latency_ms,
        }
    }

    /// Get recorded events with the given outcome.
    #[must_use]
    pub fn events_with_outcome(&self, outcome: CycleOutcome) -> Vec<CycleEvent> {
        self.events
            .read()
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.outcome == outcome)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Clear all metrics (useful for testing).
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.write() {
            events.clear();
        }
    }
}

/// Timer for measuring cycle latency.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_event_new() {
        let event = CycleEvent::new(CycleOutcome::Completed, 1500);
        assert_eq!(event.outcome, CycleOutcome::Completed);
        assert_eq!(event.latency_ms, 1500);
        assert!(event.cycle_id.is_none());
        assert!(event.batch_size.is_none());
        assert!(event.timestamp > 0);
    }

    #[test]
    fn test_cycle_event_builders() {
        let event = CycleEvent::new(CycleOutcome::Aborted, 200)
            .with_cycle_id("c-1")
            .with_batch_size(12);
        assert_eq!(event.cycle_id.as_deref(), Some("c-1"));
        assert_eq!(event.batch_size, Some(12));
    }

    #[test]
    fn test_summary_counts_outcomes() {
        let metrics = CycleMetrics::new();
        metrics.record(CycleEvent::new(CycleOutcome::Completed, 1000).with_batch_size(10));
        metrics.record(CycleEvent::new(CycleOutcome::Completed, 2000).with_batch_size(15));
        metrics.record(CycleEvent::new(CycleOutcome::Skipped, 2));
        metrics.record(CycleEvent::new(CycleOutcome::Aborted, 500));

        let summary = metrics.summary();
        assert_eq!(summary.total_cycles, 4);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.aborted, 1);
        assert_eq!(summary.examples_trained, 25);
        assert!((summary.avg_completed_latency_ms - 1500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_summary() {
        let metrics = CycleMetrics::new();
        let summary = metrics.summary();

        assert_eq!(summary.total_cycles, 0);
        assert_eq!(summary.examples_trained, 0);
        assert!((summary.avg_completed_latency_ms - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_events_with_outcome() {
        let metrics = CycleMetrics::new();
        metrics.record(CycleEvent::new(CycleOutcome::Completed, 1000).with_cycle_id("c-1"));
        metrics.record(CycleEvent::new(CycleOutcome::Skipped, 2));

        let completed = metrics.events_with_outcome(CycleOutcome::Completed);
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].cycle_id.as_deref(), Some("c-1"));

        let aborted = metrics.events_with_outcome(CycleOutcome::Aborted);
        assert!(aborted.is_empty());
    }

    #[test]
    fn test_clear() {
        let metrics = CycleMetrics::new();
        metrics.record(CycleEvent::new(CycleOutcome::Completed, 100));
        assert_eq!(metrics.summary().total_cycles, 1);

        metrics.clear();
        assert_eq!(metrics.summary().total_cycles, 0);
    }

    #[test]
    fn test_cycle_event_serialize() {
        let event = CycleEvent::new(CycleOutcome::Aborted, 300).with_batch_size(5);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"outcome\":\"aborted\""));
        assert!(json.contains("\"batch_size\":5"));
    }

    #[test]
    fn test_timer() {
        let timer = Timer::start();
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(timer.elapsed_ms() >= 10);
    }

    #[test]
    fn test_timer_default() {
        let timer = Timer::default();
        assert!(timer.elapsed_ms() < 100);
    }
}
