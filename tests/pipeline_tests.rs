//! End-to-end retraining pipeline tests.
//!
//! These tests exercise the full stack: SQLite storage on a temp file,
//! a real filesystem blob store, and the real HTTP provider client
//! against a wiremock server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use report_tuner::archive::{Archiver, FsBlobStore};
use report_tuner::metrics::CycleMetrics;
use report_tuner::provider::{ClientConfig, ProviderHttpClient};
use report_tuner::service::{FeedbackSubmission, GenerateService, IngestService};
use report_tuner::storage::{CycleStatus, FeedbackRecord, SqliteStorage};
use report_tuner::training::{Reconciler, RetrainPipeline, ThresholdTrigger};

const BASE_MODEL: &str = "gpt-3.5-turbo";

struct TestHarness {
    storage: SqliteStorage,
    server: MockServer,
    archive_dir: tempfile::TempDir,
    _db_dir: tempfile::TempDir,
}

impl TestHarness {
    async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("db dir");
        let storage = SqliteStorage::new(db_dir.path().join("test.db"))
            .await
            .expect("storage");
        Self {
            storage,
            server: MockServer::start().await,
            archive_dir: tempfile::tempdir().expect("archive dir"),
            _db_dir: db_dir,
        }
    }

    fn provider(&self) -> Arc<ProviderHttpClient> {
        let config = ClientConfig::default()
            .with_base_url(self.server.uri())
            .with_max_retries(0)
            .with_retry_delay_ms(10);
        Arc::new(ProviderHttpClient::new("test-api-key", config).expect("client"))
    }

    fn pipeline(&self, min_rating: i64, batch_size: i64) -> RetrainPipeline {
        let archiver = Archiver::new(Arc::new(FsBlobStore::new(self.archive_dir.path())), 1, 10);
        RetrainPipeline::new(
            self.storage.clone(),
            self.provider(),
            archiver,
            ThresholdTrigger::new(min_rating, batch_size),
            BASE_MODEL,
            Arc::new(CycleMetrics::new()),
        )
    }

    async fn insert_rated(&self, count: usize, rating: i64) {
        for i in 0..count {
            let record = FeedbackRecord::new(
                format!("f-{rating}-{i}"),
                "Background",
                format!("Generated section text {i}."),
                rating,
            );
            self.storage.insert_feedback(&record).await.expect("insert");
        }
    }

    async fn mount_accepting_provider(&self) {
        Mock::given(method("POST"))
            .and(path("/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "file-abc",
                "filename": "training.jsonl",
                "bytes": 1024
            })))
            .mount(&self.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/fine_tuning/jobs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "ftjob-1",
                "status": "queued",
                "model": BASE_MODEL
            })))
            .mount(&self.server)
            .await;
    }

    fn archived_blobs(&self) -> Vec<String> {
        std::fs::read_dir(self.archive_dir.path())
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok().map(|e| e.file_name().to_string_lossy().into_owned()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[tokio::test]
async fn below_threshold_has_no_side_effects() {
    let harness = TestHarness::new().await;
    harness.insert_rated(9, 7).await;

    let pipeline = harness.pipeline(6, 10);
    let report = pipeline.evaluate_and_run().await.expect("run");

    assert!(report.is_none());
    assert!(harness.archived_blobs().is_empty());
    assert!(harness.storage.find_registry().await.unwrap().is_none());
    assert_eq!(harness.storage.count_qualifying(6).await.unwrap(), 9);
    assert_eq!(harness.server.received_requests().await.unwrap().len(), 0);
}

#[tokio::test]
async fn cycle_consumes_exactly_the_captured_qualifying_records() {
    let harness = TestHarness::new().await;
    // The 12-and-1 scenario: 12 rated 7, one rated 3
    harness.insert_rated(12, 7).await;
    harness.insert_rated(1, 3).await;
    harness.mount_accepting_provider().await;

    let pipeline = harness.pipeline(6, 10);
    let report = pipeline
        .evaluate_and_run()
        .await
        .expect("run")
        .expect("cycle fired");

    assert_eq!(report.batch_size, 12);
    assert_eq!(report.job_id, "ftjob-1");

    // The rating-3 record is excluded and stays unprocessed
    let low = harness
        .storage
        .get_feedback("f-3-0")
        .await
        .unwrap()
        .expect("record");
    assert!(!low.processed);

    // All 12 qualifying records are consumed
    assert_eq!(harness.storage.count_qualifying(6).await.unwrap(), 0);

    // Registry reflects the cycle
    let entry = harness
        .storage
        .find_registry()
        .await
        .unwrap()
        .expect("registry entry");
    assert_eq!(entry.training_size, 12);

    // Exactly one archived blob, one line per example
    let blobs = harness.archived_blobs();
    assert_eq!(blobs.len(), 1);
    let content =
        std::fs::read_to_string(harness.archive_dir.path().join(&blobs[0])).expect("blob");
    assert_eq!(content.trim_end().lines().count(), 12);
    assert!(content.contains("\"role\":\"assistant\""));
}

#[tokio::test]
async fn trigger_does_not_refire_after_successful_cycle() {
    let harness = TestHarness::new().await;
    harness.insert_rated(10, 6).await;
    harness.mount_accepting_provider().await;

    let pipeline = harness.pipeline(6, 10);
    assert!(pipeline.evaluate_and_run().await.expect("run").is_some());
    assert!(pipeline.evaluate_and_run().await.expect("run").is_none());

    // Still exactly one archived batch
    assert_eq!(harness.archived_blobs().len(), 1);
}

#[tokio::test]
async fn archival_exhaustion_aborts_before_contacting_provider() {
    let harness = TestHarness::new().await;
    harness.insert_rated(10, 7).await;
    harness.mount_accepting_provider().await;

    // A blob store rooted below a regular file cannot create its
    // directory, so every write fails
    let blocked_root = harness.archive_dir.path().join("blocked");
    std::fs::write(&blocked_root, b"not a directory").unwrap();
    let archiver = Archiver::new(
        Arc::new(FsBlobStore::new(blocked_root.join("archive"))),
        2,
        10,
    );
    let pipeline = RetrainPipeline::new(
        harness.storage.clone(),
        harness.provider(),
        archiver,
        ThresholdTrigger::new(6, 10),
        BASE_MODEL,
        Arc::new(CycleMetrics::new()),
    );

    let result = pipeline.evaluate_and_run().await;
    assert!(result.is_err());

    // No provider contact, no marking, no registry change
    assert_eq!(harness.server.received_requests().await.unwrap().len(), 0);
    assert_eq!(harness.storage.count_qualifying(6).await.unwrap(), 10);
    assert!(harness.storage.find_registry().await.unwrap().is_none());

    // The journaled cycle ended aborted
    let incomplete = harness.storage.incomplete_cycles().await.unwrap();
    assert!(incomplete.is_empty());
}

#[tokio::test]
async fn provider_rejection_leaves_feedback_unprocessed() {
    let harness = TestHarness::new().await;
    harness.insert_rated(10, 7).await;

    Mock::given(method("POST"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid purpose"))
        .mount(&harness.server)
        .await;

    let pipeline = harness.pipeline(6, 10);
    let result = pipeline.evaluate_and_run().await;
    assert!(result.is_err());

    assert_eq!(harness.storage.count_qualifying(6).await.unwrap(), 10);
    assert!(harness.storage.find_registry().await.unwrap().is_none());
    // The archived blob stays: archival is the audit trail regardless of
    // the provider outcome
    assert_eq!(harness.archived_blobs().len(), 1);
}

#[tokio::test]
async fn halt_after_submission_resumes_without_resubmitting() {
    let harness = TestHarness::new().await;
    harness.insert_rated(10, 7).await;
    harness.mount_accepting_provider().await;

    let pipeline = harness.pipeline(6, 10);

    // Run a full cycle, then rewind the journal to 'submitted' and undo
    // the marking, simulating a process halt between submission and
    // registry upsert
    let report = pipeline
        .evaluate_and_run()
        .await
        .expect("run")
        .expect("cycle fired");
    let cycle_id = report.cycle_id.clone();

    sqlx::query("UPDATE cycles SET status = 'submitted' WHERE id = ?")
        .bind(&cycle_id)
        .execute(&harness.storage.get_pool())
        .await
        .unwrap();
    sqlx::query("UPDATE feedback SET processed = 0")
        .execute(&harness.storage.get_pool())
        .await
        .unwrap();
    sqlx::query("DELETE FROM model_registry")
        .execute(&harness.storage.get_pool())
        .await
        .unwrap();

    let requests_before = harness.server.received_requests().await.unwrap().len();

    // "Restart": a fresh pipeline resumes from the journal
    let restarted = harness.pipeline(6, 10);
    let resumed = restarted.resume_incomplete().await.expect("resume");
    assert_eq!(resumed, 1);

    // No new provider requests; registry and marking completed
    assert_eq!(
        harness.server.received_requests().await.unwrap().len(),
        requests_before
    );
    let cycle = harness
        .storage
        .get_cycle(&cycle_id)
        .await
        .unwrap()
        .expect("cycle");
    assert_eq!(cycle.status, CycleStatus::Marked);
    assert_eq!(harness.storage.count_qualifying(6).await.unwrap(), 0);
    assert!(harness.storage.find_registry().await.unwrap().is_some());
}

#[tokio::test]
async fn reconciliation_finalizes_registry_with_fine_tuned_model() {
    let harness = TestHarness::new().await;
    harness.insert_rated(10, 7).await;
    harness.mount_accepting_provider().await;

    let pipeline = harness.pipeline(6, 10);
    let report = pipeline
        .evaluate_and_run()
        .await
        .expect("run")
        .expect("cycle fired");

    // At acceptance time the registry carries the provisional pointer
    let entry = harness.storage.find_registry().await.unwrap().unwrap();
    assert_eq!(entry.model_id, BASE_MODEL);

    Mock::given(method("GET"))
        .and(path(format!("/fine_tuning/jobs/{}", report.job_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": report.job_id,
            "status": "succeeded",
            "model": BASE_MODEL,
            "fine_tuned_model": "ft:gpt-3.5-turbo:acme::final"
        })))
        .mount(&harness.server)
        .await;

    let reconciler = Reconciler::new(harness.storage.clone(), harness.provider());
    let settled = reconciler.poll_once().await.expect("poll");
    assert_eq!(settled, 1);

    let entry = harness.storage.find_registry().await.unwrap().unwrap();
    assert_eq!(entry.model_id, "ft:gpt-3.5-turbo:acme::final");

    // Nothing left to reconcile
    assert_eq!(reconciler.poll_once().await.expect("poll"), 0);
}

#[tokio::test]
async fn ingested_feedback_flows_into_a_cycle() {
    let harness = TestHarness::new().await;
    harness.mount_accepting_provider().await;

    // Threshold high enough that ingestion's detached evaluations stay
    // no-ops; the explicit evaluation below does the work
    let idle_pipeline = Arc::new(harness.pipeline(6, 1_000));
    let ingest = IngestService::new(harness.storage.clone(), idle_pipeline);

    for i in 0..5 {
        ingest
            .ingest(FeedbackSubmission {
                section: "Observations".to_string(),
                content: format!("Detailed observation {i}."),
                rating: 7,
                comment: None,
            })
            .await
            .expect("ingest");
    }

    // A malformed submission is rejected and never persisted
    let rejected = ingest
        .ingest(FeedbackSubmission {
            section: String::new(),
            content: "Orphan".to_string(),
            rating: 7,
            comment: None,
        })
        .await;
    assert!(rejected.is_err());

    let report = harness
        .pipeline(6, 5)
        .evaluate_and_run()
        .await
        .expect("run")
        .expect("cycle fired");
    assert_eq!(report.batch_size, 5);
    assert_eq!(harness.storage.count_qualifying(6).await.unwrap(), 0);
    assert_eq!(harness.archived_blobs().len(), 1);
}

#[tokio::test]
async fn generation_uses_registry_pointer_and_default() {
    let harness = TestHarness::new().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "Generated section."}}]
        })))
        .mount(&harness.server)
        .await;

    let service = GenerateService::new(harness.storage.clone(), harness.provider(), BASE_MODEL);

    // No registry entry: default base model
    let generated = service
        .generate("Background", "hail damage to roofing")
        .await
        .expect("generate");
    assert_eq!(generated.model_id, BASE_MODEL);
    assert_eq!(generated.content, "Generated section.");

    // After a cycle registers a model, generation picks it up
    harness.insert_rated(10, 7).await;
    harness.mount_accepting_provider().await;
    harness
        .pipeline(6, 10)
        .evaluate_and_run()
        .await
        .expect("run")
        .expect("cycle fired");

    let generated = service
        .generate("Conclusions", "hail damage to roofing")
        .await
        .expect("generate");
    assert_eq!(generated.section, "Conclusions");
}
