//! Report Tuner daemon entry point.
//!
//! Loads configuration from the environment, opens storage, resumes any
//! retraining cycle the last run left incomplete, then evaluates the
//! retraining threshold and polls submitted fine-tune jobs on fixed
//! intervals until interrupted.

use std::sync::Arc;
use std::time::Duration;

use report_tuner::archive::{Archiver, FsBlobStore};
use report_tuner::config::Config;
use report_tuner::error::CycleError;
use report_tuner::metrics::CycleMetrics;
use report_tuner::provider::{ClientConfig, ProviderHttpClient};
use report_tuner::storage::SqliteStorage;
use report_tuner::training::{Reconciler, RetrainPipeline, ThresholdTrigger};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("LOG_LEVEL")
                .unwrap_or_else(|_| "info".to_string())
                .parse()
                .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("report-tuner starting...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Configuration loaded: database={}, archive={}, batch_size={}, min_rating={}",
        config.database_path,
        config.archive_dir,
        config.batch_size,
        config.min_rating
    );

    let storage = match SqliteStorage::new(&config.database_path).await {
        Ok(storage) => storage,
        Err(e) => {
            tracing::error!("Storage error: {e}");
            std::process::exit(1);
        }
    };

    let client_config = ClientConfig::default()
        .with_base_url(config.provider_base_url.clone())
        .with_timeout_ms(config.request_timeout_ms)
        .with_max_retries(config.max_retries)
        .with_retry_delay_ms(config.retry_delay_ms);
    let provider =
        match ProviderHttpClient::new(config.provider_api_key.expose(), client_config) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                tracing::error!("Provider client error: {e}");
                std::process::exit(1);
            }
        };

    let archiver = Archiver::new(
        Arc::new(FsBlobStore::new(config.archive_dir.clone())),
        config.max_retries,
        config.retry_delay_ms,
    );
    let trigger = ThresholdTrigger::new(config.min_rating, config.batch_size);
    let pipeline = RetrainPipeline::new(
        storage.clone(),
        provider.clone(),
        archiver,
        trigger,
        config.base_model.clone(),
        Arc::new(CycleMetrics::new()),
    );
    let reconciler = Reconciler::new(storage, provider);

    match pipeline.resume_incomplete().await {
        Ok(0) => {}
        Ok(resumed) => tracing::info!(resumed, "Resumed incomplete retraining cycles"),
        Err(e) => tracing::error!("Cycle resume failed: {e}"),
    }

    run_scheduler(&pipeline, &reconciler, &config).await;

    tracing::info!("report-tuner shutdown complete");
}

/// Evaluate the trigger and poll the reconciler on their intervals
/// until ctrl-c.
async fn run_scheduler(pipeline: &RetrainPipeline, reconciler: &Reconciler, config: &Config) {
    let mut trigger_interval =
        tokio::time::interval(Duration::from_secs(config.trigger_interval_secs));
    let mut reconcile_interval =
        tokio::time::interval(Duration::from_secs(config.reconcile_interval_secs));

    loop {
        tokio::select! {
            _ = trigger_interval.tick() => {
                match pipeline.evaluate_and_run().await {
                    Ok(Some(report)) => {
                        tracing::info!(
                            cycle_id = %report.cycle_id,
                            job_id = %report.job_id,
                            "Scheduled retraining cycle completed"
                        );
                    }
                    Ok(None) => {}
                    // Cycle failures are internal-only; the scheduler keeps going
                    Err(CycleError::ConcurrencyConflict) => {}
                    Err(e) => tracing::error!("Retraining cycle failed: {e}"),
                }
            }
            _ = reconcile_interval.tick() => {
                match reconciler.poll_once().await {
                    Ok(0) => {}
                    Ok(settled) => tracing::info!(settled, "Fine-tune jobs reconciled"),
                    Err(e) => tracing::error!("Reconciliation poll failed: {e}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupt received, shutting down");
                break;
            }
        }
    }
}
