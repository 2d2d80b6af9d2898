use geosentry::{
    app_state::AppState,
    config::AppConfig,
    db::{self, alert_queries, aoi_queries, job_queries},
    services::{
        engine::DetectionEngine,
        notify::{EmailChannel, NotificationChannel, NotificationDispatcher, WebhookChannel},
        queue::{JobQueue, QueuedDetection},
    },
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL_MS: u64 = 1000; // 1 second

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting detection worker");

    // Load configuration
    let config = AppConfig::from_env().expect("Failed to load configuration");

    // The worker is its own process, so it needs its own Prometheus
    // recorder; without one every metric below lands in a no-op sink.
    let metrics_addr: SocketAddr = config
        .worker_metrics_addr
        .parse()
        .expect("Invalid worker_metrics_addr");
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .expect("Failed to install Prometheus metrics exporter");

    metrics::describe_histogram!(
        "detection_processing_seconds",
        "Time from dequeue to terminal job state"
    );
    metrics::describe_counter!("detection_jobs_completed", "Total detection jobs completed");
    metrics::describe_counter!("detection_jobs_failed", "Total detection jobs that failed");
    metrics::describe_gauge!(
        "detection_queue_depth",
        "Current number of pending jobs in the queue"
    );

    // Initialize database
    tracing::info!("Connecting to PostgreSQL");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Initialize services
    tracing::info!("Initializing services");
    let queue = JobQueue::new(&config.redis_url).expect("Failed to initialize job queue");
    queue
        .health_check()
        .await
        .expect("Redis unreachable at startup");

    let engine = DetectionEngine::new(
        &config.engine_command,
        &config.engine_workspace,
        config.engine_debug,
    );

    let channels: Vec<Box<dyn NotificationChannel>> = vec![
        Box::new(WebhookChannel::new(
            config.webhook_url.clone(),
            config.dashboard_base_url.clone(),
        )),
        Box::new(EmailChannel::new(
            config.email_api_url.clone(),
            config.email_api_token.clone(),
            config.email_from.clone(),
            config.dashboard_base_url.clone(),
        )),
    ];
    let notifier = NotificationDispatcher::new(channels);

    let state = AppState::new(db_pool, queue, engine, notifier);

    tracing::info!("Worker ready, starting detection loop");

    // Main processing loop
    loop {
        match process_next_job(&state).await {
            Ok(true) => {
                tracing::debug!("Job processed, checking for next job");
            }
            Ok(false) => {
                tracing::trace!("No jobs available, sleeping");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Error processing job, will retry");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
        }

        if let Ok(depth) = state.queue.queue_depth().await {
            metrics::gauge!("detection_queue_depth").set(depth as f64);
        }
    }
}

/// Process the next job from the queue.
/// Returns Ok(true) if a job was processed, Ok(false) if no job available.
async fn process_next_job(state: &AppState) -> Result<bool, Box<dyn std::error::Error>> {
    let job = match state.queue.dequeue().await? {
        Some(j) => j,
        None => return Ok(false),
    };

    tracing::info!(
        job_id = %job.job_id,
        aoi_id = %job.aoi_id,
        "Running detection job"
    );

    let start = std::time::Instant::now();

    job_queries::update_progress(&state.db, &job.job_id, 50).await?;

    // The engine run's process exit is the completion signal; finalize
    // happens right after, never on a timer.
    match state.engine.run(&job.input_path, &job.output_path).await {
        Ok(output) => {
            finalize_completed(state, &job, &output.alert_data).await?;
            metrics::counter!("detection_jobs_completed").increment(1);
        }
        Err(e) => {
            finalize_failed(state, &job, &e.to_string()).await?;
            metrics::counter!("detection_jobs_failed").increment(1);
        }
    }

    metrics::histogram!("detection_processing_seconds").record(start.elapsed().as_secs_f64());

    state.queue.complete(&job).await?;
    Ok(true)
}

/// Terminal transition for a successful run: persist the alert and mark
/// the job completed in one transaction, then dispatch notifications.
///
/// Alert insert and the guarded job update commit together, so a job can
/// never produce two alerts and a terminal job is never overwritten even
/// if the queue delivers the same payload twice.
async fn finalize_completed(
    state: &AppState,
    job: &QueuedDetection,
    alert_data: &geosentry::models::detection::AlertData,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut tx = state.db.begin().await?;

    let alert =
        alert_queries::create_alert(&mut *tx, job.aoi_id, &job.user_id, alert_data).await?;

    let claimed = job_queries::complete_job(&mut *tx, &job.job_id, alert.id).await?;
    if !claimed {
        // Already terminal: a previous finalize won. Drop everything.
        tx.rollback().await?;
        tracing::warn!(
            job_id = %job.job_id,
            "Job already finalized, discarding duplicate result"
        );
        return Ok(());
    }

    tx.commit().await?;

    tracing::info!(
        job_id = %job.job_id,
        alert_id = %alert.id,
        severity = %alert.severity,
        confidence = alert.confidence,
        "Job completed, alert persisted"
    );

    // Notification is independent of job/alert state: failures here are
    // logged inside the dispatcher and never unwind the detection result.
    match aoi_queries::get_aoi_owned(&state.db, job.aoi_id, &job.user_id).await? {
        Some(aoi) => {
            state.notifier.dispatch(&alert, &aoi).await;
        }
        None => {
            tracing::warn!(
                job_id = %job.job_id,
                aoi_id = %job.aoi_id,
                "AOI vanished before notification, skipping delivery"
            );
        }
    }

    Ok(())
}

/// Terminal transition for a failed run. No alert, no notification.
async fn finalize_failed(
    state: &AppState,
    job: &QueuedDetection,
    error: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let marked = job_queries::fail_job(&state.db, &job.job_id, error).await?;
    if !marked {
        tracing::warn!(
            job_id = %job.job_id,
            "Job already finalized, ignoring late failure"
        );
        return Ok(());
    }

    tracing::warn!(
        job_id = %job.job_id,
        aoi_id = %job.aoi_id,
        error = error,
        "Job failed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use metrics_exporter_prometheus::PrometheusBuilder;

    /// The worker's counters/histogram/gauge must reach an installed
    /// recorder and show up in the Prometheus exposition output.
    #[test]
    fn test_worker_metrics_export_through_recorder() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            metrics::counter!("detection_jobs_completed").increment(1);
            metrics::counter!("detection_jobs_failed").increment(1);
            metrics::histogram!("detection_processing_seconds").record(1.25);
            metrics::gauge!("detection_queue_depth").set(3.0);
        });

        let rendered = handle.render();
        assert!(rendered.contains("detection_jobs_completed"));
        assert!(rendered.contains("detection_jobs_failed"));
        assert!(rendered.contains("detection_processing_seconds"));
        assert!(rendered.contains("detection_queue_depth"));
    }
}
