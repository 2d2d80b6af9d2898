mod app_state;
mod config;
mod db;
mod models;
mod routes;
mod services;

use axum::{routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use app_state::AppState;
use config::AppConfig;
use services::{
    engine::DetectionEngine,
    notify::{EmailChannel, NotificationChannel, NotificationDispatcher, WebhookChannel},
    queue::JobQueue,
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing geosentry server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_histogram!(
        "detection_processing_seconds",
        "Time from dequeue to terminal job state"
    );
    metrics::describe_counter!("detection_jobs_total", "Total detection jobs submitted");
    metrics::describe_counter!("detection_jobs_completed", "Total detection jobs completed");
    metrics::describe_counter!("detection_jobs_failed", "Total detection jobs that failed");
    metrics::describe_gauge!(
        "detection_queue_depth",
        "Current number of pending jobs in the queue"
    );

    // Initialize database connection pool
    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run database migrations
    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    // Initialize Redis job queue
    tracing::info!("Connecting to Redis job queue");
    let queue = JobQueue::new(&config.redis_url).expect("Failed to initialize job queue");

    // Detection engine handle (the API only writes input artifacts;
    // invocation happens in the worker)
    let engine = DetectionEngine::new(
        &config.engine_command,
        &config.engine_workspace,
        config.engine_debug,
    );

    // Notification channels, primary first
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

    // Create shared application state
    let state = AppState::new(db_pool, queue, engine, notifier);

    // Build API routes
    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route(
            "/api/v1/aois/{aoi_id}/monitor",
            post(routes::monitor::submit_monitoring),
        )
        .route("/api/v1/jobs/{job_id}", get(routes::monitor::get_job_status))
        .route(
            "/api/v1/aois/{aoi_id}/activity",
            get(routes::monitor::get_recent_activity),
        )
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(1024 * 1024)); // 1 MB limit

    tracing::info!("Starting geosentry on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
