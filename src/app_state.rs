use sqlx::PgPool;
use std::sync::Arc;

use crate::services::{
    engine::DetectionEngine, notify::NotificationDispatcher, queue::JobQueue,
};

/// Shared application state passed to all route handlers and the worker.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub queue: Arc<JobQueue>,
    pub engine: Arc<DetectionEngine>,
    pub notifier: Arc<NotificationDispatcher>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        queue: JobQueue,
        engine: DetectionEngine,
        notifier: NotificationDispatcher,
    ) -> Self {
        Self {
            db,
            queue: Arc::new(queue),
            engine: Arc::new(engine),
            notifier: Arc::new(notifier),
        }
    }
}
