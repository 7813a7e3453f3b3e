use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::ScrapeError;
use crate::models::extraction_job::JobState;
use crate::models::job::JobRecord;
use crate::store::status::JobStatusStore;

/// Checkpoint hooks the walker calls as it goes. Every hook defaults to doing
/// nothing, so implementors only override what they care about.
#[async_trait]
pub trait ProgressNotifier: Send + Sync {
    async fn on_start(&self, _kind: &str, _url: &str) {}

    async fn on_progress(&self, _message: &str, _percent: u8) {}

    async fn on_complete(&self, _kind: &str, _records: &[JobRecord]) {}

    async fn on_error(&self, _error: &ScrapeError) {}
}

/// Default notifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl ProgressNotifier for SilentNotifier {}

/// Logs each checkpoint; used by the one-off CLI scrape.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

#[async_trait]
impl ProgressNotifier for ConsoleNotifier {
    async fn on_start(&self, kind: &str, url: &str) {
        tracing::info!("Starting {kind} at {url}");
    }

    async fn on_progress(&self, message: &str, percent: u8) {
        tracing::info!("[{percent:>3}%] {message}");
    }

    async fn on_complete(&self, kind: &str, records: &[JobRecord]) {
        tracing::info!("Finished {kind}: {} jobs", records.len());
    }

    async fn on_error(&self, error: &ScrapeError) {
        tracing::error!("Scrape failed: {error}");
    }
}

/// Mirrors checkpoints into the job status store for API polling.
pub struct StatusNotifier {
    store: Arc<dyn JobStatusStore>,
    job_id: Uuid,
}

impl StatusNotifier {
    pub fn new(store: Arc<dyn JobStatusStore>, job_id: Uuid) -> Self {
        Self { store, job_id }
    }
}

#[async_trait]
impl ProgressNotifier for StatusNotifier {
    async fn on_start(&self, kind: &str, _url: &str) {
        let message = format!("Running {kind}");
        self.store
            .update(
                self.job_id,
                Box::new(move |job| job.set_state(JobState::Running, message)),
            )
            .await;
    }

    async fn on_progress(&self, message: &str, percent: u8) {
        let message = message.to_string();
        self.store
            .update(
                self.job_id,
                Box::new(move |job| job.set_progress(message, percent)),
            )
            .await;
    }
}
