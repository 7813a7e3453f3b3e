use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::browser::Launcher;
use crate::collectors::progress::{ProgressNotifier, StatusNotifier};
use crate::collectors::walker::{WalkOptions, Walker};
use crate::error::ScrapeError;
use crate::models::collection::Collection;
use crate::models::extraction_job::{ExtractionJob, JobState, ScrapeRequest};
use crate::models::job::JobRecord;
use crate::store::records::RecordSink;
use crate::store::status::JobStatusStore;

/// Produces records for one request. The browser-backed implementation owns a
/// fresh page per call.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(
        &self,
        request: &ScrapeRequest,
        notifier: &dyn ProgressNotifier,
    ) -> Result<Vec<JobRecord>, ScrapeError>;
}

pub struct BrowserExtractor<L: Launcher> {
    launcher: L,
    options: WalkOptions,
}

impl<L: Launcher> BrowserExtractor<L> {
    pub fn new(launcher: L, options: WalkOptions) -> Self {
        Self { launcher, options }
    }
}

#[async_trait]
impl<L: Launcher> Extractor for BrowserExtractor<L> {
    async fn extract(
        &self,
        request: &ScrapeRequest,
        notifier: &dyn ProgressNotifier,
    ) -> Result<Vec<JobRecord>, ScrapeError> {
        let page = self.launcher.launch().await?;
        let mut walker = Walker::new(&page)
            .with_notifier(notifier)
            .with_options(self.options);
        let result = walker
            .walk(
                &request.collection,
                request.limit,
                request.pages,
                request.details,
            )
            .await;
        tracing::debug!(
            "Walk stopped in {:?} after {} transitions",
            walker.state(),
            walker.trace().len()
        );
        result
    }
}

/// Validate a request without touching the browser.
pub fn validate(request: &ScrapeRequest) -> Result<Collection, ScrapeError> {
    let collection = request.collection.parse()?;
    if request.limit == 0 {
        return Err(ScrapeError::InvalidRequest("limit must be at least 1".into()));
    }
    if request.pages == 0 {
        return Err(ScrapeError::InvalidRequest("pages must be at least 1".into()));
    }
    Ok(collection)
}

/// Runs extraction jobs in the background and keeps their status current.
#[derive(Clone)]
pub struct JobRunner {
    store: Arc<dyn JobStatusStore>,
    sink: Arc<dyn RecordSink>,
    extractor: Arc<dyn Extractor>,
}

impl JobRunner {
    pub fn new(
        store: Arc<dyn JobStatusStore>,
        sink: Arc<dyn RecordSink>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        Self {
            store,
            sink,
            extractor,
        }
    }

    pub fn store(&self) -> &Arc<dyn JobStatusStore> {
        &self.store
    }

    pub fn persists_records(&self) -> bool {
        self.sink.is_persistent()
    }

    /// Register a pending job and start it on its own task.
    pub async fn submit(&self, request: ScrapeRequest) -> Result<ExtractionJob, ScrapeError> {
        let collection = validate(&request)?;
        let job = ExtractionJob::pending(collection.as_str());
        self.store.put(job.clone()).await;
        tracing::info!("Queued job {} for '{collection}'", job.id);

        let runner = self.clone();
        let id = job.id;
        tokio::spawn(async move { runner.run(id, request).await });

        Ok(job)
    }

    /// Drive one job to `completed` or `failed`.
    pub async fn run(&self, id: Uuid, request: ScrapeRequest) {
        self.update(id, |job| {
            job.set_state(JobState::Starting, "Initializing browser...")
        })
        .await;

        let notifier = StatusNotifier::new(Arc::clone(&self.store), id);
        match self.extractor.extract(&request, &notifier).await {
            Ok(records) => {
                let count = records.len();
                self.update(id, move |job| {
                    job.jobs_collected = count;
                    job.set_progress(format!("Saving {count} jobs to database..."), 95);
                })
                .await;

                let saved = match self.sink.upsert(&records, request.owner_id.as_deref()).await {
                    Ok(saved) => saved,
                    Err(e) => {
                        tracing::warn!("Failed to save jobs for job {id}: {e}");
                        false
                    }
                };
                let message = if saved {
                    "Completed"
                } else {
                    "Completed (DB save failed)"
                };

                tracing::info!("Job {id} completed: {count} jobs collected");
                self.update(id, move |job| job.complete(message)).await;
            }
            Err(e) => {
                let error = e.to_string();
                tracing::error!("Job {id} failed: {error}");
                self.update(id, move |job| job.fail(error)).await;
            }
        }
    }

    async fn update(&self, id: Uuid, change: impl FnOnce(&mut ExtractionJob) + Send + 'static) {
        if !self.store.update(id, Box::new(change)).await {
            tracing::warn!("Job {id} vanished from the status store");
        }
    }
}
