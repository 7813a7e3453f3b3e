use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::extraction_job::ExtractionJob;

pub type JobUpdate = Box<dyn FnOnce(&mut ExtractionJob) + Send>;

/// Where extraction job lifecycle records live between submission and polling.
#[async_trait]
pub trait JobStatusStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Option<ExtractionJob>;

    async fn put(&self, job: ExtractionJob);

    /// Apply `change` to the stored job. Returns false if the id is unknown.
    async fn update(&self, id: Uuid, change: JobUpdate) -> bool;
}

/// Process-local store. Jobs are kept until the process exits.
#[derive(Debug, Default)]
pub struct InMemoryStatusStore {
    jobs: RwLock<HashMap<Uuid, ExtractionJob>>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStatusStore for InMemoryStatusStore {
    async fn get(&self, id: Uuid) -> Option<ExtractionJob> {
        self.jobs.read().await.get(&id).cloned()
    }

    async fn put(&self, job: ExtractionJob) {
        self.jobs.write().await.insert(job.id, job);
    }

    async fn update(&self, id: Uuid, change: JobUpdate) -> bool {
        match self.jobs.write().await.get_mut(&id) {
            Some(job) => {
                change(job);
                true
            }
            None => false,
        }
    }
}
