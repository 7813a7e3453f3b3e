use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What to walk and how far. Field names follow the API payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScrapeRequest {
    pub collection: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_pages")]
    pub pages: usize,
    #[serde(default)]
    pub details: bool,
    pub owner_id: Option<String>,
}

fn default_limit() -> usize {
    10
}

fn default_pages() -> usize {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Starting,
    Running,
    Completed,
    Failed,
}

/// Lifecycle record for one background extraction, as reported by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionJob {
    pub id: Uuid,
    #[serde(rename = "status")]
    pub state: JobState,
    pub collection: String,
    pub progress: u8,
    pub message: Option<String>,
    pub jobs_collected: usize,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExtractionJob {
    pub fn pending(collection: impl Into<String>) -> Self {
        let now = Utc::now();
        ExtractionJob {
            id: Uuid::new_v4(),
            state: JobState::Pending,
            collection: collection.into(),
            progress: 0,
            message: Some("Job queued".to_string()),
            jobs_collected: 0,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_state(&mut self, state: JobState, message: impl Into<String>) {
        self.state = state;
        self.message = Some(message.into());
        self.touch();
    }

    /// Record a progress checkpoint. Progress is clamped to 100.
    pub fn set_progress(&mut self, message: impl Into<String>, percent: u8) {
        self.progress = percent.min(100);
        self.message = Some(message.into());
        self.touch();
    }

    pub fn complete(&mut self, message: impl Into<String>) {
        self.state = JobState::Completed;
        self.progress = 100;
        self.message = Some(message.into());
        self.touch();
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.state = JobState::Failed;
        self.error = Some(error.into());
        self.message = Some("Failed".to_string());
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
