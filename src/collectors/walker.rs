use std::collections::HashSet;
use std::time::Duration;

use crate::browser::{Locator, Page, Selector};
use crate::collectors::card::{locate_cards, parse_card};
use crate::collectors::detail::DetailExpander;
use crate::collectors::populate::{fallback_scroll, populate};
use crate::collectors::progress::{ProgressNotifier, SilentNotifier};
use crate::error::ScrapeError;
use crate::models::collection::Collection;
use crate::models::job::JobRecord;

pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_millis(15_000);
pub const READY_FALLBACK_DELAY: Duration = Duration::from_secs(2);
pub const MAX_STALE_ATTEMPTS: usize = 5;
pub const STALE_ATTEMPT_DELAY: Duration = Duration::from_millis(500);
pub const PAGE_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Markers that the list has rendered, tried in order with a share of the
/// readiness budget each.
const LIST_READY: &[Selector] = &[
    Selector::css(".scaffold-layout__list-container"),
    Selector::css(".jobs-search-results-list"),
    Selector::css("[data-job-id]"),
    Selector::css(".job-card-container"),
    Selector::css(".jobs-job-board-list__item"),
];

const NEXT_PAGE: &[Selector] = &[
    Selector::css("button[aria-label=\"View next page\"]"),
    Selector::css("button[aria-label=\"Next\"]"),
    Selector::css(".artdeco-pagination__button--next"),
    Selector::css("li.artdeco-pagination__indicator--number.selected + li button"),
    Selector::css(
        "[data-test-pagination-page-btn].artdeco-pagination__indicator--number.selected ~ li button",
    ),
];

const LOAD_MORE: &[Selector] = &[
    Selector::has_text("button", "See more jobs"),
    Selector::has_text("button", "Show more"),
    Selector::has_text("a", "See more jobs"),
];

/// Where a walk currently is. Transitions are recorded in order so a run can
/// be checked step by step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkState {
    NotStarted,
    Navigated,
    PageReady,
    Extracting,
    ExpandingDetails,
    PaginatingNext,
    Done,
    Finished,
}

#[derive(Debug, Clone, Copy)]
pub struct WalkOptions {
    /// Total budget for the list readiness wait, split across the markers.
    pub ready_timeout: Duration,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            ready_timeout: DEFAULT_READY_TIMEOUT,
        }
    }
}

/// Drives one collection walk over a page it has exclusive use of.
pub struct Walker<'p, P: Page> {
    page: &'p P,
    notifier: &'p dyn ProgressNotifier,
    options: WalkOptions,
    state: WalkState,
    trace: Vec<WalkState>,
}

impl<'p, P: Page> Walker<'p, P> {
    pub fn new(page: &'p P) -> Self {
        Self {
            page,
            notifier: &SilentNotifier,
            options: WalkOptions::default(),
            state: WalkState::NotStarted,
            trace: Vec::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: &'p dyn ProgressNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_options(mut self, options: WalkOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> WalkState {
        self.state
    }

    /// Every state entered so far, in order.
    pub fn trace(&self) -> &[WalkState] {
        &self.trace
    }

    /// Walk `collection` and return up to `limit` records in extraction order.
    ///
    /// Fails before any navigation when the collection token is unknown or a
    /// bound is zero. Once running, only a failure of the walk itself (such as
    /// the initial navigation) is returned; per-card and per-record problems
    /// are absorbed.
    pub async fn walk(
        &mut self,
        collection: &str,
        limit: usize,
        max_pages: usize,
        fetch_details: bool,
    ) -> Result<Vec<JobRecord>, ScrapeError> {
        match self.run(collection, limit, max_pages, fetch_details).await {
            Ok(records) => Ok(records),
            Err(e) => {
                self.notifier.on_error(&e).await;
                Err(e)
            }
        }
    }

    async fn run(
        &mut self,
        collection: &str,
        limit: usize,
        max_pages: usize,
        fetch_details: bool,
    ) -> Result<Vec<JobRecord>, ScrapeError> {
        let collection: Collection = collection.parse()?;
        if limit == 0 {
            return Err(ScrapeError::InvalidRequest("limit must be at least 1".into()));
        }
        if max_pages == 0 {
            return Err(ScrapeError::InvalidRequest("pages must be at least 1".into()));
        }

        let kind = format!("JobCollection:{collection}");
        let url = collection.url();
        tracing::info!(
            "Starting '{collection}' jobs scraping (limit={limit}, pages={max_pages}, details={fetch_details})"
        );

        self.page.navigate(&url).await?;
        self.enter(WalkState::Navigated);
        self.notifier.on_start(&kind, &url).await;
        self.notifier
            .on_progress(&format!("Navigated to {collection} jobs page"), 10)
            .await;

        let mut records: Vec<JobRecord> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut current_page = 1;

        loop {
            tracing::info!("Processing page {current_page}...");
            self.wait_until_ready().await;
            self.enter(WalkState::PageReady);

            self.enter(WalkState::Extracting);
            let mut fresh = self
                .extract_page(collection, limit - records.len(), &mut seen)
                .await;
            if fresh.is_empty() {
                tracing::info!("No more jobs found on this page");
                break;
            }

            if fetch_details {
                self.enter(WalkState::ExpandingDetails);
                self.expand_details(&mut fresh).await;
            }

            records.extend(fresh);
            tracing::info!("Page {current_page}: total {} jobs", records.len());
            let percent = (20 + current_page * 15).min(90) as u8;
            self.notifier
                .on_progress(
                    &format!("Page {current_page}: {} jobs collected", records.len()),
                    percent,
                )
                .await;

            if records.len() >= limit || current_page >= max_pages {
                break;
            }

            self.enter(WalkState::PaginatingNext);
            if !self.advance().await {
                tracing::info!("No more pages available");
                break;
            }
            current_page += 1;
        }

        self.enter(WalkState::Done);
        records.truncate(limit);

        self.notifier.on_progress("Scraping complete", 100).await;
        self.notifier.on_complete(&kind, &records).await;
        self.enter(WalkState::Finished);

        tracing::info!(
            "Successfully scraped {} {collection} jobs from {current_page} page(s)",
            records.len()
        );
        Ok(records)
    }

    fn enter(&mut self, state: WalkState) {
        tracing::debug!("Walk state {:?} -> {state:?}", self.state);
        self.state = state;
        self.trace.push(state);
    }

    /// Wait for any list marker. Never fails: on a total timeout the walk
    /// carries on with whatever has rendered.
    async fn wait_until_ready(&self) {
        let share = self.options.ready_timeout / LIST_READY.len() as u32;
        for marker in LIST_READY {
            if self.page.wait_for(marker, share).await.is_ok() {
                return;
            }
        }
        tracing::warn!("Job list did not appear, continuing with what has loaded");
        tokio::time::sleep(READY_FALLBACK_DELAY).await;
    }

    /// Collect up to `quota` unseen records from the current page. Re-reads the
    /// cards until the quota is met or several passes in a row add nothing.
    async fn extract_page(
        &self,
        collection: Collection,
        quota: usize,
        seen: &mut HashSet<String>,
    ) -> Vec<JobRecord> {
        populate(self.page).await;

        let mut found = Vec::new();
        let mut stale = 0;
        while found.len() < quota && stale < MAX_STALE_ATTEMPTS {
            let before = found.len();
            for card in locate_cards(self.page).await {
                if found.len() >= quota {
                    break;
                }
                if let Some(record) = parse_card(&card, collection).await
                    && seen.insert(record.id.clone())
                {
                    found.push(record);
                }
            }

            if found.len() == before {
                stale += 1;
                fallback_scroll(self.page).await;
                tokio::time::sleep(STALE_ATTEMPT_DELAY).await;
            } else {
                stale = 0;
            }
        }
        found
    }

    /// One record at a time: every expansion navigates the shared page.
    async fn expand_details(&self, records: &mut [JobRecord]) {
        tracing::info!("Fetching details for {} jobs...", records.len());
        let expander = DetailExpander::new(self.page);
        for record in records.iter_mut() {
            match expander.expand(&record.id).await {
                Some(details) => record.apply_details(details),
                None => tracing::debug!("No details for job {}", record.id),
            }
        }
    }

    /// Click the first usable next-page control, else the first load-more
    /// control. False when neither exists.
    async fn advance(&self) -> bool {
        for candidate in NEXT_PAGE.iter().chain(LOAD_MORE) {
            let control = self.page.locate(candidate).first();
            if control.count().await.unwrap_or(0) == 0 {
                continue;
            }
            if let Ok(Some(_)) = control.attribute("disabled").await {
                tracing::debug!("Control {candidate} is disabled");
                continue;
            }
            match control.click().await {
                Ok(()) => {
                    tokio::time::sleep(PAGE_SETTLE_DELAY).await;
                    return true;
                }
                Err(e) => tracing::debug!("Could not click {candidate}: {e}"),
            }
        }
        false
    }
}
