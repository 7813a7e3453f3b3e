use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::browser::{BrowserError, Locator, Page, Selector};
use crate::collectors::card::absolute_url;
use crate::collectors::cascade::{Cascade, first_present, first_text};
use crate::models::job::{HiringTeamMember, JobDetails, MatchAnalysis};

pub const OPEN_SETTLE_DELAY: Duration = Duration::from_secs(3);
pub const MATCH_POLL_ROUNDS: usize = 6;
pub const MATCH_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const MATCH_RENDER_DELAY: Duration = Duration::from_secs(4);

const DESCRIPTION: &[Selector] = &[
    Selector::css("#job-details"),
    Selector::css(".jobs-description__content"),
    Selector::css(".jobs-description-content__text"),
    Selector::css(".jobs-box__html-content"),
    Selector::css("article.jobs-description__container"),
];
const DESCRIPTION_HEADER: &str = "About the job";

const HIRER_CARDS: Selector = Selector::css(
    ".hirer-card__hirer-information, \
     .job-details-people-who-can-help__section .display-flex.align-items-center",
);
const HIRER_NAME: &[Selector] = &[
    Selector::css(".jobs-poster__name strong"),
    Selector::css("[class*=\"name\"] strong"),
];
const PROFILE_LINK: &[Selector] = &[Selector::css("a[href*=\"/in/\"]")];
const HIRER_TITLE: &[Selector] = &[
    Selector::css(".linked-area .text-body-small"),
    Selector::css(".hirer-card__job-poster"),
    Selector::css("[class*=\"subtitle\"]"),
];
const JOB_POSTER: &str = "job poster";
const CONNECTION_DEGREE: &[Selector] = &[
    Selector::css(".hirer-card__connection-degree"),
    Selector::css("[class*=\"connection-degree\"]"),
];

const MATCH_BUTTONS: &[Selector] = &[
    Selector::css("button[aria-label=\"Show match details\"]"),
    Selector::has_text("button", "Show match details"),
    Selector::has_text("a", "Show match details"),
    Selector::css("a[aria-label=\"Show match details\"]"),
    Selector::css(".coach-shared-hscroll-button__action--guide-prompt"),
];
const MATCH_PANEL: &[Selector] = &[
    Selector::css(".coach-message-ai-response"),
    Selector::css(".coach-message__text"),
    Selector::css("[data-coach-message-item]"),
    Selector::css(".coach-message-list__scroller"),
];

static MUTUAL_CONNECTIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*mutual\s*connections?").expect("mutual connections pattern is valid")
});

/// Opens a record's detail panel on the shared page and reads the fields that
/// only exist there. Each of the three reads fails on its own.
pub struct DetailExpander<'p, P: Page> {
    page: &'p P,
}

impl<'p, P: Page> DetailExpander<'p, P> {
    pub fn new(page: &'p P) -> Self {
        Self { page }
    }

    /// `None` when the record's detail view cannot be opened at all.
    pub async fn expand(&self, id: &str) -> Option<JobDetails> {
        if let Err(e) = self.open(id).await {
            tracing::debug!("Could not open details for job {id}: {e}");
            return None;
        }

        Some(JobDetails {
            description: self.description().await,
            hiring_team: self.hiring_team().await,
            match_analysis: self.match_analysis().await,
        })
    }

    async fn open(&self, id: &str) -> Result<(), BrowserError> {
        let candidates = [
            Selector::dynamic(format!("[data-job-id=\"{id}\"]")),
            Selector::dynamic(format!("a[href*=\"/jobs/view/{id}\"]")),
        ];
        let card = first_present(self.page, &candidates)
            .await
            .ok_or_else(|| BrowserError::NotFound(format!("job card {id}")))?;

        card.click().await?;
        tokio::time::sleep(OPEN_SETTLE_DELAY).await;
        Ok(())
    }

    pub async fn description(&self) -> Option<String> {
        Cascade::new(DESCRIPTION)
            .strip_prefix(DESCRIPTION_HEADER)
            .extract(self.page)
            .await
    }

    /// Members without a resolvable name are dropped. `None` when nobody is left.
    pub async fn hiring_team(&self) -> Option<Vec<HiringTeamMember>> {
        let cards = match self.page.locate(&HIRER_CARDS).all().await {
            Ok(cards) => cards,
            Err(e) => {
                tracing::debug!("Error extracting hiring team: {e}");
                return None;
            }
        };

        let mut team = Vec::new();
        for card in &cards {
            if let Some(member) = hiring_team_member(card).await {
                team.push(member);
            }
        }

        (!team.is_empty()).then_some(team)
    }

    /// Premium-gated panel. Absent when the affordance never shows up or the
    /// generated response cannot be found.
    pub async fn match_analysis(&self) -> Option<MatchAnalysis> {
        let Some(button) = self.poll_match_button().await else {
            tracing::debug!("Match details button not found");
            return None;
        };

        if let Err(e) = button.click().await {
            tracing::debug!("Could not open match details: {e}");
            return None;
        }
        tokio::time::sleep(MATCH_RENDER_DELAY).await;

        let Some(text) = first_text(self.page, MATCH_PANEL).await else {
            tracing::debug!("Match analysis element not found after click");
            return None;
        };
        MatchAnalysis::parse(&text)
    }

    async fn poll_match_button(&self) -> Option<P::Locator> {
        for round in 0..MATCH_POLL_ROUNDS {
            for candidate in MATCH_BUTTONS {
                let button = self.page.locate(candidate).first();
                if button.count().await.unwrap_or(0) > 0
                    && button.is_visible().await.unwrap_or(false)
                {
                    return Some(button);
                }
            }
            if round + 1 < MATCH_POLL_ROUNDS {
                tokio::time::sleep(MATCH_POLL_INTERVAL).await;
            }
        }
        None
    }
}

/// `None` only when no name resolves. Other fields degrade to absent.
async fn hiring_team_member<L: Locator>(card: &L) -> Option<HiringTeamMember> {
    let name = match first_text(card, HIRER_NAME).await {
        Some(name) => Some(name),
        None => first_text(card, PROFILE_LINK)
            .await
            .and_then(|text| text.lines().next().map(|line| line.trim().to_string()))
            .filter(|line| !line.is_empty()),
    };
    let Some(name) = name else {
        tracing::debug!("Skipping hirer card without a name");
        return None;
    };

    let text = card.inner_text().await.unwrap_or_else(|e| {
        tracing::debug!("Hirer card text unreadable for {name}: {e}");
        String::new()
    });
    let lower = text.to_lowercase();

    Some(HiringTeamMember {
        name,
        profile_url: profile_url(card).await,
        title: Cascade::new(HIRER_TITLE).reject(JOB_POSTER).extract(card).await,
        connection_degree: first_text(card, CONNECTION_DEGREE).await,
        is_job_poster: lower.contains(JOB_POSTER),
        mutual_connections: MUTUAL_CONNECTIONS
            .captures(&text)
            .map(|caps| caps[1].to_string()),
    })
}

/// Absolute profile address without tracking parameters.
async fn profile_url<L: Locator>(card: &L) -> Option<String> {
    let link = first_present(card, PROFILE_LINK).await?;
    let href = link.attribute("href").await.ok().flatten()?;
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let mut url = absolute_url(href)?;
    url.set_query(None);
    Some(url.into())
}
