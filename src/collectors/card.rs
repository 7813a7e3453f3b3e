use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::browser::{BrowserError, Locator, Scope, Selector};
use crate::collectors::cascade::{first_present, first_text};
use crate::models::collection::Collection;
use crate::models::job::JobRecord;

const SITE_ORIGIN: &str = "https://www.linkedin.com";

/// List-item shapes, most specific first. The first shape present on the page
/// is the one the whole page is read with.
pub const CARDS: &[Selector] = &[
    Selector::css("[data-job-id]"),
    Selector::css(".job-card-container"),
    Selector::css(".jobs-job-board-list__item"),
    Selector::css(".scaffold-layout__list-item"),
    Selector::css("li.ember-view.occludable-update"),
];

const ID_LINKS: &[Selector] = &[
    Selector::css("a.job-card-container__link"),
    Selector::css("a[href*=\"/jobs/view/\"]"),
];

const TITLE: &[Selector] = &[
    Selector::css(".job-card-list__title"),
    Selector::css(".artdeco-entity-lockup__title"),
    Selector::css("a[class*=\"job-card\"] strong"),
    Selector::css(".job-card-container__link strong"),
    Selector::css("strong"),
    Selector::css("[class*=\"title\"]"),
];

const EMPLOYER: &[Selector] = &[
    Selector::css(".job-card-container__primary-description"),
    Selector::css(".artdeco-entity-lockup__subtitle"),
    Selector::css(".job-card-container__company-name"),
    Selector::css("[class*=\"company\"]"),
    Selector::css(".job-card-list__company-name"),
];

const LOCATION: &[Selector] = &[
    Selector::css(".job-card-container__metadata-item"),
    Selector::css(".artdeco-entity-lockup__caption"),
    Selector::css("[class*=\"location\"]"),
    Selector::css(".job-card-list__location"),
];

const POSTED: &[Selector] = &[Selector::css("time")];

const EMPLOYER_LINK: &[Selector] = &[Selector::css("a[href*=\"/company/\"]")];

const METADATA: Selector =
    Selector::css(".job-card-container__metadata-item, .artdeco-entity-lockup__metadata");

const EXPEDITED_APPLY_BADGES: &[Selector] = &[
    Selector::has_text("span", "Easy Apply"),
    Selector::css("[class*=\"easy-apply\"]"),
    Selector::css("[aria-label*=\"Easy Apply\"]"),
    Selector::css(".job-card-container__apply-method"),
];

/// Footer strip where the board labels sponsored cards.
const PROMOTED_REGIONS: &[Selector] = &[
    Selector::css(".job-card-list__footer-wrapper"),
    Selector::css(".job-card-container__footer-wrapper"),
];

const HIRING_REGIONS: &[Selector] = &[
    Selector::css(".job-card-list__footer-wrapper li"),
    Selector::css(".job-card-container__job-insight-text"),
];

const EMPLOYMENT_KEYWORDS: [&str; 5] = [
    "full-time",
    "part-time",
    "contract",
    "internship",
    "temporary",
];
const WORKPLACE_KEYWORDS: [&str; 3] = ["remote", "on-site", "hybrid"];
const ACTIVELY_HIRING_PHRASES: [&str; 2] = ["actively reviewing", "actively recruiting"];

static SITE: LazyLock<Url> =
    LazyLock::new(|| Url::parse(SITE_ORIGIN).expect("site origin is a valid URL"));

static VIEW_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/view/(\d+)").expect("view id pattern is valid"));

/// Every card on the page, read with the first list-item shape present.
pub async fn locate_cards<S: Scope>(scope: &S) -> Vec<S::Locator> {
    for shape in CARDS {
        match scope.locate(shape).all().await {
            Ok(cards) if !cards.is_empty() => return cards,
            Ok(_) => {}
            Err(e) => tracing::debug!("Card shape {shape} not applicable: {e}"),
        }
    }
    Vec::new()
}

/// Parse one rendered card. Cards without a resolvable id, and cards whose
/// markup fails outright, are skipped.
pub async fn parse_card<L: Locator>(card: &L, collection: Collection) -> Option<JobRecord> {
    match try_parse_card(card, collection).await {
        Ok(record) => record,
        Err(e) => {
            tracing::debug!("Skipping card: {e}");
            None
        }
    }
}

async fn try_parse_card<L: Locator>(
    card: &L,
    collection: Collection,
) -> Result<Option<JobRecord>, BrowserError> {
    let Some(id) = card_id(card).await? else {
        return Ok(None);
    };

    let mut record = JobRecord::new(id, collection);
    record.title = first_text(card, TITLE).await;
    record.employer = first_text(card, EMPLOYER).await;
    record.location = first_text(card, LOCATION).await;
    record.posted_time = first_text(card, POSTED).await;
    record.employer_url = employer_url(card).await;

    let (employment, workplace) = classify_metadata(card).await;
    record.employment_type = employment;
    record.workplace_type = workplace;

    let text = match card.inner_text().await {
        Ok(text) => text.to_lowercase(),
        Err(e) => {
            tracing::debug!("Card {} text unreadable, flags from badges only: {e}", record.id);
            String::new()
        }
    };
    record.is_promoted = match first_text(card, PROMOTED_REGIONS).await {
        Some(footer) => footer.to_lowercase().contains("promoted"),
        None => text.contains("promoted"),
    };
    record.supports_expedited_apply =
        text.contains("easy apply") || first_present(card, EXPEDITED_APPLY_BADGES).await.is_some();
    record.is_actively_hiring = mentions_active_hiring(&text) || active_hiring_badge(card).await;

    Ok(Some(record))
}

/// Structured id attribute first, else the digits of a `/view/<id>` link.
pub async fn card_id<L: Locator>(card: &L) -> Result<Option<String>, BrowserError> {
    if let Some(id) = card.attribute("data-job-id").await?
        && !id.trim().is_empty()
    {
        return Ok(Some(id.trim().to_string()));
    }

    for candidate in ID_LINKS {
        let link = card.locate(candidate).first();
        if link.count().await.unwrap_or(0) == 0 {
            continue;
        }
        if let Ok(Some(href)) = link.attribute("href").await
            && let Some(caps) = VIEW_ID.captures(&href)
        {
            return Ok(Some(caps[1].to_string()));
        }
    }
    Ok(None)
}

async fn employer_url<L: Locator>(card: &L) -> Option<String> {
    let link = first_present(card, EMPLOYER_LINK).await?;
    match link.attribute("href").await {
        Ok(Some(href)) if !href.trim().is_empty() => absolute_url(href.trim()).map(String::from),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("Employer link unreadable: {e}");
            None
        }
    }
}

/// Employment and workplace type from the card's metadata fragments. Each
/// fragment is tested for employment keywords before workplace keywords, and
/// each category keeps its first hit.
async fn classify_metadata<L: Locator>(card: &L) -> (Option<String>, Option<String>) {
    let mut employment = None;
    let mut workplace = None;

    let fragments = match card.locate(&METADATA).all().await {
        Ok(fragments) => fragments,
        Err(e) => {
            tracing::debug!("Metadata unreadable: {e}");
            return (None, None);
        }
    };

    for fragment in fragments {
        let Ok(text) = fragment.inner_text().await else {
            continue;
        };
        let text = text.trim();
        let lower = text.to_lowercase();
        if EMPLOYMENT_KEYWORDS.iter().any(|k| lower.contains(k)) {
            if employment.is_none() {
                employment = Some(text.to_string());
            }
        } else if WORKPLACE_KEYWORDS.iter().any(|k| lower.contains(k)) && workplace.is_none() {
            workplace = Some(text.to_string());
        }
    }

    (employment, workplace)
}

fn mentions_active_hiring(lower: &str) -> bool {
    ACTIVELY_HIRING_PHRASES.iter().any(|p| lower.contains(p))
}

async fn active_hiring_badge<L: Locator>(card: &L) -> bool {
    for region in HIRING_REGIONS {
        if let Some(text) = first_text(card, std::slice::from_ref(region)).await
            && mentions_active_hiring(&text.to_lowercase())
        {
            return true;
        }
    }
    false
}

/// Resolve `href` against the site origin. In-page fragments are dropped.
pub fn absolute_url(href: &str) -> Option<Url> {
    match SITE.join(href) {
        Ok(mut url) => {
            url.set_fragment(None);
            Some(url)
        }
        Err(e) => {
            tracing::debug!("Unresolvable link {href}: {e}");
            None
        }
    }
}
