use std::time::Duration;

use crate::browser::{BrowserError, Locator, Page, Selector};

pub const ITEM_HYDRATE_DELAY: Duration = Duration::from_millis(150);
pub const SETTLE_DELAY: Duration = Duration::from_secs(1);
pub const FALLBACK_SCROLLS: usize = 5;
pub const FALLBACK_SCROLL_DELAY: Duration = Duration::from_millis(500);

const LIST_ITEM: &str = ".scaffold-layout__list-item";
const LIST: &str = ".scaffold-layout__list";
const POPULATED: Selector = Selector::css("[data-job-id]");

/// Bring each list placeholder into view so the virtualized list fills it in,
/// then return to the top.
fn hydrate_script() -> String {
    format!(
        r#"const sleep = ms => new Promise(resolve => setTimeout(resolve, ms));
const items = document.querySelectorAll('{LIST_ITEM}');
if (!items.length) throw new Error('no list items');
for (const item of items) {{
    item.scrollIntoView({{ behavior: 'instant', block: 'center' }});
    await sleep({pause});
}}
const list = document.querySelector('{LIST}');
if (list) list.scrollTop = 0;
window.scrollTo(0, 0);
return items.length;"#,
        pause = ITEM_HYDRATE_DELAY.as_millis(),
    )
}

const SCROLL_TO_END_JS: &str = r#"const list = document.querySelector('.scaffold-layout__list');
if (list) list.scrollTop = list.scrollHeight;
window.scrollTo(0, document.body.scrollHeight);
return null;"#;

/// Materialize every addressable card on the current page. Best-effort: when
/// the per-item pass fails, a blunt scroll-to-end loop runs instead, and
/// nothing is ever reported to the caller.
pub async fn populate<P: Page>(page: &P) {
    match hydrate(page).await {
        Ok(populated) => tracing::info!("Loaded {populated} job cards on current page"),
        Err(e) => {
            tracing::warn!("Error loading jobs on page: {e}");
            fallback_scroll(page).await;
        }
    }
}

async fn hydrate<P: Page>(page: &P) -> Result<usize, BrowserError> {
    page.evaluate(&hydrate_script()).await?;
    tokio::time::sleep(SETTLE_DELAY).await;
    page.locate(&POPULATED).count().await
}

/// Jump to the end of the scrollable area a fixed number of times.
pub async fn fallback_scroll<P: Page>(page: &P) {
    for _ in 0..FALLBACK_SCROLLS {
        if let Err(e) = page.evaluate(SCROLL_TO_END_JS).await {
            tracing::debug!("Fallback scroll error: {e}");
            return;
        }
        tokio::time::sleep(FALLBACK_SCROLL_DELAY).await;
    }
}
