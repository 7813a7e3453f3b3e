//! Static HTML stand-in for a browser tab.
//!
//! A site is a list of list-page fragments plus detail-panel fragments keyed by
//! job id. Elements carry `data-fixture-action` to script what a click does:
//! `page:N` swaps in list page N, `detail:ID` opens that record's detail panel,
//! `reveal:NAME` appends a named fragment. Selectors listed as broken fail
//! every resolution, which stands in for markup that throws mid-extraction.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Node};
use serde_json::Value;

use crate::browser::{BrowserError, Launcher, Locator, LocatorChain, Page, Scope, Selector};

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "br", "div", "dl", "dt", "dd", "footer", "form", "h1", "h2",
    "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section",
    "table", "tr", "ul",
];

#[derive(Debug, Clone, Default)]
pub struct FixtureSite {
    pages: Vec<String>,
    details: HashMap<String, String>,
    reveals: HashMap<String, String>,
    broken: HashSet<String>,
    failing_scripts: bool,
}

impl FixtureSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, html: impl Into<String>) -> Self {
        self.pages.push(html.into());
        self
    }

    pub fn detail(mut self, id: &str, html: impl Into<String>) -> Self {
        self.details.insert(id.to_string(), html.into());
        self
    }

    pub fn reveal(mut self, name: &str, html: impl Into<String>) -> Self {
        self.reveals.insert(name.to_string(), html.into());
        self
    }

    pub fn broken(mut self, css: &str) -> Self {
        self.broken.insert(css.to_string());
        self
    }

    pub fn failing_scripts(mut self) -> Self {
        self.failing_scripts = true;
        self
    }
}

#[derive(Debug, Default)]
struct FixtureState {
    page: usize,
    detail: Option<String>,
    revealed: Vec<String>,
    navigations: Vec<String>,
    clicks: Vec<String>,
    scripts: Vec<String>,
}

#[derive(Clone)]
pub struct FixturePage {
    site: Arc<FixtureSite>,
    state: Arc<Mutex<FixtureState>>,
}

#[derive(Clone)]
pub struct FixtureLocator {
    page: FixturePage,
    chain: LocatorChain,
}

impl FixturePage {
    pub fn new(site: FixtureSite) -> Self {
        Self {
            site: Arc::new(site),
            state: Arc::new(Mutex::new(FixtureState::default())),
        }
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.state.lock().unwrap().scripts.clone()
    }

    pub fn current_page(&self) -> usize {
        self.state.lock().unwrap().page
    }

    fn document(&self) -> String {
        let state = self.state.lock().unwrap();
        let mut body = self.site.pages.get(state.page).cloned().unwrap_or_default();
        if let Some(detail) = &state.detail {
            body.push_str(detail);
        }
        for name in &state.revealed {
            if let Some(fragment) = self.site.reveals.get(name) {
                body.push_str(fragment);
            }
        }
        format!("<html><body>{body}</body></html>")
    }

    /// Resolve `chain` against the current document and hand the matches to `op`.
    fn with_matches<T>(
        &self,
        chain: &LocatorChain,
        op: impl for<'h> FnOnce(Vec<ElementRef<'h>>) -> Result<T, BrowserError>,
    ) -> Result<T, BrowserError> {
        let html = Html::parse_document(&self.document());
        let mut current = vec![html.root_element()];

        for step in chain.steps() {
            let css = step.selector.css_str();
            if self.site.broken.contains(css) {
                return Err(BrowserError::Script(format!("fixture: broken selector {css}")));
            }
            let parsed = scraper::Selector::parse(css)
                .map_err(|_| BrowserError::Script(format!("fixture: invalid selector {css}")))?;

            let mut seen = HashSet::new();
            let mut matched = Vec::new();
            for scope in &current {
                for el in scope.select(&parsed) {
                    if seen.insert(el.id()) {
                        matched.push(el);
                    }
                }
            }

            if let Some(text) = step.selector.text_filter() {
                let needle = text.to_lowercase();
                matched.retain(|el| rendered_text(*el).to_lowercase().contains(&needle));
            }
            if let Some(n) = step.nth {
                matched = matched.into_iter().nth(n).into_iter().collect();
            }
            current = matched;
        }

        op(current)
    }

    fn apply_action(&self, action: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(page) = action.strip_prefix("page:") {
            if let Ok(index) = page.parse() {
                state.page = index;
                state.detail = None;
                state.revealed.clear();
            }
        } else if let Some(id) = action.strip_prefix("detail:") {
            state.detail = self.site.details.get(id).cloned();
            state.revealed.clear();
        } else if let Some(name) = action.strip_prefix("reveal:") {
            state.revealed.push(name.to_string());
        }
    }
}

impl Scope for FixturePage {
    type Locator = FixtureLocator;

    fn locate(&self, selector: &Selector) -> FixtureLocator {
        FixtureLocator {
            page: self.clone(),
            chain: LocatorChain::root(selector),
        }
    }
}

#[async_trait]
impl Page for FixturePage {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let mut state = self.state.lock().unwrap();
        state.navigations.push(url.to_string());
        state.page = 0;
        state.detail = None;
        state.revealed.clear();
        Ok(())
    }

    async fn wait_for(&self, selector: &Selector, timeout: Duration) -> Result<(), BrowserError> {
        if self.locate(selector).count().await? > 0 {
            return Ok(());
        }
        tokio::time::sleep(timeout).await;
        Err(BrowserError::Timeout(selector.to_string()))
    }

    async fn evaluate(&self, script: &str) -> Result<Value, BrowserError> {
        self.state.lock().unwrap().scripts.push(script.to_string());
        if self.site.failing_scripts {
            return Err(BrowserError::Script("fixture: scripts disabled".to_string()));
        }
        Ok(Value::Null)
    }
}

impl Scope for FixtureLocator {
    type Locator = FixtureLocator;

    fn locate(&self, selector: &Selector) -> FixtureLocator {
        FixtureLocator {
            page: self.page.clone(),
            chain: self.chain.child(selector),
        }
    }
}

impl FixtureLocator {
    fn with_first<T>(
        &self,
        op: impl for<'h> FnOnce(ElementRef<'h>) -> Result<T, BrowserError>,
    ) -> Result<T, BrowserError> {
        let chain = self.chain.to_string();
        self.page.with_matches(&self.chain, |matches| {
            let first = matches
                .into_iter()
                .next()
                .ok_or(BrowserError::NotFound(chain))?;
            op(first)
        })
    }
}

#[async_trait]
impl Locator for FixtureLocator {
    fn first(&self) -> Self {
        FixtureLocator {
            page: self.page.clone(),
            chain: self.chain.nth(0),
        }
    }

    async fn count(&self) -> Result<usize, BrowserError> {
        self.page.with_matches(&self.chain, |matches| Ok(matches.len()))
    }

    async fn all(&self) -> Result<Vec<Self>, BrowserError> {
        let count = self.count().await?;
        Ok((0..count)
            .map(|i| FixtureLocator {
                page: self.page.clone(),
                chain: self.chain.nth(i),
            })
            .collect())
    }

    async fn click(&self) -> Result<(), BrowserError> {
        let chain = self.chain.to_string();
        let action = self.with_first(|el| {
            if el.value().attr("disabled").is_some() {
                return Err(BrowserError::NotInteractable(chain.clone()));
            }
            Ok(el.value().attr("data-fixture-action").map(String::from))
        })?;

        self.page.state.lock().unwrap().clicks.push(chain);
        if let Some(action) = action {
            self.page.apply_action(&action);
        }
        Ok(())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, BrowserError> {
        self.with_first(|el| Ok(el.value().attr(name).map(String::from)))
    }

    async fn inner_text(&self) -> Result<String, BrowserError> {
        self.with_first(|el| Ok(rendered_text(el)))
    }

    async fn is_visible(&self) -> Result<bool, BrowserError> {
        self.with_first(|el| {
            let hidden = std::iter::once(el)
                .chain(el.ancestors().filter_map(ElementRef::wrap))
                .any(|node| {
                    node.value().attr("hidden").is_some()
                        || node
                            .value()
                            .attr("style")
                            .is_some_and(|s| s.replace(' ', "").contains("display:none"))
                });
            Ok(!hidden)
        })
    }
}

/// Approximates `innerText`: block elements break lines, whitespace inside a
/// line collapses, blank lines drop out.
fn rendered_text(el: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(el, &mut raw);
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&text.replace('\n', " ")),
            Node::Element(element) => {
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = BLOCK_TAGS.contains(&element.name());
                if block {
                    out.push('\n');
                }
                collect_text(child_ref, out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Wraps a located element whose own text read fails, as when the list
/// recycles a card mid-parse. Nested lookups and attributes still resolve.
#[derive(Clone)]
pub struct UnreadableText {
    inner: FixtureLocator,
    root: bool,
}

impl UnreadableText {
    pub fn new(inner: FixtureLocator) -> Self {
        Self { inner, root: true }
    }

    fn nested(inner: FixtureLocator) -> Self {
        Self { inner, root: false }
    }
}

impl Scope for UnreadableText {
    type Locator = UnreadableText;

    fn locate(&self, selector: &Selector) -> UnreadableText {
        Self::nested(self.inner.locate(selector))
    }
}

#[async_trait]
impl Locator for UnreadableText {
    fn first(&self) -> Self {
        Self {
            inner: self.inner.first(),
            root: self.root,
        }
    }

    async fn count(&self) -> Result<usize, BrowserError> {
        self.inner.count().await
    }

    async fn all(&self) -> Result<Vec<Self>, BrowserError> {
        Ok(self.inner.all().await?.into_iter().map(Self::nested).collect())
    }

    async fn click(&self) -> Result<(), BrowserError> {
        self.inner.click().await
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, BrowserError> {
        self.inner.attribute(name).await
    }

    async fn inner_text(&self) -> Result<String, BrowserError> {
        if self.root {
            return Err(BrowserError::NotFound(format!("{} (detached)", self.inner.chain)));
        }
        self.inner.inner_text().await
    }

    async fn is_visible(&self) -> Result<bool, BrowserError> {
        self.inner.is_visible().await
    }
}

/// Hands out fresh pages over a shared fixture site.
pub struct FixtureLauncher {
    site: FixtureSite,
}

impl FixtureLauncher {
    pub fn new(site: FixtureSite) -> Self {
        Self { site }
    }
}

#[async_trait]
impl Launcher for FixtureLauncher {
    type Page = FixturePage;

    async fn launch(&self) -> Result<FixturePage, BrowserError> {
        Ok(FixturePage::new(self.site.clone()))
    }
}

/// Builders for list and detail markup shaped like the live job board.
pub mod markup {
    /// A list card with a structured id attribute that opens its detail panel.
    pub fn card(id: &str, title: &str, company: &str, location: &str) -> String {
        format!(
            r#"<li class="scaffold-layout__list-item">
                <div class="job-card-container" data-job-id="{id}" data-fixture-action="detail:{id}">
                    <a class="job-card-container__link" href="/jobs/view/{id}/?refId=abc"><strong>{title}</strong></a>
                    <div class="artdeco-entity-lockup__subtitle">{company}</div>
                    <ul><li class="job-card-container__metadata-item">{location}</li></ul>
                </div>
            </li>"#
        )
    }

    pub fn list(cards: &[String], next_page: Option<usize>) -> String {
        let next = next_page
            .map(|n| {
                format!(
                    r#"<button aria-label="View next page" data-fixture-action="page:{n}">Next</button>"#
                )
            })
            .unwrap_or_default();
        format!(
            r#"<div class="scaffold-layout__list-container"><ul class="scaffold-layout__list">{}</ul></div>{next}"#,
            cards.concat()
        )
    }

    pub fn cards(ids: std::ops::RangeInclusive<u32>) -> Vec<String> {
        ids.map(|n| {
            card(
                &format!("{}", 1000 + n),
                &format!("Engineer {n}"),
                "Acme",
                "Remote",
            )
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_nested_locators_and_text() {
        let page = FixturePage::new(FixtureSite::new().page(markup::list(
            &[markup::card("1", "Rust Dev", "Acme", "Berlin")],
            None,
        )));

        let card = page.locate(&Selector::css("[data-job-id]")).first();
        assert_eq!(card.count().await.unwrap(), 1);
        assert_eq!(card.attribute("data-job-id").await.unwrap().as_deref(), Some("1"));
        let title = card.locate(&Selector::css("strong")).first();
        assert_eq!(title.inner_text().await.unwrap(), "Rust Dev");
        assert_eq!(
            page.locate(&Selector::has_text("button", "next")).count().await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn click_actions_swap_documents() {
        let site = FixtureSite::new()
            .page(markup::list(&markup::cards(1..=2), Some(1)))
            .page(markup::list(&markup::cards(3..=3), None))
            .detail("1003", r#"<div id="job-details">Great job</div>"#);
        let page = FixturePage::new(site);

        page.locate(&Selector::css("button[aria-label=\"View next page\"]"))
            .first()
            .click()
            .await
            .unwrap();
        assert_eq!(page.current_page(), 1);

        page.locate(&Selector::css("[data-job-id=\"1003\"]"))
            .first()
            .click()
            .await
            .unwrap();
        let details = page.locate(&Selector::css("#job-details")).first();
        assert_eq!(details.inner_text().await.unwrap(), "Great job");
        assert_eq!(page.clicks().len(), 2);
    }

    #[tokio::test]
    async fn hidden_and_broken_elements() {
        let site = FixtureSite::new()
            .page(r#"<div hidden><button class="x">Go</button></div><p class="y">ok</p>"#)
            .broken(".y");
        let page = FixturePage::new(site);

        let hidden = page.locate(&Selector::css(".x")).first();
        assert!(!hidden.is_visible().await.unwrap());
        assert!(page.locate(&Selector::css(".y")).count().await.is_err());
    }

    #[test]
    fn rendered_text_breaks_on_blocks() {
        let html = Html::parse_fragment(
            "<div id=\"t\"><p>First  line</p><span>inline</span> tail<ul><li>a</li><li>b</li></ul></div>",
        );
        let sel = scraper::Selector::parse("#t").unwrap();
        let el = html.select(&sel).next().unwrap();
        assert_eq!(rendered_text(el), "First line\ninline tail\na\nb");
    }
}
