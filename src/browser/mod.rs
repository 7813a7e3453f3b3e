// Page-automation capability consumed by the extraction core.
// Implementations: a headless Chrome session for real runs, and a static HTML
// fixture for tests.

pub mod chrome;
#[cfg(test)]
pub mod fixture;

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("Timed out waiting for {0}")]
    Timeout(String),

    #[error("No element matches {0}")]
    NotFound(String),

    #[error("Element {0} cannot be interacted with")]
    NotInteractable(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Browser session error: {0}")]
    Session(String),
}

/// Typed element locator descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selector {
    /// Plain CSS selector.
    Css { css: Cow<'static, str> },
    /// Elements matching `css` whose rendered text contains `text`, ignoring case.
    HasText {
        css: Cow<'static, str>,
        text: Cow<'static, str>,
    },
}

impl Selector {
    pub const fn css(css: &'static str) -> Self {
        Selector::Css {
            css: Cow::Borrowed(css),
        }
    }

    pub const fn has_text(css: &'static str, text: &'static str) -> Self {
        Selector::HasText {
            css: Cow::Borrowed(css),
            text: Cow::Borrowed(text),
        }
    }

    /// Selector built at runtime, e.g. for a specific record id.
    pub fn dynamic(css: String) -> Self {
        Selector::Css {
            css: Cow::Owned(css),
        }
    }

    pub fn css_str(&self) -> &str {
        match self {
            Selector::Css { css } | Selector::HasText { css, .. } => css.as_ref(),
        }
    }

    pub fn text_filter(&self) -> Option<&str> {
        match self {
            Selector::Css { .. } => None,
            Selector::HasText { text, .. } => Some(text.as_ref()),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.css_str())?;
        if let Some(text) = self.text_filter() {
            write!(f, ":has-text(\"{text}\")")?;
        }
        Ok(())
    }
}

/// Path from the document root to a set of elements: one selector per nesting
/// level, each optionally narrowed to a single match.
#[derive(Debug, Clone, Serialize)]
pub struct LocatorChain {
    steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Step {
    #[serde(flatten)]
    pub selector: Selector,
    pub nth: Option<usize>,
}

impl LocatorChain {
    pub fn root(selector: &Selector) -> Self {
        LocatorChain {
            steps: vec![Step {
                selector: selector.clone(),
                nth: None,
            }],
        }
    }

    pub fn child(&self, selector: &Selector) -> Self {
        let mut chain = self.clone();
        chain.steps.push(Step {
            selector: selector.clone(),
            nth: None,
        });
        chain
    }

    /// Narrow the last step to its `index`-th match. A step that is already
    /// narrowed holds at most one match, so it keeps its own index.
    pub fn nth(&self, index: usize) -> Self {
        let mut chain = self.clone();
        if let Some(last) = chain.steps.last_mut() {
            last.nth = Some(last.nth.unwrap_or(index));
        }
        chain
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

impl fmt::Display for LocatorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(" >> ")?;
            }
            write!(f, "{}", step.selector)?;
            if let Some(n) = step.nth {
                write!(f, " >> nth={n}")?;
            }
        }
        Ok(())
    }
}

/// Anything elements can be searched under: a whole page or a located element.
pub trait Scope: Send + Sync {
    type Locator: Locator;

    /// Lazily describe the elements matching `selector`; nothing is resolved yet.
    fn locate(&self, selector: &Selector) -> Self::Locator;
}

/// Lazy handle to zero or more elements. Every async operation resolves the
/// handle against the current document, so a locator stays valid across
/// re-renders of the list.
#[async_trait]
pub trait Locator: Scope<Locator = Self> + Sized + 'static {
    /// Narrow to the first match.
    fn first(&self) -> Self;

    async fn count(&self) -> Result<usize, BrowserError>;

    /// One locator per current match, in document order.
    async fn all(&self) -> Result<Vec<Self>, BrowserError>;

    async fn click(&self) -> Result<(), BrowserError>;

    async fn attribute(&self, name: &str) -> Result<Option<String>, BrowserError>;

    async fn inner_text(&self) -> Result<String, BrowserError>;

    async fn is_visible(&self) -> Result<bool, BrowserError>;
}

/// One browser tab, exclusively owned by a single extraction job.
#[async_trait]
pub trait Page: Scope {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Wait until at least one element matches, or fail with `Timeout`.
    async fn wait_for(&self, selector: &Selector, timeout: Duration) -> Result<(), BrowserError>;

    /// Run a script in the page and return its JSON-serializable result.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, BrowserError>;
}

/// Opens an independent page session per extraction job.
#[async_trait]
pub trait Launcher: Send + Sync + 'static {
    type Page: Page + 'static;

    async fn launch(&self) -> Result<Self::Page, BrowserError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_display_mirrors_playwright_syntax() {
        assert_eq!(Selector::css("[data-job-id]").to_string(), "[data-job-id]");
        assert_eq!(
            Selector::has_text("button", "Show more").to_string(),
            "button:has-text(\"Show more\")"
        );
        let dynamic = Selector::dynamic(format!("[data-job-id=\"{}\"]", 7));
        assert_eq!(dynamic.css_str(), "[data-job-id=\"7\"]");
        assert_eq!(dynamic.text_filter(), None);
    }

    #[test]
    fn selector_serializes_for_script_injection() {
        let json = serde_json::to_value(Selector::has_text("a", "See more jobs")).unwrap();
        assert_eq!(json["kind"], "has_text");
        assert_eq!(json["css"], "a");
        assert_eq!(json["text"], "See more jobs");
    }

    #[test]
    fn chain_narrowing_keeps_existing_index() {
        let chain = LocatorChain::root(&Selector::css(".card"))
            .child(&Selector::css("strong"))
            .nth(0);
        assert_eq!(chain.to_string(), ".card >> strong >> nth=0");
        assert_eq!(chain.nth(3).steps()[1].nth, Some(0));

        let json = serde_json::to_value(&chain).unwrap();
        assert_eq!(json["steps"][0]["css"], ".card");
        assert_eq!(json["steps"][0]["nth"], serde_json::Value::Null);
        assert_eq!(json["steps"][1]["nth"], 0);
    }
}
