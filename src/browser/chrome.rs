use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::Deserialize;
use serde_json::Value;

use crate::browser::{BrowserError, Launcher, Locator, LocatorChain, Page, Scope, Selector};

const WINDOW_SIZE: (u32, u32) = (1366, 900);
const IDLE_TIMEOUT: Duration = Duration::from_secs(600);
const WAIT_POLL: Duration = Duration::from_millis(250);

/// Resolves a serialized `LocatorChain` to the matching elements.
const RESOLVE_JS: &str = r#"
const resolve = (steps) => {
    let nodes = [document];
    for (const step of steps) {
        let matched = [];
        for (const node of nodes) {
            for (const el of node.querySelectorAll(step.css)) {
                if (!matched.includes(el)) matched.push(el);
            }
        }
        if (step.kind === 'has_text') {
            const needle = step.text.toLowerCase();
            matched = matched.filter(el =>
                (el.innerText || el.textContent || '').toLowerCase().includes(needle));
        }
        if (step.nth !== null && step.nth !== undefined) {
            matched = matched.length > step.nth ? [matched[step.nth]] : [];
        }
        nodes = matched;
    }
    return nodes;
};
"#;

/// Launches a fresh Chrome process per extraction job.
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    headless: bool,
    user_data_dir: Option<PathBuf>,
}

impl ChromeLauncher {
    pub fn new(headless: bool, user_data_dir: Option<PathBuf>) -> Self {
        Self {
            headless,
            user_data_dir,
        }
    }
}

#[async_trait]
impl Launcher for ChromeLauncher {
    type Page = ChromePage;

    async fn launch(&self) -> Result<ChromePage, BrowserError> {
        let headless = self.headless;
        let user_data_dir = self.user_data_dir.clone();

        tokio::task::spawn_blocking(move || -> Result<ChromePage, BrowserError> {
            let options = LaunchOptions {
                headless,
                user_data_dir,
                window_size: Some(WINDOW_SIZE),
                idle_browser_timeout: IDLE_TIMEOUT,
                ..Default::default()
            };
            let browser = Browser::new(options).map_err(session_error)?;
            let tab = browser.new_tab().map_err(session_error)?;
            tracing::debug!("Chrome session started (headless={headless})");
            Ok(ChromePage {
                _browser: browser,
                tab,
            })
        })
        .await
        .map_err(session_error)?
    }
}

/// A single Chrome tab. Dropping the page shuts the browser down.
pub struct ChromePage {
    _browser: Browser,
    tab: Arc<Tab>,
}

#[derive(Clone)]
pub struct ChromeLocator {
    tab: Arc<Tab>,
    chain: LocatorChain,
}

#[derive(Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Outcome {
    Ok { value: Value },
    Missing,
    Disabled,
    Error { message: String },
}

impl Scope for ChromePage {
    type Locator = ChromeLocator;

    fn locate(&self, selector: &Selector) -> ChromeLocator {
        ChromeLocator {
            tab: Arc::clone(&self.tab),
            chain: LocatorChain::root(selector),
        }
    }
}

#[async_trait]
impl Page for ChromePage {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let tab = Arc::clone(&self.tab);
        let url = url.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), BrowserError> {
            tab.navigate_to(&url).map_err(session_error)?;
            tab.wait_until_navigated().map_err(session_error)?;
            Ok(())
        })
        .await
        .map_err(session_error)?
    }

    async fn wait_for(&self, selector: &Selector, timeout: Duration) -> Result<(), BrowserError> {
        let locator = self.locate(selector);
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if locator.count().await.unwrap_or(0) > 0 {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BrowserError::Timeout(selector.to_string()));
            }
            tokio::time::sleep(WAIT_POLL).await;
        }
    }

    async fn evaluate(&self, script: &str) -> Result<Value, BrowserError> {
        let wrapped = format!(
            "(async () => {{ const result = await (async () => {{ {script} }})(); \
             return JSON.stringify(result === undefined ? null : result); }})()"
        );
        let raw = run_script(Arc::clone(&self.tab), wrapped).await?;
        match raw {
            Value::String(json) => serde_json::from_str(&json)
                .map_err(|e| BrowserError::Script(format!("Unreadable script result: {e}"))),
            other => Ok(other),
        }
    }
}

impl Scope for ChromeLocator {
    type Locator = ChromeLocator;

    fn locate(&self, selector: &Selector) -> ChromeLocator {
        ChromeLocator {
            tab: Arc::clone(&self.tab),
            chain: self.chain.child(selector),
        }
    }
}

impl ChromeLocator {
    /// Resolve the chain in the page and run `body` against the `nodes` array.
    async fn run(&self, body: &str) -> Result<Value, BrowserError> {
        let steps = serde_json::to_string(self.chain.steps())
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        let script = format!(
            "(() => {{ {RESOLVE_JS} try {{ const nodes = resolve({steps}); {body} }} \
             catch (e) {{ return JSON.stringify({{ status: 'error', message: String(e) }}); }} }})()"
        );

        let raw = run_script(Arc::clone(&self.tab), script).await?;
        let json = raw
            .as_str()
            .ok_or_else(|| BrowserError::Script(format!("Unexpected result for {}", self.chain)))?;
        let outcome: Outcome = serde_json::from_str(json)
            .map_err(|e| BrowserError::Script(format!("Unreadable result: {e}")))?;

        match outcome {
            Outcome::Ok { value } => Ok(value),
            Outcome::Missing => Err(BrowserError::NotFound(self.chain.to_string())),
            Outcome::Disabled => Err(BrowserError::NotInteractable(self.chain.to_string())),
            Outcome::Error { message } => Err(BrowserError::Script(message)),
        }
    }

    /// Like `run`, but the body only sees the first match and a missing match
    /// is reported before the body runs.
    async fn run_first(&self, body: &str) -> Result<Value, BrowserError> {
        let guarded = format!(
            "if (!nodes.length) return JSON.stringify({{ status: 'missing' }}); \
             const el = nodes[0]; {body}"
        );
        self.run(&guarded).await
    }
}

#[async_trait]
impl Locator for ChromeLocator {
    fn first(&self) -> Self {
        ChromeLocator {
            tab: Arc::clone(&self.tab),
            chain: self.chain.nth(0),
        }
    }

    async fn count(&self) -> Result<usize, BrowserError> {
        let value = self
            .run("return JSON.stringify({ status: 'ok', value: nodes.length });")
            .await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn all(&self) -> Result<Vec<Self>, BrowserError> {
        let count = self.count().await?;
        Ok((0..count)
            .map(|i| ChromeLocator {
                tab: Arc::clone(&self.tab),
                chain: self.chain.nth(i),
            })
            .collect())
    }

    async fn click(&self) -> Result<(), BrowserError> {
        self.run_first(
            "if (el.disabled || el.getAttribute('aria-disabled') === 'true') \
                 return JSON.stringify({ status: 'disabled' }); \
             el.scrollIntoView({ block: 'center' }); \
             el.click(); \
             return JSON.stringify({ status: 'ok', value: true });",
        )
        .await?;
        Ok(())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, BrowserError> {
        let name = serde_json::to_string(name).map_err(|e| BrowserError::Script(e.to_string()))?;
        let value = self
            .run_first(&format!(
                "return JSON.stringify({{ status: 'ok', value: el.getAttribute({name}) }});"
            ))
            .await?;
        Ok(value.as_str().map(String::from))
    }

    async fn inner_text(&self) -> Result<String, BrowserError> {
        let value = self
            .run_first(
                "return JSON.stringify({ status: 'ok', value: el.innerText || el.textContent || '' });",
            )
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn is_visible(&self) -> Result<bool, BrowserError> {
        let value = self
            .run_first(
                "const rect = el.getBoundingClientRect(); \
                 const style = window.getComputedStyle(el); \
                 const visible = rect.width > 0 && rect.height > 0 \
                     && style.visibility !== 'hidden' && style.display !== 'none'; \
                 return JSON.stringify({ status: 'ok', value: visible });",
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }
}

async fn run_script(tab: Arc<Tab>, script: String) -> Result<Value, BrowserError> {
    tokio::task::spawn_blocking(move || -> Result<Value, BrowserError> {
        let remote = tab
            .evaluate(&script, true)
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(remote.value.unwrap_or(Value::Null))
    })
    .await
    .map_err(session_error)?
}

fn session_error(e: impl std::fmt::Display) -> BrowserError {
    BrowserError::Session(e.to_string())
}
