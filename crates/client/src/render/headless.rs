//! Headless Chrome/Chromium page source using chromiumoxide.
//!
//! Widgets are tagged in the live DOM with a `data-api2md-widget` id so they
//! can be addressed again after the page mutates. Expansion goes through
//! real CDP clicks; only `<details>` is opened by setting its property, which
//! is what the browser does on a summary click anyway. Links that would
//! navigate away are never treated as widgets.

use std::time::{Duration, Instant};

use api2md_core::Error;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures_util::StreamExt;
use url::Url;

use super::{DisclosureSurface, LivePage, PageSource, RenderError, RenderOptions, Widget, WidgetKind};

/// CSS selectors that mark disclosure widgets.
pub const DISCLOSURE_SELECTORS: &[&str] = &[
    "details",
    "[aria-expanded=\"false\"]",
    "[data-toggle=\"collapse\"]",
    "[data-bs-toggle=\"collapse\"]",
    ".expand-all",
    ".collapse-toggle",
    ".accordion-toggle",
    ".accordion-button",
    ".btn-expand",
    "[aria-label*=\"expand\" i]",
    "[title*=\"expand\" i]",
    "[role=\"tab\"]",
];

/// Headless Chrome/Chromium renderer using chromiumoxide.
///
/// One browser is shared by every URL in a run; each URL gets its own tab.
pub struct HeadlessRenderer {
    browser: Browser,
}

impl HeadlessRenderer {
    /// Create a new headless renderer by launching a browser instance.
    ///
    /// The browser runs in headless mode and uses a background task
    /// to handle Chrome DevTools Protocol events.
    pub async fn new(user_agent: &str) -> Result<Self, RenderError> {
        let config = BrowserConfig::builder()
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={user_agent}"))
            .build()
            .map_err(RenderError::BrowserLaunch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::BrowserLaunch(e.to_string()))?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser handler event error: {e}");
                    break;
                }
            }
        });

        Ok(Self { browser })
    }

    /// Navigation itself is bounded by the caller's open ceiling; cancelling
    /// `new_page` here would orphan the tab it creates.
    async fn load(&self, url: &Url, opts: &RenderOptions) -> Result<Page, RenderError> {
        let page = self
            .browser
            .new_page(url.as_str())
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;

        let waited = match &opts.wait_for {
            Some(selector) => {
                tokio::time::timeout(Duration::from_millis(opts.timeout_ms), async {
                    loop {
                        if page.find_element(selector.as_str()).await.is_ok() {
                            return;
                        }
                        tokio::time::sleep(Duration::from_millis(500)).await;
                    }
                })
                .await
                .map_err(|_| RenderError::SelectorNotFound(selector.clone()))
            }
            None => {
                tokio::time::sleep(Duration::from_millis(opts.settle_ms.min(opts.timeout_ms))).await;
                Ok(())
            }
        };

        if let Err(e) = waited {
            page.close().await.ok();
            return Err(e);
        }

        Ok(page)
    }
}

#[async_trait::async_trait]
impl PageSource for HeadlessRenderer {
    async fn open(&self, url: &Url, opts: &RenderOptions) -> Result<Box<dyn LivePage>, Error> {
        let start = Instant::now();
        let page = self.load(url, opts).await?;

        let current = page
            .url()
            .await
            .map_err(|e| RenderError::ContentRetrieval(e.to_string()))?;
        let final_url = current
            .as_deref()
            .and_then(|u| Url::parse(u).ok())
            .unwrap_or_else(|| url.clone());

        tracing::debug!("rendered {} -> {} in {}ms", url, final_url, start.elapsed().as_millis());

        Ok(Box::new(HeadlessPage { page, final_url }))
    }
}

/// One browser tab.
pub struct HeadlessPage {
    page: Page,
    final_url: Url,
}

impl HeadlessPage {
    async fn eval<T: serde::de::DeserializeOwned>(&self, script: String) -> Result<T, RenderError> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| RenderError::Interaction(e.to_string()))?
            .into_value()
            .map_err(|e| RenderError::Interaction(format!("unexpected script result: {e}")))
    }
}

/// Equal ignoring the fragment, which in-page tabs and anchors change freely.
fn same_document(a: &Url, b: &Url) -> bool {
    let mut a = a.clone();
    let mut b = b.clone();
    a.set_fragment(None);
    b.set_fragment(None);
    a == b
}

fn widget_selector(widget: &Widget) -> String {
    format!("[data-api2md-widget=\"{}\"]", widget.id)
}

fn tag_widgets_script() -> String {
    let selectors = serde_json::to_string(DISCLOSURE_SELECTORS).unwrap_or_else(|_| "[]".into());
    format!(
        r#"(() => {{
    const root = document.documentElement;
    let next = Number(root.dataset.api2mdNext || 0);
    const seen = new Set();
    const found = [];
    const navigates = (el) => {{
        if (el.tagName !== 'A' || !el.hasAttribute('href')) return false;
        return !/^\s*(#|javascript:)/i.test(el.getAttribute('href'));
    }};
    const consider = (el) => {{
        if (seen.has(el) || navigates(el)) return;
        seen.add(el);
        if (!el.dataset.api2mdWidget) el.dataset.api2mdWidget = String(next++);
        const kind = el.tagName === 'DETAILS' ? 'details'
            : (el.hasAttribute('aria-expanded') ? 'aria' : 'toggle');
        found.push({{ id: Number(el.dataset.api2mdWidget), kind, label: (el.textContent || '').trim().slice(0, 60) }});
    }};
    for (const sel of {selectors}) {{
        try {{ document.querySelectorAll(sel).forEach(consider); }} catch (e) {{}}
    }}
    document.querySelectorAll('button').forEach((el) => {{
        if (/^(expand|show)\b/i.test((el.textContent || '').trim())) consider(el);
    }});
    document.querySelectorAll('a').forEach((el) => {{
        if (/^expand\b/i.test((el.textContent || '').trim())) consider(el);
    }});
    root.dataset.api2mdNext = String(next);
    return found;
}})()"#
    )
}

fn is_expanded_script(widget: &Widget) -> String {
    format!(
        r#"(() => {{
    const el = document.querySelector('{selector}');
    if (!el) return true;
    if (el.tagName === 'DETAILS') return el.open;
    const state = el.getAttribute('aria-expanded');
    if (state !== null) return state === 'true';
    return el.dataset.api2mdClicked === '1';
}})()"#,
        selector = widget_selector(widget)
    )
}

#[async_trait::async_trait]
impl DisclosureSurface for HeadlessPage {
    async fn widgets(&self) -> Result<Vec<Widget>, RenderError> {
        self.eval(tag_widgets_script()).await
    }

    async fn is_expanded(&self, widget: &Widget) -> Result<bool, RenderError> {
        self.eval(is_expanded_script(widget)).await
    }

    async fn expand(&self, widget: &Widget) -> Result<bool, RenderError> {
        let selector = widget_selector(widget);

        if widget.kind == WidgetKind::Details {
            let script = format!(
                "(() => {{ const el = document.querySelector('{selector}'); if (!el) return false; el.open = true; return true; }})()"
            );
            return self.eval(script).await;
        }

        let Ok(element) = self.page.find_element(selector.as_str()).await else {
            return Ok(false);
        };
        element
            .click()
            .await
            .map_err(|e| RenderError::Interaction(e.to_string()))?;

        let mark = format!(
            "(() => {{ const el = document.querySelector('{selector}'); if (el) el.dataset.api2mdClicked = '1'; return true; }})()"
        );
        self.eval::<bool>(mark).await?;
        Ok(true)
    }
}

#[async_trait::async_trait]
impl LivePage for HeadlessPage {
    fn final_url(&self) -> &Url {
        &self.final_url
    }

    async fn html(&self) -> Result<String, RenderError> {
        let current = self
            .page
            .url()
            .await
            .map_err(|e| RenderError::ContentRetrieval(e.to_string()))?
            .and_then(|u| Url::parse(&u).ok());
        if let Some(current) = current
            && !same_document(&current, &self.final_url)
        {
            return Err(RenderError::ContentRetrieval(format!(
                "page navigated from {} to {current} during expansion",
                self.final_url
            )));
        }

        self.page
            .content()
            .await
            .map_err(|e| RenderError::ContentRetrieval(e.to_string()))
    }

    async fn close(self: Box<Self>) {
        self.page.close().await.ok();
    }
}
