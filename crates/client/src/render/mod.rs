//! Page sources and the live rendering surface.
//!
//! A [`PageSource`] opens a URL and hands back a [`LivePage`]: the rendered
//! document plus a narrow [`DisclosureSurface`] capability for expanding
//! collapsible widgets. The normalizer only talks to that capability, so it
//! does not care whether the page came from a headless browser or a plain
//! HTTP fetch.

#[cfg(feature = "render")]
pub mod headless;
pub mod static_page;

#[cfg(feature = "render")]
pub use headless::HeadlessRenderer;
pub use static_page::{StaticPage, StaticSource};

use api2md_core::Error;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use url::Url;

use crate::extract::disclosure::DisclosureAction;

/// Errors that can occur during page rendering.
#[derive(Debug, ThisError)]
pub enum RenderError {
    /// Failed to launch or connect to browser.
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    /// Failed to navigate to URL.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Failed to get page content.
    #[error("content retrieval failed: {0}")]
    ContentRetrieval(String),

    /// Timeout waiting for page to load or settle.
    #[error("render timeout after {0}ms")]
    Timeout(u64),

    /// Wait selector not found.
    #[error("wait_for selector not found: {0}")]
    SelectorNotFound(String),

    /// A widget interaction (click, attribute write, state query) failed.
    #[error("interaction failed: {0}")]
    Interaction(String),
}

impl From<RenderError> for Error {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Timeout(ms) => Error::FetchTimeout(format!("render timeout after {ms}ms")),
            RenderError::Navigation(msg) => Error::Fetch(msg),
            other => Error::RenderFailed(other.to_string()),
        }
    }
}

/// Options for rendering a page.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Ceiling for navigation plus initial settle, in milliseconds (default: 30000).
    pub timeout_ms: u64,

    /// Optional CSS selector to wait for before reading content.
    pub wait_for: Option<String>,

    /// Fixed wait after navigation when `wait_for` is unset (default: 2000).
    pub settle_ms: u64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { timeout_ms: 30_000, wait_for: None, settle_ms: 2_000 }
    }
}

/// How a widget signals its expanded state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetKind {
    /// Native `<details>` element; expanded when `open`.
    Details,
    /// Element carrying `aria-expanded`; expanded when it reads `true`.
    Aria,
    /// Class- or text-based toggle with no state attribute; expanded once activated.
    Toggle,
}

/// A disclosure widget found on a live page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Widget {
    /// Identifier stable for the lifetime of the page.
    pub id: u32,
    pub kind: WidgetKind,
    /// Short visible label, for logs.
    #[serde(default)]
    pub label: String,
}

/// The interaction capability the normalizer needs from a rendered page.
#[async_trait::async_trait]
pub trait DisclosureSurface: Send + Sync {
    /// All disclosure widgets currently in the document, expanded or not.
    async fn widgets(&self) -> Result<Vec<Widget>, RenderError>;

    /// Whether the widget is in its expanded state.
    async fn is_expanded(&self, widget: &Widget) -> Result<bool, RenderError>;

    /// Trigger the widget the way a user click would.
    ///
    /// Returns `false` when there was nothing to interact with.
    async fn expand(&self, widget: &Widget) -> Result<bool, RenderError>;
}

/// An opened page: disclosure capability plus read access to the current tree.
#[async_trait::async_trait]
pub trait LivePage: DisclosureSurface {
    /// URL after redirects.
    fn final_url(&self) -> &Url;

    /// Serialized markup of the current document.
    async fn html(&self) -> Result<String, RenderError>;

    /// Release the page. Errors are ignored.
    async fn close(self: Box<Self>);
}

/// Opens URLs as live pages.
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    async fn open(&self, url: &Url, opts: &RenderOptions) -> Result<Box<dyn LivePage>, Error>;
}

/// The fully loaded document for one URL, after disclosure expansion.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// URL exactly as given in the input.
    pub source_url: String,
    /// Canonicalized request URL, used for endpoint identification.
    pub url: Url,
    /// URL after redirects, used to resolve relative links.
    pub final_url: Url,
    /// Serialized markup after expansion.
    pub html: String,
    /// Disclosure interactions performed on the page.
    pub disclosures: Vec<DisclosureAction>,
    /// Time from open to content read, in milliseconds.
    pub render_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_options_default() {
        let opts = RenderOptions::default();
        assert_eq!(opts.timeout_ms, 30_000);
        assert_eq!(opts.settle_ms, 2_000);
        assert!(opts.wait_for.is_none());
    }

    #[test]
    fn test_render_error_mapping() {
        let err: Error = RenderError::Timeout(1500).into();
        assert!(matches!(err, Error::FetchTimeout(_)));
        assert!(err.is_fetch());

        let err: Error = RenderError::Navigation("net::ERR_NAME_NOT_RESOLVED".into()).into();
        assert!(matches!(err, Error::Fetch(ref msg) if msg.contains("ERR_NAME_NOT_RESOLVED")));

        let err: Error = RenderError::BrowserLaunch("no chrome".into()).into();
        assert!(matches!(err, Error::RenderFailed(_)));
    }

    #[test]
    fn test_widget_deserialize() {
        let widgets: Vec<Widget> =
            serde_json::from_str(r#"[{"id":3,"kind":"details","label":"Response"},{"id":4,"kind":"aria"}]"#).unwrap();
        assert_eq!(widgets[0], Widget { id: 3, kind: WidgetKind::Details, label: "Response".into() });
        assert_eq!(widgets[1].kind, WidgetKind::Aria);
        assert!(widgets[1].label.is_empty());
    }
}
