//! Main-content selection and noise stripping.
//!
//! Candidates are tried in priority order: semantic landmarks, then
//! documentation-specific containers, then the most text-dense block. The
//! first candidate that still has enough visible text after stripping wins.
//! If none qualifies, the whole body minus page chrome is used.

use std::collections::HashSet;
use std::sync::LazyLock;

use api2md_core::Error;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Semantic main-content landmarks, highest priority first.
const LANDMARK_SELECTORS: &[&str] = &["main", "[role=\"main\"]", "article"];

/// Containers documentation generators commonly use.
const DOC_CONTAINER_SELECTORS: &[&str] = &[
    ".api-content",
    ".api-docs",
    ".documentation",
    ".doc-content",
    ".markdown-body",
    ".main-content",
    ".content",
    ".article",
    "#content",
    "#main",
    "#documentation",
];

/// Always removed from the selected region.
const NOISE_SELECTORS: &[&str] = &[
    "script",
    "style",
    "noscript",
    "template",
    "iframe",
    "svg",
    "nav",
    "[role=\"navigation\"]",
    ".nav",
    ".navbar",
    ".sidebar",
    ".menu",
    ".breadcrumb",
    ".breadcrumbs",
    ".pagination",
    "[class*=\"cookie\"]",
    "[id*=\"cookie\"]",
    "[class*=\"consent\"]",
    ".ad",
    ".ads",
    ".advert",
    ".advertisement",
    "[class*=\"advert\"]",
];

/// Page chrome removed when falling back to the whole body.
const CHROME_SELECTORS: &[&str] = &[
    "header",
    "footer",
    "aside",
    "[role=\"banner\"]",
    "[role=\"contentinfo\"]",
    "[role=\"complementary\"]",
    ".header",
    ".footer",
];

/// Block children that count toward a container's text density.
const DENSE_CHILDREN: &[&str] = &[
    "p", "pre", "table", "ul", "ol", "dl", "blockquote", "h1", "h2", "h3", "h4", "h5", "h6",
];

fn compile(list: &[&str]) -> Vec<Selector> {
    list.iter()
        .map(|s| Selector::parse(s).expect("invalid selector"))
        .collect()
}

static LANDMARKS: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(LANDMARK_SELECTORS));
static DOC_CONTAINERS: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(DOC_CONTAINER_SELECTORS));
static NOISE: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(NOISE_SELECTORS));
static CHROME: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(CHROME_SELECTORS));
static HIDDEN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[hidden], [aria-hidden=\"true\"], [style]").expect("invalid selector"));
static CONTAINERS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div, section").expect("invalid selector"));
static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").expect("invalid selector"));

/// Configuration for content selection.
#[derive(Debug, Clone)]
pub struct NormalizeConfig {
    /// Minimum non-whitespace characters for a region to count as content (default: 20).
    pub min_content_chars: usize,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self { min_content_chars: 20 }
    }
}

/// Which heuristic produced the content region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionStrategy {
    Landmark(&'static str),
    DocContainer(&'static str),
    TextDensity,
    BodyFallback,
}

/// The part of a page judged to be the documentation content.
pub struct ContentRegion {
    html: Html,
    base_url: Url,
    strategy: SelectionStrategy,
    removed: usize,
}

impl std::fmt::Debug for ContentRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentRegion")
            .field("base_url", &self.base_url.as_str())
            .field("strategy", &self.strategy)
            .field("removed", &self.removed)
            .finish()
    }
}

impl ContentRegion {
    /// Root element of the region.
    pub fn root(&self) -> ElementRef<'_> {
        self.html.root_element()
    }

    /// URL relative links in the region resolve against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn strategy(&self) -> &SelectionStrategy {
        &self.strategy
    }

    /// Number of noise or hidden elements stripped.
    pub fn removed(&self) -> usize {
        self.removed
    }

    /// Non-whitespace characters of visible text.
    pub fn text_len(&self) -> usize {
        visible_len(self.root())
    }
}

/// Select and clean the main content of a rendered document.
///
/// Returns [`Error::EmptyContent`] when even the body fallback has less
/// than `min_content_chars` of visible text.
pub fn select_content(html: &str, base_url: &Url, config: &NormalizeConfig) -> Result<ContentRegion, Error> {
    let document = Html::parse_document(html);

    let mut candidates: Vec<(ElementRef<'_>, SelectionStrategy)> = Vec::new();
    for (selector, name) in LANDMARKS.iter().zip(LANDMARK_SELECTORS) {
        if let Some(el) = document.select(selector).next() {
            candidates.push((el, SelectionStrategy::Landmark(*name)));
        }
    }
    for (selector, name) in DOC_CONTAINERS.iter().zip(DOC_CONTAINER_SELECTORS) {
        if let Some(el) = document.select(selector).next() {
            candidates.push((el, SelectionStrategy::DocContainer(*name)));
        }
    }
    if let Some(el) = densest_container(&document) {
        candidates.push((el, SelectionStrategy::TextDensity));
    }

    for (element, strategy) in candidates {
        let region = build_region(&element.html(), base_url, strategy, false);
        if region.text_len() >= config.min_content_chars {
            tracing::debug!(url = %base_url, strategy = ?region.strategy, removed = region.removed, "selected content region");
            return Ok(region);
        }
    }

    let body_markup = match document.select(&BODY).next() {
        Some(body) => body.inner_html(),
        None => document.root_element().inner_html(),
    };
    let region = build_region(&body_markup, base_url, SelectionStrategy::BodyFallback, true);
    let len = region.text_len();
    if len < config.min_content_chars {
        return Err(Error::EmptyContent(format!(
            "{base_url}: {len} visible characters, need at least {}",
            config.min_content_chars
        )));
    }

    tracing::debug!(url = %base_url, removed = region.removed, "falling back to page body");
    Ok(region)
}

fn build_region(markup: &str, base_url: &Url, strategy: SelectionStrategy, strip_chrome: bool) -> ContentRegion {
    let mut html = Html::parse_fragment(markup);

    let mut doomed = Vec::new();
    let mut lists: Vec<&[Selector]> = vec![NOISE.as_slice()];
    if strip_chrome {
        lists.push(CHROME.as_slice());
    }
    for list in lists {
        for selector in list {
            doomed.extend(html.select(selector).map(|el| el.id()));
        }
    }
    doomed.extend(html.select(&HIDDEN).filter(|el| is_hidden(el)).map(|el| el.id()));

    let mut removed = 0;
    let mut seen = HashSet::new();
    for id in doomed {
        if !seen.insert(id) {
            continue;
        }
        if let Some(mut node) = html.tree.get_mut(id) {
            node.detach();
            removed += 1;
        }
    }

    ContentRegion { html, base_url: base_url.clone(), strategy, removed }
}

fn is_hidden(el: &ElementRef<'_>) -> bool {
    let value = el.value();
    if value.attr("hidden").is_some() || value.attr("aria-hidden") == Some("true") {
        return true;
    }
    value.attr("style").is_some_and(|style| {
        let compact: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        compact.contains("display:none") || compact.contains("visibility:hidden")
    })
}

/// The `div`/`section` whose direct block children carry the most text.
fn densest_container(document: &Html) -> Option<ElementRef<'_>> {
    document
        .select(&CONTAINERS)
        .map(|el| {
            let score: usize = el
                .child_elements()
                .filter(|child| DENSE_CHILDREN.contains(&child.value().name()))
                .map(visible_len)
                .sum();
            (el, score)
        })
        .filter(|(_, score)| *score > 0)
        .max_by_key(|(_, score)| *score)
        .map(|(el, _)| el)
}

fn visible_len(el: ElementRef<'_>) -> usize {
    el.text().flat_map(str::chars).filter(|c| !c.is_whitespace()).count()
}
