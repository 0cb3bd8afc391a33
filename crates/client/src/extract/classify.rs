//! Block classification over a content region.
//!
//! Walks the region in document order. Block-level elements become
//! [`Block`]s; runs of inline content between them become paragraphs or
//! inline groups with their emphasis, links and code spans preserved.
//! Markup that cannot be classified (a table without rows, a list without
//! items) degrades to a plain paragraph of its text.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Node};
use url::Url;

use super::block::{Block, Inline, List, ListItem, MAX_LIST_NUMBER, Table, inline_text};
use super::normalize::ContentRegion;

/// Elements that start a new block.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "dd", "div", "dl", "dt", "fieldset", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p",
    "pre", "section", "summary", "table", "ul",
];

/// Elements with no textual content worth keeping.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "img", "picture", "video", "audio", "canvas", "iframe",
    "input", "select", "textarea", "head", "title", "meta", "link",
];

/// Table structure that only appears inside list items as flattened text.
const TABLE_PARTS: &[&str] = &["thead", "tbody", "tfoot", "tr", "th", "td"];

static LANGUAGE_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:language|lang)-([A-Za-z0-9_+#.-]+)$").expect("invalid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("invalid regex"));

/// Markup that could not be turned into its natural block kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("table has no rows")]
    EmptyTable,

    #[error("list has no items")]
    EmptyList,
}

/// Classify a content region into an ordered block sequence.
pub fn classify(region: &ContentRegion) -> Vec<Block> {
    let mut classifier = Classifier { base: region.base_url(), blocks: Vec::new() };
    classifier.walk_container(region.root());
    classifier.blocks
}

struct Classifier<'u> {
    base: &'u Url,
    blocks: Vec<Block>,
}

impl Classifier<'_> {
    fn walk_container(&mut self, el: ElementRef<'_>) {
        let mut pending = Vec::new();

        for child in el.children() {
            match child.value() {
                Node::Text(text) => pending.push(Inline::Text(collapse_whitespace(text))),
                Node::Element(_) => {
                    let Some(child) = ElementRef::wrap(child) else { continue };
                    if is_skipped(child) {
                        continue;
                    }
                    if is_block(child) {
                        self.flush(&mut pending);
                        self.classify_block(child);
                    } else {
                        pending.extend(self.inline(child));
                    }
                }
                _ => {}
            }
        }

        self.flush(&mut pending);
    }

    fn flush(&mut self, pending: &mut Vec<Inline>) {
        let spans = tidy(std::mem::take(pending));
        if !spans.is_empty() {
            self.blocks.push(Block::InlineGroup(spans));
        }
    }

    fn classify_block(&mut self, el: ElementRef<'_>) {
        let name = el.value().name();

        if let Some(level) = heading_level(el) {
            let content = tidy(self.inline_children(el));
            if !content.is_empty() {
                self.blocks.push(Block::Heading { level, content });
            }
            return;
        }

        match name {
            "pre" | "code" => {
                if let Some(block) = code_block(el) {
                    self.blocks.push(block);
                }
            }
            "table" => match table(el) {
                Ok(table) => self.blocks.push(Block::Table(table)),
                Err(e) => self.degrade(el, &e),
            },
            "ul" | "ol" => match self.list(el) {
                Ok(list) => self.blocks.push(Block::List(list)),
                Err(e) => self.degrade(el, &e),
            },
            "p" => {
                let spans = tidy(self.inline_children(el));
                if !spans.is_empty() {
                    self.blocks.push(Block::Paragraph(spans));
                }
            }
            "hr" => {}
            _ => self.walk_container(el),
        }
    }

    fn degrade(&mut self, el: ElementRef<'_>, err: &ClassifyError) {
        let text = collapse_whitespace(&el.text().collect::<String>()).trim().to_string();
        tracing::debug!(element = el.value().name(), "degrading to paragraph: {err}");
        if !text.is_empty() {
            self.blocks.push(Block::Paragraph(vec![Inline::Text(text)]));
        }
    }

    fn list(&self, el: ElementRef<'_>) -> Result<List, ClassifyError> {
        let ordered = el.value().name() == "ol";
        let start = el
            .value()
            .attr("start")
            .and_then(|s| s.trim().parse::<i128>().ok())
            .map_or(1, |n| n.clamp(0, i128::from(MAX_LIST_NUMBER)) as u64);

        let mut items: Vec<ListItem> = Vec::new();
        for child in el.child_elements() {
            match child.value().name() {
                "ul" | "ol" => {
                    // Stray nested list directly inside a list: it belongs to the previous item.
                    if let Ok(nested) = self.list(child) {
                        if items.is_empty() {
                            items.push(ListItem::default());
                        }
                        if let Some(last) = items.last_mut() {
                            last.children.push(nested);
                        }
                    }
                }
                name if SKIPPED_TAGS.contains(&name) => {}
                _ => {
                    let mut item = ListItem::default();
                    let mut content = Vec::new();
                    self.collect_item(child, &mut content, &mut item);
                    item.content = tidy(content);
                    if !item.content.is_empty() || !item.children.is_empty() || !item.blocks.is_empty() {
                        items.push(item);
                    }
                }
            }
        }

        if items.is_empty() {
            return Err(ClassifyError::EmptyList);
        }
        Ok(List { ordered, start, items })
    }

    /// Gather an item's inline content, pulling nested lists and code samples out.
    fn collect_item(&self, el: ElementRef<'_>, content: &mut Vec<Inline>, item: &mut ListItem) {
        for child in el.children() {
            match child.value() {
                Node::Text(text) => content.push(Inline::Text(collapse_whitespace(text))),
                Node::Element(_) => {
                    let Some(child) = ElementRef::wrap(child) else { continue };
                    if is_skipped(child) {
                        continue;
                    }
                    match child.value().name() {
                        "ul" | "ol" => {
                            if let Ok(nested) = self.list(child) {
                                item.children.push(nested);
                            }
                        }
                        "pre" | "code" if is_block(child) => item.blocks.extend(code_block(child)),
                        name if is_block(child) || TABLE_PARTS.contains(&name) => {
                            content.push(Inline::Text(" ".into()));
                            self.collect_item(child, content, item);
                            content.push(Inline::Text(" ".into()));
                        }
                        _ => content.extend(self.inline(child)),
                    }
                }
                _ => {}
            }
        }
    }

    fn inline(&self, el: ElementRef<'_>) -> Vec<Inline> {
        if is_skipped(el) {
            return Vec::new();
        }

        match el.value().name() {
            "strong" | "b" => vec![Inline::Strong(self.inline_children(el))],
            "em" | "i" => vec![Inline::Emphasis(self.inline_children(el))],
            "code" | "kbd" | "samp" | "tt" => {
                let text = collapse_whitespace(&el.text().collect::<String>());
                if text.trim().is_empty() { Vec::new() } else { vec![Inline::Code(text.trim().to_string())] }
            }
            "a" => match el.value().attr("href").and_then(|href| self.resolve(href)) {
                Some(href) => vec![Inline::Link { text: self.inline_children(el), href }],
                None => self.inline_children(el),
            },
            "br" => vec![Inline::Text(" ".into())],
            _ => self.inline_children(el),
        }
    }

    fn inline_children(&self, el: ElementRef<'_>) -> Vec<Inline> {
        let mut spans = Vec::new();
        for child in el.children() {
            match child.value() {
                Node::Text(text) => spans.push(Inline::Text(collapse_whitespace(text))),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        spans.extend(self.inline(child));
                    }
                }
                _ => {}
            }
        }
        spans
    }

    fn resolve(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() || href.to_ascii_lowercase().starts_with("javascript:") {
            return None;
        }
        Some(self.base.join(href).map(|u| u.to_string()).unwrap_or_else(|_| href.to_string()))
    }
}

fn is_skipped(el: ElementRef<'_>) -> bool {
    SKIPPED_TAGS.contains(&el.value().name())
}

fn is_block(el: ElementRef<'_>) -> bool {
    let name = el.value().name();
    if BLOCK_TAGS.contains(&name) || heading_level(el).is_some() {
        return true;
    }
    if name == "code" {
        return el.text().any(|t| t.contains('\n'));
    }
    // Inline wrappers around block content (a card link around a heading) act as containers.
    el.descendants()
        .filter_map(ElementRef::wrap)
        .any(|d| BLOCK_TAGS.contains(&d.value().name()))
}

fn heading_level(el: ElementRef<'_>) -> Option<u8> {
    let value = el.value();
    match value.name() {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ if value.attr("role") == Some("heading") => {
            let level = value
                .attr("aria-level")
                .and_then(|l| l.trim().parse::<u8>().ok())
                .unwrap_or(2);
            Some(level.clamp(1, 6))
        }
        _ => None,
    }
}

fn code_block(el: ElementRef<'_>) -> Option<Block> {
    let raw: String = el.text().collect();
    let text = raw.trim_start_matches(['\n', '\r']).trim_end();
    if text.is_empty() {
        return None;
    }
    Some(Block::Code { language: code_language(el), text: text.to_string() })
}

/// Language from a `language-xxx`/`lang-xxx` class on the element or a `code` inside it.
fn code_language(el: ElementRef<'_>) -> Option<String> {
    std::iter::once(el)
        .chain(el.descendants().filter_map(ElementRef::wrap).filter(|d| d.value().name() == "code"))
        .flat_map(|e| e.value().classes())
        .find_map(|class| LANGUAGE_CLASS.captures(class).map(|c| c[1].to_ascii_lowercase()))
}

fn table(el: ElementRef<'_>) -> Result<Table, ClassifyError> {
    let mut head = Vec::new();
    let mut body = Vec::new();

    for section in el.child_elements() {
        match section.value().name() {
            "thead" => head.extend(section.child_elements().filter(|r| r.value().name() == "tr")),
            "tbody" | "tfoot" => body.extend(section.child_elements().filter(|r| r.value().name() == "tr")),
            "tr" => body.push(section),
            _ => {}
        }
    }

    let rows: Vec<Vec<String>> = head
        .into_iter()
        .chain(body)
        .map(table_row)
        .filter(|row| !row.is_empty())
        .collect();

    if rows.is_empty() {
        return Err(ClassifyError::EmptyTable);
    }
    Ok(Table { rows })
}

fn table_row(tr: ElementRef<'_>) -> Vec<String> {
    let mut cells = Vec::new();
    for cell in tr.child_elements() {
        if !matches!(cell.value().name(), "td" | "th") {
            continue;
        }
        let text = collapse_whitespace(&cell.text().collect::<String>()).trim().to_string();
        cells.push(text);
        let span = cell
            .value()
            .attr("colspan")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(1)
            .clamp(1, 64);
        cells.extend(std::iter::repeat_n(String::new(), span - 1));
    }
    cells
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").into_owned()
}

/// Merge adjacent text, trim the outer edges, and drop empty spans.
fn tidy(spans: Vec<Inline>) -> Vec<Inline> {
    let mut out: Vec<Inline> = Vec::new();
    for span in spans {
        match span {
            Inline::Text(t) => {
                if let Some(Inline::Text(prev)) = out.last_mut() {
                    prev.push_str(&t);
                    *prev = collapse_whitespace(prev);
                } else {
                    out.push(Inline::Text(t));
                }
            }
            Inline::Strong(inner) if inline_text(&inner).trim().is_empty() => out.push(Inline::Text(" ".into())),
            Inline::Emphasis(inner) if inline_text(&inner).trim().is_empty() => out.push(Inline::Text(" ".into())),
            other => out.push(other),
        }
    }

    if let Some(Inline::Text(first)) = out.first_mut() {
        *first = first.trim_start().to_string();
    }
    if let Some(Inline::Text(last)) = out.last_mut() {
        *last = last.trim_end().to_string();
    }
    out.retain(|span| !matches!(span, Inline::Text(t) if t.is_empty()));

    if inline_text(&out).trim().is_empty() { Vec::new() } else { out }
}
