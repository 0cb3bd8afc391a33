//! Rendered page to Markdown document.
//!
//! ### Pipeline
//! - [`normalize`]: pick the documentation region and strip noise.
//! - [`classify`]: walk the region into an ordered [`Block`] sequence.
//! - [`endpoint`]: derive the method/path identity and its filename.
//! - [`markdown`]: render blocks to Markdown.
//! - [`document`]: prepend the metadata header.
//!
//! Disclosure expansion ([`disclosure`]) runs earlier, on the live page.
//!
//! Everything here except [`disclosure`] is synchronous; the parsed tree is
//! not `Send` and never crosses an await point.

pub mod block;
pub mod classify;
pub mod disclosure;
pub mod document;
pub mod endpoint;
pub mod markdown;
pub mod normalize;

pub use block::{Block, Inline, List, ListItem, Table};
pub use classify::{ClassifyError, classify};
pub use disclosure::{DisclosureAction, DisclosureOutcome, ExpandOptions, expand_disclosures};
pub use document::MarkdownDocument;
pub use endpoint::{Endpoint, EndpointConfig, HttpMethod, identify_endpoint, resolve_endpoint, slugify};
pub use markdown::render_markdown;
pub use normalize::{ContentRegion, NormalizeConfig, SelectionStrategy, select_content};

use api2md_core::{Error, FilenameRegistry};
use url::Url;

use crate::render::RenderedPage;

/// Configuration for turning a rendered page into a document.
#[derive(Debug, Clone, Default)]
pub struct ExtractConfig {
    pub normalize: NormalizeConfig,
    pub endpoint: EndpointConfig,
}

/// Result of extracting one page.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub endpoint: Endpoint,
    pub document: MarkdownDocument,
    /// Number of classified blocks.
    pub blocks: usize,
}

/// A rendered page whose filename has not been claimed yet.
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    source_url: String,
    url: Url,
    endpoint: Endpoint,
    body: String,
    blocks: usize,
}

impl PreparedDocument {
    /// Filename before collision handling.
    pub fn base_filename(&self) -> &str {
        &self.endpoint.filename
    }

    /// Claim the filename in `registry` and attach the metadata header.
    pub fn claim(self, registry: &FilenameRegistry) -> Extraction {
        let endpoint = self.endpoint.claim(registry, self.url.as_str());
        let document = MarkdownDocument::new(self.source_url, &endpoint, self.body);
        Extraction { endpoint, document, blocks: self.blocks }
    }
}

/// Normalize, classify, identify and render one page, leaving the filename unclaimed.
///
/// Fails with [`Error::EmptyContent`] when no usable region exists.
pub fn prepare_document(page: &RenderedPage, config: &ExtractConfig) -> Result<PreparedDocument, Error> {
    let region = select_content(&page.html, &page.final_url, &config.normalize)?;
    let blocks = classify(&region);
    if blocks.is_empty() {
        return Err(Error::EmptyContent(format!("{}: no content blocks", page.source_url)));
    }

    Ok(PreparedDocument {
        source_url: page.source_url.clone(),
        url: page.url.clone(),
        endpoint: resolve_endpoint(&page.url, &blocks, &config.endpoint),
        body: render_markdown(&blocks),
        blocks: blocks.len(),
    })
}

/// [`prepare_document`] followed by the filename claim.
///
/// The filename is claimed in `registry` only after content was found.
pub fn extract_document(
    page: &RenderedPage, config: &ExtractConfig, registry: &FilenameRegistry,
) -> Result<Extraction, Error> {
    Ok(prepare_document(page, config)?.claim(registry))
}
