//! Endpoint identification and output filenames.
//!
//! ### Method
//! 1. An uppercase method token in the first heading, then in the first
//!    few blocks.
//! 2. A `method` query parameter, or a path segment naming a method.
//! 3. `GET`.
//!
//! ### Segments
//! URL path segments minus boilerplate (`docs`, `api`, ...), slugified. A
//! root or all-boilerplate path falls back to the first heading, then to
//! the host name.
//!
//! ### Filename
//! `<METHOD>-<segments>.md`. Slugs longer than [`MAX_SLUG_BYTES`] are cut
//! and tagged with a short hash. [`resolve_endpoint`] yields the base name;
//! [`Endpoint::claim`] makes it unique through the run's registry.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use api2md_core::FilenameRegistry;
use api2md_core::registry::short_hash;
use percent_encoding::percent_decode_str;
use regex::Regex;
use url::Url;

use super::block::Block;

/// Longest `segments` part of a filename kept verbatim.
pub const MAX_SLUG_BYTES: usize = 180;

static METHOD_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS)\b").expect("invalid regex"));

/// HTTP methods recognised in documentation pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown HTTP method: {s}"))
    }
}

/// Tuning for endpoint identification.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Path segments ignored when naming (compared case-insensitively).
    pub boilerplate_segments: Vec<String>,
    /// How many leading blocks are scanned for a method token.
    pub method_scan_blocks: usize,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            boilerplate_segments: vec!["docs".into(), "api".into(), "reference".into()],
            method_scan_blocks: 5,
        }
    }
}

/// The method/path identity of one documentation page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: HttpMethod,
    /// Slugified path segments, never empty.
    pub segments: Vec<String>,
    /// Output filename. The base name until [`Endpoint::claim`] makes it
    /// unique within the run.
    pub filename: String,
}

impl Endpoint {
    /// Segments joined with `-`, as shown in the document header.
    pub fn name(&self) -> String {
        self.segments.join("-")
    }

    /// Claim the base filename in `registry`, taking a suffixed variant on collision.
    pub fn claim(mut self, registry: &FilenameRegistry, source: &str) -> Self {
        self.filename = registry.claim_or_hash(&self.filename, source);
        tracing::debug!(source, method = %self.method, filename = %self.filename, "claimed filename");
        self
    }
}

/// Derive the endpoint for `url` without claiming its filename.
pub fn resolve_endpoint(url: &Url, blocks: &[Block], config: &EndpointConfig) -> Endpoint {
    let method = method_from_content(blocks, config.method_scan_blocks)
        .or_else(|| method_from_url(url))
        .unwrap_or_default();
    let segments = endpoint_segments(url, blocks, &config.boilerplate_segments);
    let filename = base_filename(method, &segments);

    Endpoint { method, segments, filename }
}

/// Derive the endpoint for `url` and claim its filename in `registry`.
pub fn identify_endpoint(
    url: &Url, blocks: &[Block], config: &EndpointConfig, registry: &FilenameRegistry,
) -> Endpoint {
    resolve_endpoint(url, blocks, config).claim(registry, url.as_str())
}

fn base_filename(method: HttpMethod, segments: &[String]) -> String {
    let slug = segments.join("-");
    if slug.len() <= MAX_SLUG_BYTES {
        return format!("{method}-{slug}.md");
    }

    let mut cut = MAX_SLUG_BYTES - 9;
    while !slug.is_char_boundary(cut) {
        cut -= 1;
    }
    let head = slug[..cut].trim_end_matches('-');
    format!("{method}-{head}-{}.md", short_hash(&slug))
}

/// Method token in the first heading, then the first `scan_blocks` blocks.
pub fn method_from_content(blocks: &[Block], scan_blocks: usize) -> Option<HttpMethod> {
    let heading = blocks.iter().find(|b| b.is_heading());
    heading
        .into_iter()
        .chain(blocks.iter().take(scan_blocks))
        .find_map(|block| find_method_token(&block.plain_text()))
}

fn find_method_token(text: &str) -> Option<HttpMethod> {
    METHOD_TOKEN.captures(text).and_then(|c| c[1].parse().ok())
}

/// Method from a `method` query parameter or a path segment naming one.
pub fn method_from_url(url: &Url) -> Option<HttpMethod> {
    let from_query = url
        .query_pairs()
        .find(|(key, _)| key.eq_ignore_ascii_case("method"))
        .and_then(|(_, value)| value.parse().ok());

    from_query.or_else(|| {
        url.path_segments()?
            .filter(|s| !s.is_empty())
            .find_map(|s| s.parse().ok())
    })
}

fn endpoint_segments(url: &Url, blocks: &[Block], boilerplate: &[String]) -> Vec<String> {
    let from_path: Vec<String> = url
        .path_segments()
        .into_iter()
        .flatten()
        .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .filter(|s| !boilerplate.iter().any(|b| b.eq_ignore_ascii_case(s)))
        .map(|s| slugify(strip_page_extension(&s)))
        .filter(|s| !s.is_empty())
        .collect();
    if !from_path.is_empty() {
        return from_path;
    }

    if let Some(heading) = blocks.iter().find(|b| b.is_heading()) {
        let slug = slugify(&heading.plain_text());
        if !slug.is_empty() {
            return vec![slug];
        }
    }

    let host = url.host_str().map(slugify).unwrap_or_default();
    if host.is_empty() { vec!["index".to_string()] } else { vec![host] }
}

fn strip_page_extension(segment: &str) -> &str {
    [".html", ".htm"]
        .iter()
        .find_map(|ext| {
            let cut = segment.len().checked_sub(ext.len())?;
            segment
                .get(cut..)
                .filter(|tail| tail.eq_ignore_ascii_case(ext))
                .map(|_| &segment[..cut])
        })
        .unwrap_or(segment)
}

/// Lowercase, collapse non-alphanumeric runs to one `-`, trim `-` at the ends.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
