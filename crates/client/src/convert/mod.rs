//! Conversion orchestration.
//!
//! Drives each URL through render, disclosure expansion, extraction and
//! file output. Failures stay with their URL: a batch always attempts every
//! input and reports per-URL outcomes in input order.
//!
//! One [`FilenameRegistry`] lives for the duration of a run and is shared
//! by every worker. Claims happen in input order, so the first of two
//! colliding URLs always gets the unsuffixed name.

pub mod batch;
mod turn;

pub use batch::{BatchItem, BatchReport, BatchSummary, ItemStatus, dedup_urls, parse_url_list, read_url_list};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use api2md_core::{AppConfig, Error, FilenameRegistry};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

use crate::extract::{
    Endpoint, EndpointConfig, ExpandOptions, ExtractConfig, NormalizeConfig, expand_disclosures, prepare_document,
};
use crate::fetch::canonicalize;
use crate::render::{PageSource, RenderOptions, RenderedPage};
use turn::{Turn, Turnstile};

/// Settings for a conversion run.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub output_dir: PathBuf,
    pub render: RenderOptions,
    pub expand: ExpandOptions,
    pub extract: ExtractConfig,
    /// Maximum URLs processed at once.
    pub max_concurrency: usize,
    /// Extra attempts for the open/render step on transient failures.
    pub fetch_retries: u32,
}

impl ConvertConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            render: RenderOptions {
                timeout_ms: config.timeout_ms,
                wait_for: config.wait_for.clone(),
                settle_ms: config.settle_ms,
            },
            expand: ExpandOptions {
                per_widget_timeout: Duration::from_millis(config.expand_timeout_ms),
                settle: Duration::from_millis(config.expand_settle_ms),
                budget: Duration::from_millis(config.expand_budget_ms),
                max_rounds: config.max_expand_rounds,
            },
            extract: ExtractConfig {
                normalize: NormalizeConfig { min_content_chars: config.min_content_chars },
                endpoint: EndpointConfig {
                    boilerplate_segments: config.boilerplate_segments.clone(),
                    method_scan_blocks: config.method_scan_blocks,
                },
            },
            max_concurrency: config.max_concurrency,
            fetch_retries: config.fetch_retries,
        }
    }

    /// Ceiling for opening one page: navigation and the content wait each get `timeout_ms`.
    fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.render.timeout_ms.saturating_mul(2))
    }
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self::from_app(&AppConfig::default())
    }
}

/// A successfully converted URL.
#[derive(Debug, Clone)]
pub struct Converted {
    /// The URL as given.
    pub url: String,
    pub path: PathBuf,
    pub endpoint: Endpoint,
    pub blocks: usize,
    /// Disclosure widgets seen on the page.
    pub disclosures: usize,
    pub elapsed_ms: u64,
}

/// Converts URLs using a shared page source.
#[derive(Clone)]
pub struct Converter {
    source: Arc<dyn PageSource>,
    config: Arc<ConvertConfig>,
}

impl Converter {
    pub fn new(source: Arc<dyn PageSource>, config: ConvertConfig) -> Self {
        Self { source, config: Arc::new(config) }
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// Convert a single URL, propagating its error.
    pub async fn convert_one(&self, url: &str) -> Result<Converted, Error> {
        let registry = FilenameRegistry::new();
        self.process(url, &registry, Turnstile::new(1).turn(0)).await
    }

    /// Convert a batch of URLs with bounded concurrency.
    ///
    /// Duplicate URLs (exact match) are processed once. Never fails as a
    /// whole; per-URL errors land in the report.
    pub async fn run(&self, urls: Vec<String>) -> BatchReport {
        let urls = dedup_urls(urls);
        let registry = Arc::new(FilenameRegistry::new());
        let turnstile = Turnstile::new(urls.len());
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));

        tracing::info!(total = urls.len(), concurrency = self.config.max_concurrency, "starting conversion run");

        let mut join_set = JoinSet::new();
        for (index, url) in urls.iter().cloned().enumerate() {
            let permit = semaphore.clone().acquire_owned().await.ok();
            let converter = self.clone();
            let registry = registry.clone();
            let turn = turnstile.turn(index);

            join_set.spawn(async move {
                // NOTE: Hold permit for task duration to enforce concurrency limit
                let _permit = permit;
                let result = converter.process(&url, &registry, turn).await;
                (index, url, result)
            });
        }

        let mut slots: Vec<Option<BatchItem>> = vec![None; urls.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, url, result)) => {
                    let item = match result {
                        Ok(converted) => BatchItem::success(&converted),
                        Err(e) => BatchItem::failed(url, &e),
                    };
                    slots[index] = Some(item);
                }
                Err(e) => tracing::error!("conversion task aborted: {e}"),
            }
        }

        let results = slots
            .into_iter()
            .zip(urls)
            .map(|(slot, url)| {
                slot.unwrap_or_else(|| BatchItem::failed(url, &Error::RenderFailed("conversion task aborted".into())))
            })
            .collect();

        let report = BatchReport::new(results);
        tracing::info!(
            succeeded = report.summary.succeeded,
            failed = report.summary.failed,
            "conversion run complete"
        );
        report
    }

    async fn process(&self, input: &str, registry: &FilenameRegistry, turn: Turn) -> Result<Converted, Error> {
        let start = Instant::now();
        let result = self.process_inner(input, registry, &turn, start).await;
        if let Err(e) = &result {
            tracing::warn!(url = input, code = e.code(), "conversion failed: {e}");
        }
        result
    }

    async fn process_inner(
        &self, input: &str, registry: &FilenameRegistry, turn: &Turn, start: Instant,
    ) -> Result<Converted, Error> {
        let url = canonicalize(input)?;
        let page = self.render_with_retry(input, &url).await?;
        let prepared = prepare_document(&page, &self.config.extract)?;

        turn.wait().await;
        let extraction = prepared.claim(registry);
        turn.pass();

        let path = self.config.output_dir.join(&extraction.endpoint.filename);
        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        tokio::fs::write(&path, extraction.document.to_markdown()).await?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info!(url = input, path = %path.display(), elapsed_ms, "converted");

        Ok(Converted {
            url: input.to_string(),
            path,
            endpoint: extraction.endpoint,
            blocks: extraction.blocks,
            disclosures: page.disclosures.len(),
            elapsed_ms,
        })
    }

    async fn render_with_retry(&self, input: &str, url: &Url) -> Result<RenderedPage, Error> {
        let mut attempt = 0;
        loop {
            match self.render(input, url).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_retryable() && attempt < self.config.fetch_retries => {
                    attempt += 1;
                    tracing::warn!(url = input, attempt, "retrying after: {e}");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Open the page, expand its disclosures and read the resulting markup.
    async fn render(&self, input: &str, url: &Url) -> Result<RenderedPage, Error> {
        let start = Instant::now();
        let timeout = self.config.open_timeout();

        let source = self.source.clone();
        let target = url.clone();
        let opts = self.config.render.clone();
        let mut opening = tokio::spawn(async move { source.open(&target, &opts).await });

        let page = match tokio::time::timeout(timeout, &mut opening).await {
            Ok(joined) => joined.map_err(|e| Error::RenderFailed(format!("{url}: open task failed: {e}")))??,
            Err(_) => {
                // A page that opens after the deadline is closed once it arrives.
                tokio::spawn(async move {
                    if let Ok(Ok(late)) = opening.await {
                        late.close().await;
                    }
                });
                return Err(Error::FetchTimeout(format!("{url}: not loaded within {}ms", timeout.as_millis())));
            }
        };

        let disclosures = match expand_disclosures(&*page, &self.config.expand).await {
            Ok(actions) => actions,
            Err(e) => {
                page.close().await;
                return Err(e.into());
            }
        };

        let html = page.html().await;
        let final_url = page.final_url().clone();
        page.close().await;

        tracing::debug!(url = input, widgets = disclosures.len(), "page ready");

        Ok(RenderedPage {
            source_url: input.to_string(),
            url: url.clone(),
            final_url,
            html: html?,
            disclosures,
            render_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}
