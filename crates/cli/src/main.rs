//! api2md entry point.
//!
//! Converts one documentation URL, or a file of them, into Markdown files.
//! Logging goes to stderr so stdout carries only the run report.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use api2md_client::convert::read_url_list;
use api2md_client::{BatchItem, BatchReport, ConvertConfig, Converter, FetchConfig, PageSource, StaticSource};
use api2md_core::AppConfig;
use clap::{ArgGroup, Parser};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "api2md",
    about = "Convert API documentation pages to Markdown, one file per endpoint",
    version
)]
#[command(group(ArgGroup::new("input").required(true).args(["url", "urls"])))]
struct Cli {
    /// Documentation page to convert.
    #[arg(short, long)]
    url: Option<String>,

    /// File with one URL per line; blank lines and `#` comments are ignored.
    #[arg(long, value_name = "FILE")]
    urls: Option<PathBuf>,

    /// Output directory [default: ./output].
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Maximum pages processed at once.
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Fetch plain HTML instead of rendering in a headless browser.
    #[arg(long)]
    no_render: bool,

    /// CSS selector to wait for before reading each page.
    #[arg(long, value_name = "SELECTOR")]
    wait_for: Option<String>,

    /// Exit non-zero if any URL fails.
    #[arg(long)]
    strict: bool,

    /// Print the run report as JSON.
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,

    /// Debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Overlay command-line flags on the loaded configuration.
    fn apply(&self, config: &mut AppConfig) {
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.max_concurrency = concurrency;
        }
        if self.no_render {
            config.render_enabled = false;
        }
        if let Some(selector) = &self.wait_for {
            config.wait_for = Some(selector.clone());
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli);

    let mut config = AppConfig::load().context("failed to load configuration")?;
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;

    let source = page_source(&config).await?;
    let converter = Converter::new(source, ConvertConfig::from_app(&config));

    let report = match (&cli.url, &cli.urls) {
        (Some(url), _) => {
            let converted = converter
                .convert_one(url)
                .await
                .with_context(|| format!("failed to convert {url}"))?;
            BatchReport::new(vec![BatchItem::success(&converted)])
        }
        (None, Some(path)) => {
            let urls = read_url_list(path).await?;
            if urls.is_empty() {
                bail!("no URLs found in {}", path.display());
            }
            converter.run(urls).await
        }
        (None, None) => bail!("either --url or --urls is required"),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.to_text());
    }

    Ok(if should_fail(&report, cli.strict) { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,api2md={level},api2md_client={level},api2md_core={level}")));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

async fn page_source(config: &AppConfig) -> Result<Arc<dyn PageSource>> {
    #[cfg(feature = "render")]
    if config.render_enabled {
        let renderer = api2md_client::HeadlessRenderer::new(&config.user_agent)
            .await
            .context("failed to launch headless browser (use --no-render to fetch plain HTML)")?;
        return Ok(Arc::new(renderer));
    }

    #[cfg(not(feature = "render"))]
    if config.render_enabled {
        tracing::warn!("built without the render feature; fetching plain HTML");
    }

    let fetch = FetchConfig {
        user_agent: config.user_agent.clone(),
        max_bytes: config.max_bytes,
        timeout: config.timeout(),
        ..FetchConfig::default()
    };
    Ok(Arc::new(StaticSource::new(fetch)?))
}

/// Non-zero when every URL failed, or when any failed in strict mode.
fn should_fail(report: &BatchReport, strict: bool) -> bool {
    report.all_failed() || (strict && report.any_failed())
}
