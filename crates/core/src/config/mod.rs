//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (API2MD_*)
//! 2. TOML config file (if API2MD_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Desktop Chrome user agent; some documentation hosts serve a degraded page to unknown agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                                      (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (API2MD_*)
/// 2. TOML config file (if API2MD_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory Markdown files are written to (created if absent).
    ///
    /// Set via API2MD_OUTPUT_DIR environment variable.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// User-Agent string for HTTP requests and the headless browser.
    ///
    /// Set via API2MD_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per page in static mode.
    ///
    /// Set via API2MD_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Ceiling for fetching or rendering one page, in milliseconds.
    ///
    /// Set via API2MD_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Whether pages are rendered in a headless browser.
    ///
    /// When false, pages are fetched over plain HTTP and no disclosure
    /// widgets can be expanded. Set via API2MD_RENDER_ENABLED.
    #[serde(default = "default_true")]
    pub render_enabled: bool,

    /// CSS selector to wait for before expanding disclosures.
    ///
    /// Set via API2MD_WAIT_FOR environment variable.
    #[serde(default)]
    pub wait_for: Option<String>,

    /// Fixed wait after navigation when no `wait_for` selector is set.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Per-widget ceiling for one expand interaction.
    #[serde(default = "default_expand_timeout_ms")]
    pub expand_timeout_ms: u64,

    /// Pause after a successful expansion so lazy content can load.
    #[serde(default = "default_expand_settle_ms")]
    pub expand_settle_ms: u64,

    /// Ceiling for the whole disclosure expansion phase of one page.
    #[serde(default = "default_expand_budget_ms")]
    pub expand_budget_ms: u64,

    /// Maximum expansion passes (nested widgets appear after their parent opens).
    #[serde(default = "default_max_expand_rounds")]
    pub max_expand_rounds: u32,

    /// Minimum visible characters for a content region to count as non-empty.
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,

    /// URL path segments dropped when deriving endpoint names.
    ///
    /// Set via API2MD_BOILERPLATE_SEGMENTS environment variable (comma-separated).
    #[serde(default = "default_boilerplate_segments")]
    pub boilerplate_segments: Vec<String>,

    /// Number of leading blocks scanned for an explicit HTTP method token.
    #[serde(default = "default_method_scan_blocks")]
    pub method_scan_blocks: usize,

    /// Maximum number of URLs converted concurrently.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Extra attempts for the fetch/render step after a fetch-class failure.
    #[serde(default = "default_fetch_retries")]
    pub fetch_retries: u32,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

fn default_settle_ms() -> u64 {
    2_000
}

fn default_expand_timeout_ms() -> u64 {
    1_000
}

fn default_expand_settle_ms() -> u64 {
    500
}

fn default_expand_budget_ms() -> u64 {
    15_000
}

fn default_max_expand_rounds() -> u32 {
    3
}

fn default_min_content_chars() -> usize {
    20
}

fn default_boilerplate_segments() -> Vec<String> {
    vec!["docs".into(), "api".into(), "reference".into()]
}

fn default_method_scan_blocks() -> usize {
    5
}

fn default_max_concurrency() -> usize {
    4
}

fn default_fetch_retries() -> u32 {
    1
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            render_enabled: true,
            wait_for: None,
            settle_ms: default_settle_ms(),
            expand_timeout_ms: default_expand_timeout_ms(),
            expand_settle_ms: default_expand_settle_ms(),
            expand_budget_ms: default_expand_budget_ms(),
            max_expand_rounds: default_max_expand_rounds(),
            min_content_chars: default_min_content_chars(),
            boilerplate_segments: default_boilerplate_segments(),
            method_scan_blocks: default_method_scan_blocks(),
            max_concurrency: default_max_concurrency(),
            fetch_retries: default_fetch_retries(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `API2MD_`
    /// 2. TOML file from `API2MD_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("API2MD_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("API2MD_")
                .ignore(&["CONFIG_FILE", "BOILERPLATE_SEGMENTS"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let mut config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        if let Ok(list) = std::env::var("API2MD_BOILERPLATE_SEGMENTS") {
            config.boilerplate_segments = split_list(&list);
        }

        config.validate()?;

        Ok(config)
    }
}

/// Split a comma-separated environment value, dropping blanks.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.output_dir, PathBuf::from("./output"));
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.timeout_ms, 30_000);
        assert!(config.render_enabled);
        assert!(config.wait_for.is_none());
        assert_eq!(config.boilerplate_segments, vec!["docs", "api", "reference"]);
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.fetch_retries, 1);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(30_000));
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("docs, api,,v1 "), vec!["docs", "api", "v1"]);
        assert!(split_list(" , ").is_empty());
    }

    #[test]
    fn test_load_from_env_and_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("api2md.toml", "timeout_ms = 12000\nmax_concurrency = 2\n")?;
            jail.set_env("API2MD_CONFIG_FILE", "api2md.toml");
            jail.set_env("API2MD_MAX_CONCURRENCY", "8");
            jail.set_env("API2MD_BOILERPLATE_SEGMENTS", "docs,v2");

            let config = AppConfig::load().expect("config should load");
            assert_eq!(config.timeout_ms, 12_000);
            assert_eq!(config.max_concurrency, 8);
            assert_eq!(config.boilerplate_segments, vec!["docs", "v2"]);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("API2MD_MAX_CONCURRENCY", "0");
            assert!(matches!(AppConfig::load(), Err(ConfigError::Invalid { .. })));
            Ok(())
        });
    }
}
