//! Batch input parsing and the per-run report.

use std::collections::HashSet;
use std::path::Path;

use api2md_core::Error;
use serde::Serialize;

use super::Converted;

/// Parse a URL list: one URL per line, blank lines and `#` comments ignored.
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Read and parse a URL list file.
pub async fn read_url_list(path: &Path) -> Result<Vec<String>, Error> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::InvalidInput(format!("cannot read URL list {}: {e}", path.display())))?;
    Ok(parse_url_list(&text))
}

/// Drop exact duplicates, keeping the first occurrence.
pub fn dedup_urls(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter().filter(|url| seen.insert(url.clone())).collect()
}

/// Batch item status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Success,
    Failed,
}

/// Outcome for one input URL.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    /// The URL as given.
    pub url: String,
    pub status: ItemStatus,
    /// Written file (if status is Success).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Error code (if status is Failed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    /// Error message (if status is Failed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItem {
    pub fn success(converted: &Converted) -> Self {
        Self {
            url: converted.url.clone(),
            status: ItemStatus::Success,
            path: Some(converted.path.display().to_string()),
            method: Some(converted.endpoint.method.to_string()),
            endpoint: Some(converted.endpoint.name()),
            code: None,
            error: None,
        }
    }

    pub fn failed(url: impl Into<String>, error: &Error) -> Self {
        Self {
            url: url.into(),
            status: ItemStatus::Failed,
            path: None,
            method: None,
            endpoint: None,
            code: Some(error.code()),
            error: Some(error.to_string()),
        }
    }
}

/// Batch summary statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Results of one run, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub results: Vec<BatchItem>,
    pub summary: BatchSummary,
}

impl BatchReport {
    pub fn new(results: Vec<BatchItem>) -> Self {
        let succeeded = results.iter().filter(|r| r.status == ItemStatus::Success).count();
        let summary = BatchSummary { total: results.len(), succeeded, failed: results.len() - succeeded };
        Self { results, summary }
    }

    /// True when the run had URLs and none of them converted.
    pub fn all_failed(&self) -> bool {
        self.summary.total > 0 && self.summary.succeeded == 0
    }

    pub fn any_failed(&self) -> bool {
        self.summary.failed > 0
    }

    /// Human-readable summary, one line per URL plus a totals line.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for item in &self.results {
            match item.status {
                ItemStatus::Success => {
                    out.push_str(&format!("ok     {} -> {}\n", item.url, item.path.as_deref().unwrap_or("")));
                }
                ItemStatus::Failed => {
                    out.push_str(&format!("failed {}: {}\n", item.url, item.error.as_deref().unwrap_or("unknown error")));
                }
            }
        }
        out.push_str(&format!(
            "converted {}/{} URLs ({} failed)\n",
            self.summary.succeeded, self.summary.total, self.summary.failed
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_list() {
        let text = "# API pages\nhttps://a.example.com/users\n\n   \n  https://b.example.com/pets  \n#https://skipped\n";
        assert_eq!(parse_url_list(text), vec!["https://a.example.com/users", "https://b.example.com/pets"]);
    }

    #[test]
    fn test_parse_url_list_empty() {
        assert!(parse_url_list("# nothing\n\n").is_empty());
    }

    #[test]
    fn test_dedup_urls_keeps_first_occurrence() {
        let urls = vec![
            "https://a/x".to_string(),
            "https://a/y".to_string(),
            "https://a/x".to_string(),
            "https://a/X".to_string(),
        ];
        assert_eq!(dedup_urls(urls), vec!["https://a/x", "https://a/y", "https://a/X"]);
    }

    #[tokio::test]
    async fn test_read_url_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        tokio::fs::write(&path, "https://a.example.com\n# c\nhttps://b.example.com\n").await.unwrap();

        let urls = read_url_list(&path).await.unwrap();
        assert_eq!(urls.len(), 2);
    }

    #[tokio::test]
    async fn test_read_url_list_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_url_list(&dir.path().join("missing.txt")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_report_summary() {
        let report = BatchReport::new(vec![
            BatchItem::failed("https://a", &Error::Fetch("dns error".into())),
            BatchItem::failed("https://b", &Error::EmptyContent("nothing".into())),
        ]);

        assert_eq!(report.summary, BatchSummary { total: 2, succeeded: 0, failed: 2 });
        assert!(report.all_failed());
        assert!(report.any_failed());
        assert!(report.to_text().ends_with("converted 0/2 URLs (2 failed)\n"));
    }

    #[test]
    fn test_empty_report_is_not_all_failed() {
        let report = BatchReport::new(Vec::new());
        assert!(!report.all_failed());
        assert!(!report.any_failed());
    }

    #[test]
    fn test_failed_item_serialization() {
        let item = BatchItem::failed("https://a", &Error::FetchTimeout("30000ms".into()));
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["status"], "failed");
        assert_eq!(json["code"], "FETCH_TIMEOUT");
        assert!(json.get("path").is_none());
    }
}
